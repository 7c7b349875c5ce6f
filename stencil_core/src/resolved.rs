use crate::field::{Field, FieldKind};
use crate::identifier::FieldId;

/// Snapshot of a materialized field, as seen by dependants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub kind: FieldKind,
    pub bytes: Vec<u8>,
}

impl ResolvedField {
    pub fn of(field: &Field) -> Self {
        Self {
            kind: field.kind(),
            bytes: field.to_bytes(),
        }
    }
}

/// Identifier-indexed table of fields materialized so far.
///
/// Scopes are journaled: every binding made inside a scope records what it
/// replaced, and leaving the scope restores those entries in reverse order.
/// A name bound inside a scope is therefore invisible once the scope ends.
#[derive(Debug, Default)]
pub struct ResolvedFields {
    slots: Vec<Option<ResolvedField>>,
    journals: Vec<Vec<(FieldId, Option<ResolvedField>)>>,
}

impl ResolvedFields {
    pub fn with_capacity(identifiers: usize) -> Self {
        Self {
            slots: vec![None; identifiers],
            journals: Vec::new(),
        }
    }

    pub fn bind(&mut self, id: FieldId, field: ResolvedField) {
        let index = id.index();
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let previous = self.slots[index].replace(field);
        if let Some(journal) = self.journals.last_mut() {
            journal.push((id, previous));
        }
    }

    pub fn get(&self, id: FieldId) -> Option<&ResolvedField> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn enter_scope(&mut self) {
        self.journals.push(Vec::new());
    }

    pub fn exit_scope(&mut self) {
        if let Some(journal) = self.journals.pop() {
            for (id, previous) in journal.into_iter().rev() {
                self.slots[id.index()] = previous;
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.journals.len()
    }
}
