use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A stable token for a field name, minted once per distinct name.
///
/// Identifiers are dense indices: the `n`-th distinct name registered gets
/// `FieldId(n)`, so they can index tables directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId(usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name-to-identifier table for one compilation.
///
/// Names are never removed, so an identifier handed out once stays valid for
/// the lifetime of the compilation and of every field tree materialized
/// from it. The mapper does not know whether a field with that name exists;
/// that is only settled during materialization.
#[derive(Debug, Default, Clone)]
pub struct FieldMapper {
    ids: HashMap<String, FieldId>,
    names: Vec<String>,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for `name`, minting a fresh one on first use.
    pub fn find_or_register(&mut self, name: &str) -> FieldId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = FieldId(self.names.len());
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<FieldId> {
        self.ids.get(name).copied()
    }

    pub fn name_of(&self, id: FieldId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Name for diagnostics; falls back to the identifier's display form.
    pub fn describe(&self, id: FieldId) -> String {
        self.name_of(id)
            .map_or_else(|| id.to_string(), ToString::to_string)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
