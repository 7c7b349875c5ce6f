use crate::identifier::{FieldId, FieldMapper};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Block,
    VariableBlock,
    Compound,
    TemplateInstance,
}

impl FieldKind {
    /// Terminal kinds carry raw bytes; the others carry children.
    pub fn is_terminal(self) -> bool {
        matches!(self, FieldKind::Block | FieldKind::VariableBlock)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Block => "block",
            FieldKind::VariableBlock => "variable-block",
            FieldKind::Compound => "compound",
            FieldKind::TemplateInstance => "template-instance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Bytes(Vec<u8>),
    Children(Vec<Field>),
}

/// A materialized unit of generated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    id: Option<FieldId>,
    kind: FieldKind,
    content: Content,
}

impl Field {
    pub fn terminal(id: Option<FieldId>, kind: FieldKind, bytes: Vec<u8>) -> Self {
        debug_assert!(kind.is_terminal());
        Self {
            id,
            kind,
            content: Content::Bytes(bytes),
        }
    }

    pub fn group(id: Option<FieldId>, kind: FieldKind, children: Vec<Field>) -> Self {
        debug_assert!(!kind.is_terminal());
        Self {
            id,
            kind,
            content: Content::Children(children),
        }
    }

    pub fn id(&self) -> Option<FieldId> {
        self.id
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Bytes(bytes) => Some(bytes),
            Content::Children(_) => None,
        }
    }

    /// Empty for terminal fields.
    pub fn children(&self) -> &[Field] {
        match &self.content {
            Content::Bytes(_) => &[],
            Content::Children(children) => children,
        }
    }

    /// Length of the flattened byte content.
    pub fn len(&self) -> usize {
        match &self.content {
            Content::Bytes(bytes) => bytes.len(),
            Content::Children(children) => children.iter().map(Field::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends terminal contents depth-first, left to right.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match &self.content {
            Content::Bytes(bytes) => out.extend_from_slice(bytes),
            Content::Children(children) => {
                for child in children {
                    child.write_to(out);
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.write_to(&mut out);
        out
    }

    /// First field tagged with `id`, in document order.
    pub fn find(&self, id: FieldId) -> Option<&Field> {
        if self.id == Some(id) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    pub fn to_json(&self, mapper: &FieldMapper) -> JsonValue {
        let name = self.id.and_then(|id| mapper.name_of(id));
        match &self.content {
            Content::Bytes(bytes) => json!({
                "name": name,
                "kind": self.kind,
                "size": bytes.len(),
                "bytes": bytes,
            }),
            Content::Children(children) => json!({
                "name": name,
                "kind": self.kind,
                "children": children.iter().map(|c| c.to_json(mapper)).collect::<Vec<_>>(),
            }),
        }
    }
}
