//! Construction nodes: the deferred, inspectable plan a script compiles into.
//!
//! Nodes hold only construction parameters and handles to other nodes. They
//! are turned into concrete values by the [`crate::materialize`] pass.

use crate::arena::Handle;
use crate::field::FieldKind;
use crate::function::FillTarget;
use crate::identifier::FieldId;

/// Deferred producer of a scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueNode {
    Literal(u64),
    /// IEEE-754 single-precision constant, kept as its bit pattern.
    Float(u32),
    /// The current content of the named field.
    FieldRef(FieldId),
}

/// Deferred producer of a filling strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillerNode {
    Random,
    /// Apply the named function to the content of `input`.
    Function { function: String, input: FieldId },
    Value(Handle<ValueNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Block {
        size: usize,
        filler: Option<Handle<FillerNode>>,
    },
    VariableBlock {
        min_size: usize,
        max_size: usize,
        filler: Option<Handle<FillerNode>>,
    },
    Compound(Vec<Handle<FieldNode>>),
    /// Instantiation of a named template with call-site repetition bounds.
    Template {
        name: String,
        min: usize,
        max: usize,
    },
}

impl FieldShape {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldShape::Block { .. } => FieldKind::Block,
            FieldShape::VariableBlock { .. } => FieldKind::VariableBlock,
            FieldShape::Compound(_) => FieldKind::Compound,
            FieldShape::Template { .. } => FieldKind::TemplateInstance,
        }
    }

    /// The size contract a filler must honour, for terminal shapes.
    pub fn fill_target(&self) -> Option<FillTarget> {
        match self {
            FieldShape::Block { size, .. } => Some(FillTarget::Fixed(*size)),
            FieldShape::VariableBlock {
                min_size, max_size, ..
            } => Some(FillTarget::Variable {
                min: *min_size,
                max: *max_size,
            }),
            _ => None,
        }
    }

    pub fn filler(&self) -> Option<Handle<FillerNode>> {
        match self {
            FieldShape::Block { filler, .. } | FieldShape::VariableBlock { filler, .. } => *filler,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub id: Option<FieldId>,
    pub shape: FieldShape,
}

impl FieldNode {
    pub fn new(id: Option<FieldId>, shape: FieldShape) -> Self {
        Self { id, shape }
    }

    pub fn anonymous(shape: FieldShape) -> Self {
        Self::new(None, shape)
    }
}

/// Body of a template definition; bound to a name and range by the
/// [`crate::template::TemplateRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateBodyNode {
    pub fields: Vec<Handle<FieldNode>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_shapes_expose_fill_targets() {
        let block = FieldShape::Block {
            size: 8,
            filler: None,
        };
        let variable = FieldShape::VariableBlock {
            min_size: 2,
            max_size: 6,
            filler: None,
        };
        assert_eq!(block.fill_target(), Some(FillTarget::Fixed(8)));
        assert_eq!(
            variable.fill_target(),
            Some(FillTarget::Variable { min: 2, max: 6 })
        );
        assert_eq!(FieldShape::Compound(Vec::new()).fill_target(), None);
        assert_eq!(variable.kind(), FieldKind::VariableBlock);
    }
}
