//! Errors raised while compiling or materializing a script.

use crate::function::Constraint;
use crate::identifier::FieldId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal for the compilation or materialization that raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A value or function read a field that has no materialized content in scope.
    #[error("unresolved reference to field '{name}' ({id}): it has not been materialized yet")]
    UnresolvedReference { name: String, id: FieldId },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{0}' is already defined")]
    DuplicateTemplate(String),

    #[error(
        "repetition range [{requested_min}, {requested_max}] does not intersect \
         template '{template}' range [{declared_min}, {declared_max}]"
    )]
    RangeConflict {
        template: String,
        requested_min: usize,
        requested_max: usize,
        declared_min: usize,
        declared_max: usize,
    },

    #[error("function '{function}' rejected field '{field}': constraint '{constraint}' violated ({detail})")]
    ConstraintViolation {
        function: String,
        field: String,
        constraint: Constraint,
        detail: String,
    },

    /// A size or repetition range whose lower bound exceeds its upper bound.
    #[error("invalid range [{min}, {max}] for {context}")]
    InvalidRange {
        context: String,
        min: usize,
        max: usize,
    },

    #[error("template '{template}' nested deeper than the limit of {limit}")]
    RecursionLimit { template: String, limit: usize },

    #[error("malformed script: {0}")]
    MalformedScript(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_identifying_context() {
        let err = Error::RangeConflict {
            template: "entry".to_string(),
            requested_min: 6,
            requested_max: 9,
            declared_min: 2,
            declared_max: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("entry"));
        assert!(msg.contains("[6, 9]"));
        assert!(msg.contains("[2, 5]"));

        let err = Error::ConstraintViolation {
            function: "md5".to_string(),
            field: "payload".to_string(),
            constraint: Constraint::Terminal,
            detail: "input is a compound".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("md5"));
        assert!(msg.contains("payload"));
        assert!(msg.contains("terminal"));
    }
}
