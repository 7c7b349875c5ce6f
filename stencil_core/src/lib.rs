pub mod arena;
pub mod compiler;
pub mod config;
pub mod error;
pub mod field;
pub mod filler;
pub mod function;
pub mod functions;
pub mod identifier;
pub mod materialize;
pub mod node;
pub mod resolved;
pub mod template;

pub use arena::{Handle, NodeArena};
pub use compiler::{Compiler, Script};
pub use config::{OutputFormat, StencilConfig};
pub use error::{Error, Result};
pub use field::{Content, Field, FieldKind};
pub use filler::{Filler, Value};
pub use function::{
    Constraint, FieldFunction, FillContext, FillTarget, FunctionBinding, FunctionRegistry,
};
pub use identifier::{FieldId, FieldMapper};
pub use materialize::Materializer;
pub use template::{TemplateDefinition, TemplateRegistry};
