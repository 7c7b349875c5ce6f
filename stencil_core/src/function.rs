use crate::error::{Error, Result};
use crate::functions;
use crate::identifier::{FieldId, FieldMapper};
use crate::resolved::{ResolvedField, ResolvedFields};
use log::{debug, warn};
use rand_core::RngCore;
use std::collections::HashMap;
use std::fmt;

/// Size contract of the terminal field being filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTarget {
    Fixed(usize),
    /// Inclusive length bounds.
    Variable { min: usize, max: usize },
}

impl FillTarget {
    pub fn accepts(&self, len: usize) -> bool {
        match *self {
            FillTarget::Fixed(size) => len == size,
            FillTarget::Variable { min, max } => (min..=max).contains(&len),
        }
    }

    /// Zero-extends or truncates `bytes` to the nearest accepted length.
    pub fn fit(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        let (min, max) = match *self {
            FillTarget::Fixed(size) => (size, size),
            FillTarget::Variable { min, max } => (min, max),
        };
        if bytes.len() > max {
            warn!("truncating {} bytes of content to {}", bytes.len(), max);
            bytes.truncate(max);
        } else if bytes.len() < min {
            bytes.resize(min, 0);
        }
        bytes
    }
}

/// A predicate a function checks before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The input field must carry raw bytes.
    Terminal,
    InputMinSize(usize),
    InputMaxSize(usize),
    /// The field being filled must accept exactly this many bytes.
    OutputSize(usize),
}

impl Constraint {
    pub fn is_output(&self) -> bool {
        matches!(self, Constraint::OutputSize(_))
    }

    /// Returns a description of the mismatch on failure.
    pub fn check_input(&self, input: &ResolvedField) -> std::result::Result<(), String> {
        match *self {
            Constraint::Terminal if !input.kind.is_terminal() => {
                Err(format!("input is a {}", input.kind.as_str()))
            }
            Constraint::InputMinSize(min) if input.bytes.len() < min => {
                Err(format!("input has {} bytes", input.bytes.len()))
            }
            Constraint::InputMaxSize(max) if input.bytes.len() > max => {
                Err(format!("input has {} bytes", input.bytes.len()))
            }
            _ => Ok(()),
        }
    }

    pub fn check_output(&self, target: &FillTarget) -> std::result::Result<(), String> {
        match *self {
            Constraint::OutputSize(size) if !target.accepts(size) => Err(match *target {
                FillTarget::Fixed(actual) => format!("target holds exactly {actual} bytes"),
                FillTarget::Variable { min, max } => {
                    format!("target holds between {min} and {max} bytes")
                }
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Terminal => write!(f, "terminal input"),
            Constraint::InputMinSize(n) => write!(f, "input of at least {n} bytes"),
            Constraint::InputMaxSize(n) => write!(f, "input of at most {n} bytes"),
            Constraint::OutputSize(n) => write!(f, "output of {n} bytes"),
        }
    }
}

/// What a function may see while it fills a field.
pub struct FillContext<'a> {
    rng: &'a mut dyn RngCore,
    resolved: &'a ResolvedFields,
    mapper: &'a FieldMapper,
}

impl<'a> FillContext<'a> {
    pub fn new(
        rng: &'a mut dyn RngCore,
        resolved: &'a ResolvedFields,
        mapper: &'a FieldMapper,
    ) -> Self {
        Self {
            rng,
            resolved,
            mapper,
        }
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// Content of an already-materialized field in the current scope.
    pub fn resolve(&self, id: FieldId) -> Result<&'a ResolvedField> {
        self.resolved
            .get(id)
            .ok_or_else(|| Error::UnresolvedReference {
                name: self.mapper.describe(id),
                id,
            })
    }

    pub fn field_name(&self, id: FieldId) -> String {
        self.mapper.describe(id)
    }
}

/// A named transformation producing the content of a terminal field.
///
/// Implementations see their input (if any) only through
/// [`FillContext::resolve`], and must be deterministic in that input unless
/// they draw from [`FillContext::rng`].
pub trait FieldFunction: fmt::Debug {
    /// Constraints enforced on the input and on the field being filled.
    fn constraints(&self) -> &[Constraint];

    /// The field whose content this function consumes.
    fn input(&self) -> Option<FieldId>;

    fn apply(&self, target: &FillTarget, ctx: &mut FillContext<'_>) -> Result<Vec<u8>>;
}

/// Builds a function bound to the identifier of its input field.
pub type FunctionFactory = Box<dyn Fn(FieldId) -> Box<dyn FieldFunction> + Send + Sync>;

/// A function instance coupled to its input field, with its constraint checks.
#[derive(Debug)]
pub struct FunctionBinding {
    name: String,
    function: Box<dyn FieldFunction>,
}

impl FunctionBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field this binding reads, as reported by its function.
    pub fn input(&self) -> Option<FieldId> {
        self.function.input()
    }

    pub fn constraints(&self) -> &[Constraint] {
        self.function.constraints()
    }

    /// Checks the output constraints against the field being filled,
    /// labelled `field` in errors.
    pub fn check_output(&self, target: &FillTarget, field: &str) -> Result<()> {
        for constraint in self.constraints().iter().filter(|c| c.is_output()) {
            constraint
                .check_output(target)
                .map_err(|detail| Error::ConstraintViolation {
                    function: self.name.clone(),
                    field: field.to_string(),
                    constraint: *constraint,
                    detail,
                })?;
        }
        Ok(())
    }

    pub fn fill(
        &self,
        target: &FillTarget,
        ctx: &mut FillContext<'_>,
        field: &str,
    ) -> Result<Vec<u8>> {
        self.check_output(target, field)?;
        if let Some(input_id) = self.input() {
            let input = ctx.resolve(input_id)?;
            for constraint in self.constraints().iter().filter(|c| !c.is_output()) {
                constraint
                    .check_input(input)
                    .map_err(|detail| Error::ConstraintViolation {
                        function: self.name.clone(),
                        field: ctx.field_name(input_id),
                        constraint: *constraint,
                        detail,
                    })?;
            }
        }
        self.function.apply(target, ctx)
    }
}

/// Named function factories available to one compilation.
pub struct FunctionRegistry {
    factories: HashMap<String, FunctionFactory>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry seeded with `random`, `md5`, `sha1` and `sha256`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        functions::register_builtins(&mut registry);
        registry
    }

    /// Installs `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(FieldId) -> Box<dyn FieldFunction> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            debug!("function '{name}' re-registered");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn instantiate(&self, name: &str, input: FieldId) -> Result<FunctionBinding> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        Ok(FunctionBinding {
            name: name.to_string(),
            function: factory(input),
        })
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
