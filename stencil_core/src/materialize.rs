//! The materialization pass: one depth-first, left-to-right walk over a
//! compiled [`Script`] producing a concrete [`Field`] tree.

use crate::arena::Handle;
use crate::compiler::Script;
use crate::error::{Error, Result};
use crate::field::{Field, FieldKind};
use crate::filler::{Filler, Value};
use crate::function::{FillContext, FillTarget};
use crate::node::{FieldNode, FieldShape, FillerNode, TemplateBodyNode, ValueNode};
use crate::resolved::{ResolvedField, ResolvedFields};
use log::{trace, warn};
use rand::Rng;
use rand_core::RngCore;

/// Default bound on nested template instantiations.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Largest accepted nesting bound; deeper settings are clamped to it.
pub const MAX_DEPTH_CEILING: usize = 128;

/// State of one materialization run.
///
/// A materializer owns its resolved-field table, so a failed run leaves
/// nothing behind: dropping it discards every partially built field.
pub struct Materializer<'s, 'r> {
    script: &'s Script,
    rng: &'r mut dyn RngCore,
    resolved: ResolvedFields,
    max_depth: usize,
    depth: usize,
}

impl<'s, 'r> Materializer<'s, 'r> {
    pub fn new(script: &'s Script, rng: &'r mut dyn RngCore) -> Self {
        Self {
            script,
            rng,
            resolved: ResolvedFields::with_capacity(script.mapper().len()),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        if max_depth > MAX_DEPTH_CEILING {
            warn!("max depth {max_depth} clamped to {MAX_DEPTH_CEILING}");
        }
        self.max_depth = max_depth.min(MAX_DEPTH_CEILING);
        self
    }

    /// Materializes the script's top-level fields into one compound root.
    pub fn materialize_root(mut self) -> Result<Field> {
        let script = self.script;
        let children = self.fields(script.root())?;
        Ok(Field::group(None, FieldKind::Compound, children))
    }

    /// Produces between `min` and `max` repetitions of the named template,
    /// narrowed by the template's declared range.
    pub fn instantiate(&mut self, name: &str, min: usize, max: usize) -> Result<Vec<Field>> {
        let script = self.script;
        let definition = *script.templates().get(name)?;
        let (low, high) = definition.intersect(name, min, max)?;
        if self.depth >= self.max_depth {
            return Err(Error::RecursionLimit {
                template: name.to_string(),
                limit: self.max_depth,
            });
        }
        let body = script.arena().get(definition.body()).ok_or_else(|| {
            Error::MalformedScript(format!("body of template '{name}' is not in this script"))
        })?;

        let count = self.rng.random_range(low..=high);
        trace!("instantiating template '{name}' {count} time(s)");
        self.depth += 1;
        let instances = (0..count)
            .map(|_| self.repetition(body))
            .collect::<Result<Vec<_>>>();
        self.depth -= 1;
        instances
    }

    /// One repetition runs in its own identifier scope.
    fn repetition(&mut self, body: &'s TemplateBodyNode) -> Result<Field> {
        self.resolved.enter_scope();
        let children = self.fields(&body.fields);
        self.resolved.exit_scope();
        Ok(Field::group(None, FieldKind::Compound, children?))
    }

    fn fields(&mut self, handles: &'s [Handle<FieldNode>]) -> Result<Vec<Field>> {
        let mut fields = Vec::with_capacity(handles.len());
        for handle in handles {
            fields.push(self.field(*handle)?);
        }
        Ok(fields)
    }

    fn field(&mut self, handle: Handle<FieldNode>) -> Result<Field> {
        let script = self.script;
        let node = script.arena().get(handle).ok_or_else(|| {
            Error::MalformedScript(format!("field node {handle:?} is not in this script"))
        })?;

        let field = match &node.shape {
            FieldShape::Compound(children) => {
                Field::group(node.id, FieldKind::Compound, self.fields(children)?)
            }
            FieldShape::Template { name, min, max } => Field::group(
                node.id,
                FieldKind::TemplateInstance,
                self.instantiate(name, *min, *max)?,
            ),
            shape => match shape.fill_target() {
                Some(target) => self.terminal(node, target)?,
                None => {
                    return Err(Error::MalformedScript(format!(
                        "field node {handle:?} has no content"
                    )));
                }
            },
        };

        trace!(
            "materialized {} {} ({} bytes)",
            field.kind().as_str(),
            self.label(node),
            field.len()
        );
        if let Some(id) = node.id {
            self.resolved.bind(id, ResolvedField::of(&field));
        }
        Ok(field)
    }

    fn terminal(&mut self, node: &FieldNode, target: FillTarget) -> Result<Field> {
        let filler = match node.shape.filler() {
            Some(handle) => self.filler(handle)?,
            None => Filler::Random,
        };
        let label = self.label(node);
        let mut ctx = FillContext::new(&mut *self.rng, &self.resolved, self.script.mapper());
        let mut bytes = filler.fill(&target, &mut ctx, &label)?;
        if !target.accepts(bytes.len()) {
            bytes = target.fit(bytes);
        }
        Ok(Field::terminal(node.id, node.shape.kind(), bytes))
    }

    fn filler(&mut self, handle: Handle<FillerNode>) -> Result<Filler> {
        let script = self.script;
        let node = script.arena().get(handle).ok_or_else(|| {
            Error::MalformedScript(format!("filler node {handle:?} is not in this script"))
        })?;
        Ok(match node {
            FillerNode::Random => Filler::Random,
            FillerNode::Function { function, input } => {
                Filler::Function(script.functions().instantiate(function, *input)?)
            }
            FillerNode::Value(value) => Filler::Value(self.value(*value)?),
        })
    }

    fn value(&self, handle: Handle<ValueNode>) -> Result<Value> {
        let script = self.script;
        let node = script.arena().get(handle).ok_or_else(|| {
            Error::MalformedScript(format!("value node {handle:?} is not in this script"))
        })?;
        match node {
            ValueNode::Literal(n) => Ok(Value::Number(*n)),
            ValueNode::Float(bits) => Ok(Value::Bytes(bits.to_le_bytes().to_vec())),
            ValueNode::FieldRef(id) => self
                .resolved
                .get(*id)
                .map(|field| Value::Bytes(field.bytes.clone()))
                .ok_or_else(|| Error::UnresolvedReference {
                    name: script.mapper().describe(*id),
                    id: *id,
                }),
        }
    }

    fn label(&self, node: &FieldNode) -> String {
        match node.id {
            Some(id) => self.script.mapper().describe(id),
            None => format!("<anonymous {}>", node.shape.kind().as_str()),
        }
    }
}
