use crate::arena::Handle;
use crate::error::{Error, Result};
use crate::node::TemplateBodyNode;
use log::debug;
use std::collections::HashMap;

/// A reusable body with its declared inclusive repetition range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateDefinition {
    body: Handle<TemplateBodyNode>,
    min: usize,
    max: usize,
}

impl TemplateDefinition {
    pub fn body(&self) -> Handle<TemplateBodyNode> {
        self.body
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    /// Narrows the declared range by a call-site request.
    pub fn intersect(
        &self,
        name: &str,
        requested_min: usize,
        requested_max: usize,
    ) -> Result<(usize, usize)> {
        let low = self.min.max(requested_min);
        let high = self.max.min(requested_max);
        if low > high {
            return Err(Error::RangeConflict {
                template: name.to_string(),
                requested_min,
                requested_max,
                declared_min: self.min,
                declared_max: self.max,
            });
        }
        Ok((low, high))
    }
}

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    definitions: HashMap<String, TemplateDefinition>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: &str,
        body: Handle<TemplateBodyNode>,
        min: usize,
        max: usize,
    ) -> Result<()> {
        if min > max {
            return Err(Error::InvalidRange {
                context: format!("template '{name}'"),
                min,
                max,
            });
        }
        if self.definitions.contains_key(name) {
            return Err(Error::DuplicateTemplate(name.to_string()));
        }
        debug!("template '{name}' defined with range [{min}, {max}]");
        self.definitions
            .insert(name.to_string(), TemplateDefinition { body, min, max });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&TemplateDefinition> {
        self.definitions
            .get(name)
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
