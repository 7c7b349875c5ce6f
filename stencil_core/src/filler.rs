use crate::error::Result;
use crate::function::{FillContext, FillTarget, FunctionBinding};
use crate::functions::RandomFunction;

/// A materialized scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Number(u64),
    Bytes(Vec<u8>),
}

impl Value {
    /// Encodes the value for `target`: numbers little-endian in their
    /// minimal width (at least one byte), then zero-extended or truncated.
    pub fn encode_for(&self, target: &FillTarget) -> Vec<u8> {
        let raw = match self {
            Value::Number(n) => {
                let le = n.to_le_bytes();
                let width = (8 - (n.leading_zeros() as usize) / 8).max(1);
                le[..width].to_vec()
            }
            Value::Bytes(bytes) => bytes.clone(),
        };
        target.fit(raw)
    }
}

/// A materialized filling strategy for one terminal field.
#[derive(Debug)]
pub enum Filler {
    Random,
    Function(FunctionBinding),
    Value(Value),
}

impl Filler {
    pub fn fill(
        &self,
        target: &FillTarget,
        ctx: &mut FillContext<'_>,
        field: &str,
    ) -> Result<Vec<u8>> {
        match self {
            Filler::Random => Ok(RandomFunction::generate(target, ctx.rng())),
            Filler::Function(binding) => binding.fill(target, ctx, field),
            Filler::Value(value) => Ok(value.encode_for(target)),
        }
    }
}
