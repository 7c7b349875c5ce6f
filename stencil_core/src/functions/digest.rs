use crate::error::Result;
use crate::function::{Constraint, FieldFunction, FillContext, FillTarget};
use crate::identifier::FieldId;
use sha1::{Digest, Sha1};
use sha2::Sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 3] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Md5 => md5::compute(data).0.to_vec(),
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

/// Unary digest: the filled field's content is the digest of one input field.
#[derive(Debug, Clone)]
pub struct DigestFunction {
    algorithm: DigestAlgorithm,
    input: FieldId,
    constraints: [Constraint; 2],
}

impl DigestFunction {
    pub fn new(algorithm: DigestAlgorithm, input: FieldId) -> Self {
        Self {
            algorithm,
            input,
            constraints: [
                Constraint::Terminal,
                Constraint::OutputSize(algorithm.output_len()),
            ],
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl FieldFunction for DigestFunction {
    fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    fn input(&self) -> Option<FieldId> {
        Some(self.input)
    }

    fn apply(&self, _target: &FillTarget, ctx: &mut FillContext<'_>) -> Result<Vec<u8>> {
        let input = ctx.resolve(self.input)?;
        Ok(self.algorithm.digest(&input.bytes))
    }
}
