use crate::error::Result;
use crate::function::{Constraint, FieldFunction, FillContext, FillTarget};
use crate::identifier::FieldId;
use rand::Rng;
use rand_core::RngCore;

pub const NAME: &str = "random";

/// Uniformly random bytes; for variable blocks the length is uniform in
/// the declared range too.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomFunction;

impl RandomFunction {
    pub fn generate(target: &FillTarget, rng: &mut dyn RngCore) -> Vec<u8> {
        let len = match *target {
            FillTarget::Fixed(size) => size,
            FillTarget::Variable { min, max } => rng.random_range(min..=max),
        };
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        bytes
    }
}

impl FieldFunction for RandomFunction {
    fn constraints(&self) -> &[Constraint] {
        &[]
    }

    fn input(&self) -> Option<FieldId> {
        None
    }

    fn apply(&self, target: &FillTarget, ctx: &mut FillContext<'_>) -> Result<Vec<u8>> {
        Ok(Self::generate(target, ctx.rng()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    #[test]
    fn fixed_target_yields_exact_size() {
        let mut rng = ChaCha8Rng::from_seed([3u8; 32]);
        for size in [0, 1, 7, 64] {
            assert_eq!(
                RandomFunction::generate(&FillTarget::Fixed(size), &mut rng).len(),
                size
            );
        }
    }

    #[test]
    fn variable_length_stays_in_range_and_covers_it() {
        let mut rng = ChaCha8Rng::from_seed([4u8; 32]);
        let target = FillTarget::Variable { min: 2, max: 5 };
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let len = RandomFunction::generate(&target, &mut rng).len();
            assert!((2..=5).contains(&len), "length {len} out of range");
            seen.insert(len);
        }
        assert_eq!(seen.len(), 4, "all lengths should appear: {seen:?}");
    }

    #[test]
    fn same_seed_same_bytes() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let mut c = ChaCha8Rng::seed_from_u64(100);
        let first = RandomFunction::generate(&FillTarget::Fixed(32), &mut a);
        assert_eq!(first, RandomFunction::generate(&FillTarget::Fixed(32), &mut b));
        assert_ne!(first, RandomFunction::generate(&FillTarget::Fixed(32), &mut c));
    }
}
