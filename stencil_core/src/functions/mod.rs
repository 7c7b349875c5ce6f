//! Built-in field functions.

pub mod digest;
pub mod random;

pub use digest::{DigestAlgorithm, DigestFunction};
pub use random::RandomFunction;

use crate::function::FunctionRegistry;

pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry.register(random::NAME, |_| Box::new(RandomFunction));
    for algorithm in DigestAlgorithm::ALL {
        registry.register(algorithm.name(), move |input| {
            Box::new(DigestFunction::new(algorithm, input))
        });
    }
}
