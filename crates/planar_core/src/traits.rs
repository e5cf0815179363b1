use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in vector field evaluation.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// An autonomous vector field `x' = F(x)`.
pub trait VectorField<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates F at `x`, writing the rates into `out`.
    fn apply(&self, x: &[T], out: &mut [T]);

    /// Euclidean norm of F(x); zero exactly at an equilibrium.
    fn residual_norm(&self, x: &[T]) -> T {
        let mut out = vec![T::zero(); self.dimension()];
        self.apply(x, &mut out);
        out.iter().fold(T::zero(), |acc, v| acc + *v * *v).sqrt()
    }
}
