pub mod analysis;
pub mod bifurcation;
pub mod classification;
pub mod equation_engine;
pub mod equilibrium;
pub mod error;
pub mod family;
pub mod linearization;
pub mod settings;
pub mod symbolic;
pub mod system;
/// The `planar_core` crate is the analysis engine behind Planar.
/// It finds equilibria of user-defined systems, linearizes them and classifies
/// the resulting planar phase portraits.
///
/// Key components:
/// - **Symbolic**: Exact expressions, derivatives and a polynomial equilibrium solver.
/// - **Equation Engine**: A bytecode VM for evaluating compiled expressions numerically.
/// - **Equilibrium / Linearization**: Exact and numeric equilibria, Jacobians and eigenpairs.
/// - **Classification / Bifurcation**: Eigenvalue taxonomy and one-parameter sweeps.
/// - **Analysis**: Per-equilibrium records combining the above.
pub mod traits;
