mod contact_solver;

pub use contact_solver::{CombineMode, ContactSolver, SolverSettings, SolverStats};
