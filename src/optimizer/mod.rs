pub mod constraints;
pub mod lp;
pub mod solver;

pub use constraints::*;
pub use lp::*;
pub use solver::*;
