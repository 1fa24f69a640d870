//! Post-hoc grid compliance checks on solved export profiles.

pub mod checker;

pub use checker::*;
