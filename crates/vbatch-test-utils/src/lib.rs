pub mod doubles;
pub mod harness;
