// Test utilities shared across integration tests

pub mod setup;

pub use setup::*;
