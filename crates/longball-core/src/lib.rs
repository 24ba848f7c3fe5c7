// Library root: re-exports all modules so the CLI and integration tests can
// access the crate's public API.

pub mod config;
pub mod estimator;
pub mod model;
pub mod normalize;
pub mod resolver;
pub mod schedule;
pub mod scorer;
pub mod store;
pub mod tables;
pub mod weights;
