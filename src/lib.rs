// Library target: the binary in main.rs, the integration tests and the
// criterion benchmarks all reach the round core through this module tree.
pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod oracle;
pub mod session;
pub mod store;
pub mod ui;
