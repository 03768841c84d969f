pub mod metrics;
pub mod problematic;
