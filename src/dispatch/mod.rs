//! Dispatch engine — campaign lifecycle orchestration.

pub mod engine;

pub use engine::{ActivationReport, DispatchEngine};
