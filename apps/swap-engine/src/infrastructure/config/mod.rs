//! Dependency injection.

mod container;

pub use container::{BackgroundTasks, Container, SwapIntake, SwapJobProcessor};
