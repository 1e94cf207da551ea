//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They differ from use cases in that they typically run as background tasks
//! or provide long-running functionality.

mod progress_buffer;

pub use progress_buffer::{
    OrderProgressBuffer, ProgressBufferConfig, ProgressEvent, ProgressEventType,
};
