#![doc = include_str!("../README.md")]

pub mod behavior;
pub mod store;
pub mod tracing;
pub mod transport;

pub use behavior::{Journal, RecordingBehavior};
pub use store::MockStore;
pub use transport::{MockTransport, SeenRequest};
