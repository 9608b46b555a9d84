//! Broadcast cancellation.

mod registry;

pub use registry::{CancelRegistry, Waiter, WaiterId};
