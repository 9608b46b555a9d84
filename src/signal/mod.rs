//! OS termination signals.

mod kind;
mod source;

pub use kind::Signal;
pub use source::{subscribe, SignalListener};
