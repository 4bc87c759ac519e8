// Per-service deployment coordinator actor.

pub mod coordinator;

pub use coordinator::{AttachError, CoordinatorHandle, OBSERVER_BUFFER};
