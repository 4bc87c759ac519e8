// Background workers.

pub mod sync;

pub use sync::SyncWorker;
