// Service registry: name → entry mapping synchronized against discovery.

pub mod registry;

pub use registry::Registry;
