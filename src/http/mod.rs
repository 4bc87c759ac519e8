// HTTP module: server, auth helpers, streaming body.

pub mod auth;
pub mod body;
pub mod server;


// Re-export server types
pub use server::HttpServer;

// Common controller interface
pub use crate::controller::controller::Controller;
