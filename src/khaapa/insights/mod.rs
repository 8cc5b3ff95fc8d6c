pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod insight;
pub mod io;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod recommend;
pub mod server;
pub mod tools;

pub use error::{Result, ToolError};
