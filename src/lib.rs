// src/lib.rs
pub mod config;
pub mod query;
pub mod engine;
pub mod api;

pub use config::*;
pub use query::*;
pub use engine::*;
pub use api::*;
