//! Semantic layer: metrics, dimensions, relationships and the models that
//! group them. The backend owns evaluation; this is CRUD plus draft checks.

mod client;
mod types;

pub use client::*;
pub use types::*;
