//! Visual query builder: canvas, join graph, suggestions and SQL preview.

mod config;
mod graph;
mod picker;
mod preview;
mod suggestions;

pub use config::*;
pub use graph::*;
pub use picker::*;
pub use preview::*;
pub use suggestions::*;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("table {0} is already on the canvas")]
    DuplicateTable(String),

    #[error("join {from} = {to} already exists")]
    DuplicateJoin { from: String, to: String },

    #[error("no table node with id {0}")]
    NodeNotFound(String),

    #[error("no join with id {0}")]
    JoinNotFound(String),
}
