mod assistant;
mod chat;
mod context;

pub use assistant::*;
pub use chat::*;
pub use context::*;
