mod provider;
mod types;

pub use provider::*;
pub use types::*;
