//! Dashboard-level state: tabs, cross-filters, exports and schedules.

mod cross_filter;
mod export;
mod schedule;
mod tabs;

pub use cross_filter::*;
pub use export::*;
pub use schedule::*;
pub use tabs::*;
