pub mod cache;
pub mod sweeper;

pub use cache::HoldCache;
pub use sweeper::{Sweep, Sweeper};
