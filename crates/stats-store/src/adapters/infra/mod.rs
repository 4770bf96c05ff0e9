//! Infrastructure Adapters

mod time;

pub use time::{FixedTimeSource, SystemTimeSource};
