#![forbid(unsafe_code)]

pub mod model;
pub mod time;
pub mod timing;

pub use time::Clock;
pub use timing::Timing;
