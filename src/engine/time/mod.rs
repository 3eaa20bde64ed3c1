//! Millisecond clocks driving both loops.

pub mod clock;
pub mod rate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use rate::RateCounter;
