//! Wall-clock timing module
//!
//! Location samples are stamped in Unix epoch milliseconds. This module
//! provides the clock abstraction used when a sample arrives without its
//! own timestamp, plus a few helpers for millisecond arithmetic.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
