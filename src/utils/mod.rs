//! Utility Module
//!
//! - [`Ticker`]: the fixed-interval background invoker that drives animators,
//!   body integration and accelerations

pub mod ticker;

pub use ticker::{Ticker, TickerState};
