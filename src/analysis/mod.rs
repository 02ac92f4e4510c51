//! Report aggregation.
//!
//! Turns the accumulated page reviews into the site-level analysis block.

pub mod aggregator;

pub use aggregator::aggregate;
