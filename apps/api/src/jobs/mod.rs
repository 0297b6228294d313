//! Job application tracker.

pub mod handlers;
pub mod store;
