//! HTTP facade over the marquee catalog gateway and watch-state store.

pub mod api;
pub mod metrics;
pub mod state;
