//! snglrank - single-detector trigger ranking, clustering, and significance
//!
//! This library provides the core of a single-detector gravitational-wave
//! candidate pipeline: a combined ranking statistic per trigger, temporal
//! clustering to one representative per window, and an empirical
//! false-alarm-rate estimate for each surviving candidate.

pub mod bank;
pub mod cli;
pub mod cluster;
pub mod foreground;
pub mod pipeline;
pub mod ranking;
pub mod significance;
pub mod trigger;
