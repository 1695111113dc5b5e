//! `sim` — deterministic synthetic corner scans.
//!
//! Generates the measurement stream a corner detector would produce for
//! a set of moving point targets: per-scan detection draws, position
//! noise, Poisson clutter. Everything is seeded, so a scenario replays
//! identically for a given seed.
//!
//! # Module layout
//! - [`target`]    — Point targets on straight-line paths
//! - [`generator`] — Scan generation and named scenarios

pub mod generator;
pub mod target;

pub use generator::{CornerScan, Scenario, ScenarioKind, SimConfig, SimCorner};
pub use target::CornerTarget;
