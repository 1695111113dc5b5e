//! `mht_core` — Multiple hypothesis tracking engine.
//!
//! Associates noisy point measurements over time into consistent target
//! tracks. Each scan, the engine grows a forest of track trees (one tree
//! per candidate target, one node per interpretation of one scan),
//! clusters trees that compete for measurements into groups, enumerates
//! the k-best joint interpretations per group, prunes aggressively, and
//! commits decided hypotheses through track-event callbacks.
//!
//! # Module layout
//! - [`types`]      — Identifier newtypes and shared scalars
//! - [`model`]      — Application capability traits (Model / ModelState / ReportData)
//! - [`events`]     — Track-event sink interface and recording log
//! - `report`       — Engine-side report bookkeeping
//! - `hypo`         — Hypothesis nodes, arena, tree growth protocol
//! - `group`        — Groups and joint (group) hypotheses
//! - `assignment`   — Murty k-best enumeration over assignment problems
//! - [`engine`]     — Per-scan pipeline orchestrator
//!
//! The application supplies the motion model(s) and an event sink, feeds
//! measurement batches with [`TrackerEngine::add_reports`], then calls
//! [`TrackerEngine::scan`] until the queue drains and
//! [`TrackerEngine::clear`] to flush pending decisions.

mod assignment;
mod group;
mod hypo;
mod report;

pub mod engine;
pub mod events;
pub mod model;
pub mod types;

pub use engine::{EngineStats, TrackerConfig, TrackerEngine};
pub use events::{EventLog, EventSink, TrackEvent};
pub use model::{Model, ModelState, ReportData};
pub use types::{HypoId, ReportId, ScanStamp, TrackId};
