//! `motion_models` — application-side collaborators for the MHT engine.
//!
//! # Module layout
//! - [`report`]            — Corner measurement report type
//! - [`constant_velocity`] — Constant-velocity Kalman model over (x, dx, y, dy)

pub mod constant_velocity;
pub mod report;

pub use constant_velocity::{CvModel, CvModelConfig, CvState};
pub use report::CornerReport;
