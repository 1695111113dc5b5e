//! Capability traits supplied by the application.
//!
//! The engine knows nothing about Kalman matrices or image features. It
//! sees target behaviour through [`Model`] (propose successor states, price
//! the end/continue/skip/detect alternatives), state estimates through
//! [`ModelState`] (a log-likelihood plus an opaque payload), and
//! measurements through [`ReportData`] (a false-alarm log-likelihood plus
//! an opaque payload).
//!
//! # Successor enumeration protocol
//!
//! ```text
//! let n = model.begin_new_states(state, report);
//! for i in 0..n {
//!     if let Some(s) = model.new_state(i, state, report) { ... }
//! }
//! model.end_new_states();
//! ```
//!
//! `state == None` asks for track-seeding states from the report alone;
//! `report == None` asks for coasting (skip) states from the prior state
//! alone. `new_state` returning `None` means "not worth considering"
//! (e.g. the report fell outside the validation gate). `n` may be any
//! count ≥ 0 — the engine never assumes a particular value.
//!
//! All likelihoods are natural-log scaled; `f64::NEG_INFINITY` disables
//! the corresponding branch.

use std::any::Any;
use std::rc::Rc;

/// One estimated target state, produced by a [`Model`].
pub trait ModelState {
    /// Log-likelihood that this state truly follows the state it was
    /// generated from (log P(state | parent state)).
    fn log_likelihood(&self) -> f64;

    /// The model that proposes successors to this state.
    fn model(&self) -> &dyn Model;

    /// Downcast hook for the owning application.
    fn as_any(&self) -> &dyn Any;
}

/// One measurement report, as seen by the engine.
pub trait ReportData {
    /// Log-likelihood that this report is a false alarm.
    fn false_alarm_log_likelihood(&self) -> f64;

    /// Downcast hook for the owning application.
    fn as_any(&self) -> &dyn Any;
}

/// A target behaviour model.
///
/// Methods take `&self`; implementations keep any per-enumeration scratch
/// behind interior mutability (the calls run synchronously on the engine's
/// thread, one enumeration at a time).
pub trait Model {
    /// A new scan is starting; `dt` is the time step the batch was
    /// recorded with. Models that don't care keep the default no-op.
    fn begin_scan(&self, _dt: f64) {}

    /// Announce that successor states will be requested for the given
    /// (state, report) pair. Returns the number of candidates `n ≥ 0`.
    fn begin_new_states(
        &self,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> usize;

    /// Produce candidate `i` (with `0 ≤ i < n`), or `None` if it is not
    /// worth considering. Called at most `n` times per enumeration.
    fn new_state(
        &self,
        i: usize,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> Option<Rc<dyn ModelState>>;

    /// Release any scratch set up by `begin_new_states`.
    fn end_new_states(&self) {}

    /// log P(track ends after `state`). `NEG_INFINITY` means the track
    /// cannot end here.
    fn end_log_likelihood(&self, state: &dyn ModelState) -> f64;

    /// log(1 − P(end)). `NEG_INFINITY` disables all continuations.
    fn continue_log_likelihood(&self, state: &dyn ModelState) -> f64;

    /// log P(miss detection | track continues).
    fn skip_log_likelihood(&self, state: &dyn ModelState) -> f64;

    /// log P(detection | track continues).
    fn detect_log_likelihood(&self, state: &dyn ModelState) -> f64;
}
