//! Track-event callbacks emitted when the engine commits to a hypothesis.
//!
//! Each event fires at most once per hypothesis node, when pruning has
//! left the node as the sole survivor at its depth. The time stamp is
//! the scan index the node was born in, which generally trails the
//! current scan by up to `max_depth`.

use crate::model::{ModelState, ReportData};
use crate::types::{ScanStamp, TrackId};
use serde::{Deserialize, Serialize};

/// Receiver for committed track decisions.
pub trait EventSink {
    /// A track started: first measurement of a new target.
    fn start_track(
        &mut self,
        track: TrackId,
        t: ScanStamp,
        state: &dyn ModelState,
        report: &dyn ReportData,
    );

    /// A track continued and a measurement of it was reported.
    fn continue_track(
        &mut self,
        track: TrackId,
        t: ScanStamp,
        state: &dyn ModelState,
        report: &dyn ReportData,
    );

    /// A track continued but no measurement of it was reported.
    fn skip_track(&mut self, track: TrackId, t: ScanStamp, state: &dyn ModelState);

    /// A track ended at scan `t`.
    fn end_track(&mut self, track: TrackId, t: ScanStamp);

    /// A report was decided to be a false alarm.
    fn false_alarm(&mut self, t: ScanStamp, report: &dyn ReportData);
}

/// Owned record of one emitted event, for logs and assertions. State and
/// report payloads are not carried — only their identity-free essentials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrackEvent {
    Start { track: TrackId, t: ScanStamp },
    Continue { track: TrackId, t: ScanStamp },
    Skip { track: TrackId, t: ScanStamp },
    End { track: TrackId, t: ScanStamp },
    FalseAlarm { t: ScanStamp },
}

/// An [`EventSink`] that records the event stream. Handy in tests and as
/// a building block for application sinks that only care about ordering.
#[derive(Default)]
pub struct EventLog {
    pub events: Vec<TrackEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_starts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TrackEvent::Start { .. }))
            .count()
    }

    pub fn count_false_alarms(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TrackEvent::FalseAlarm { .. }))
            .count()
    }
}

impl EventSink for EventLog {
    fn start_track(
        &mut self,
        track: TrackId,
        t: ScanStamp,
        _state: &dyn ModelState,
        _report: &dyn ReportData,
    ) {
        self.events.push(TrackEvent::Start { track, t });
    }

    fn continue_track(
        &mut self,
        track: TrackId,
        t: ScanStamp,
        _state: &dyn ModelState,
        _report: &dyn ReportData,
    ) {
        self.events.push(TrackEvent::Continue { track, t });
    }

    fn skip_track(&mut self, track: TrackId, t: ScanStamp, _state: &dyn ModelState) {
        self.events.push(TrackEvent::Skip { track, t });
    }

    fn end_track(&mut self, track: TrackId, t: ScanStamp) {
        self.events.push(TrackEvent::End { track, t });
    }

    fn false_alarm(&mut self, t: ScanStamp, _report: &dyn ReportData) {
        self.events.push(TrackEvent::FalseAlarm { t });
    }
}
