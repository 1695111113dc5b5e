//! Engine-side wrapper around one measurement report.
//!
//! The payload is opaque to the engine; the wrapper carries the
//! bookkeeping: a per-scan row index (the report's column in assignment
//! matrices), a transient group label recomputed each scan, and the
//! back-link list of every hypothesis that consumes this report.

use crate::model::ReportData;
use crate::types::HypoId;

pub struct Report {
    payload: Box<dyn ReportData>,
    /// Column index in this scan's assignment matrices. Assigned
    /// contiguously from 0 when the report batch is imported; stable for
    /// the duration of the scan.
    pub(crate) row: usize,
    /// Group label, recomputed each scan; -1 means unlabeled.
    pub(crate) group_label: i64,
    /// Hypotheses whose paths consume this report. Severed eagerly when a
    /// hypothesis is removed.
    pub(crate) hypo_links: Vec<HypoId>,
}

impl Report {
    pub(crate) fn new(payload: Box<dyn ReportData>) -> Self {
        Self {
            payload,
            row: 0,
            group_label: -1,
            hypo_links: Vec::new(),
        }
    }

    pub fn data(&self) -> &dyn ReportData {
        self.payload.as_ref()
    }

    pub fn false_alarm_log_likelihood(&self) -> f64 {
        self.payload.false_alarm_log_likelihood()
    }

    /// A report is in use while any hypothesis still references it.
    pub(crate) fn is_in_use(&self) -> bool {
        !self.hypo_links.is_empty()
    }

    pub(crate) fn unlink(&mut self, hypo: HypoId) {
        if let Some(pos) = self.hypo_links.iter().position(|&h| h == hypo) {
            self.hypo_links.swap_remove(pos);
        }
    }
}
