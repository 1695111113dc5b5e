//! End-to-end tracking scenarios against a constant-position point model.
//!
//! The model keeps a target where it last was: coasting predicts the same
//! position, a continuation is scored by squared distance to the report,
//! and a spatial gate rejects implausible associations. All lifecycle
//! likelihoods are fixed constants, so every scenario's best joint
//! interpretation can be worked out by hand.

use mht_core::events::{EventLog, TrackEvent};
use mht_core::model::{Model, ModelState, ReportData};
use mht_core::{TrackerConfig, TrackerEngine};
use std::any::Any;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Test model
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct PointParams {
    /// Log-likelihood assigned to a freshly started track state.
    start_ll: f64,
    /// log P(track ends); NEG_INFINITY forbids ending.
    end_ll: f64,
    /// log(1 − P(end)).
    continue_ll: f64,
    /// log(1 − P(detect)).
    skip_ll: f64,
    /// log P(detect).
    detect_ll: f64,
    /// Maximum squared distance for a continuation.
    gate: f64,
    /// Squared-distance scale: continuation state ll = −d²/(2σ²).
    sigma2: f64,
    /// When false the model never seeds tracks (every report is clutter).
    allow_start: bool,
}

impl Default for PointParams {
    fn default() -> Self {
        Self {
            start_ll: (0.1f64).ln(),
            end_ll: (0.05f64).ln(),
            continue_ll: (0.95f64).ln(),
            skip_ll: (0.1f64).ln(),
            detect_ll: (0.9f64).ln(),
            gate: 9.0,
            sigma2: 1.0,
            allow_start: true,
        }
    }
}

struct PointModel {
    params: PointParams,
    me: std::cell::RefCell<std::rc::Weak<PointModel>>,
}

impl PointModel {
    fn new(params: PointParams) -> Rc<PointModel> {
        let model = Rc::new(PointModel {
            params,
            me: std::cell::RefCell::new(std::rc::Weak::new()),
        });
        *model.me.borrow_mut() = Rc::downgrade(&model);
        model
    }

    fn handle(&self) -> Rc<PointModel> {
        self.me.borrow().upgrade().expect("model dropped")
    }
}

struct PointState {
    x: f64,
    y: f64,
    ll: f64,
    mdl: Rc<PointModel>,
}

impl ModelState for PointState {
    fn log_likelihood(&self) -> f64 {
        self.ll
    }
    fn model(&self) -> &dyn Model {
        self.mdl.as_ref()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PointReport {
    x: f64,
    y: f64,
    falarm_ll: f64,
}

impl ReportData for PointReport {
    fn false_alarm_log_likelihood(&self) -> f64 {
        self.falarm_ll
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Model for PointModel {
    fn begin_new_states(
        &self,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> usize {
        match (state, report) {
            (None, Some(_)) => usize::from(self.params.allow_start),
            (Some(_), _) => 1,
            (None, None) => 0,
        }
    }

    fn new_state(
        &self,
        i: usize,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> Option<Rc<dyn ModelState>> {
        assert_eq!(i, 0, "point model promises a single candidate");
        let report = report.map(|r| {
            r.as_any()
                .downcast_ref::<PointReport>()
                .expect("foreign report")
        });
        let state = state.map(|s| {
            s.as_any()
                .downcast_ref::<PointState>()
                .expect("foreign state")
        });
        match (state, report) {
            (None, Some(r)) => Some(Rc::new(PointState {
                x: r.x,
                y: r.y,
                ll: self.params.start_ll,
                mdl: self.handle(),
            })),
            (Some(s), None) => Some(Rc::new(PointState {
                x: s.x,
                y: s.y,
                ll: 0.0,
                mdl: self.handle(),
            })),
            (Some(s), Some(r)) => {
                let d2 = (s.x - r.x).powi(2) + (s.y - r.y).powi(2);
                if d2 > self.params.gate {
                    return None;
                }
                Some(Rc::new(PointState {
                    x: r.x,
                    y: r.y,
                    ll: -d2 / (2.0 * self.params.sigma2),
                    mdl: self.handle(),
                }))
            }
            (None, None) => None,
        }
    }

    fn end_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        self.params.end_ll
    }
    fn continue_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        self.params.continue_ll
    }
    fn skip_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        self.params.skip_ll
    }
    fn detect_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        self.params.detect_ll
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

const FALARM_LL: f64 = -4.605_170_185_988_091; // ln 0.01

fn batch(positions: &[(f64, f64)]) -> Vec<Box<dyn ReportData>> {
    positions
        .iter()
        .map(|&(x, y)| {
            Box::new(PointReport {
                x,
                y,
                falarm_ll: FALARM_LL,
            }) as Box<dyn ReportData>
        })
        .collect()
}

/// Feed every scan, checking invariants after each, then drain.
fn run(config: TrackerConfig, params: PointParams, scans: &[&[(f64, f64)]]) -> EventLog {
    let model = PointModel::new(params);
    let mut engine = TrackerEngine::new(config, vec![model]);
    let mut log = EventLog::new();
    for scan in scans {
        engine.add_reports(batch(scan), 1.0);
        assert!(engine.scan(&mut log), "queued batch must be consumed");
        engine.check_invariants();
    }
    assert!(!engine.scan(&mut log), "queue must be drained");
    engine.clear(&mut log);
    assert!(!engine.is_in_use(), "clear must leave the engine empty");
    log
}

fn events_at(log: &EventLog, t: i64) -> Vec<&TrackEvent> {
    log.events
        .iter()
        .filter(|e| match e {
            TrackEvent::Start { t: et, .. }
            | TrackEvent::Continue { t: et, .. }
            | TrackEvent::Skip { t: et, .. }
            | TrackEvent::End { t: et, .. }
            | TrackEvent::FalseAlarm { t: et } => *et == t,
        })
        .collect()
}

/// Property 9: no hypothesis commits twice.
fn assert_no_duplicate_events(log: &EventLog) {
    for (i, a) in log.events.iter().enumerate() {
        for b in &log.events[i + 1..] {
            assert_ne!(a, b, "event emitted twice: {a:?}");
        }
    }
}

// ---------------------------------------------------------------------------
// S1 — single clean track
// ---------------------------------------------------------------------------

#[test]
fn s1_single_clean_track() {
    let config = TrackerConfig {
        max_depth: 3,
        min_g_hypo_ratio: 0.001,
        max_g_hypos: 10,
    };
    let log = run(
        config,
        PointParams::default(),
        &[&[(0.0, 0.0)], &[(1.0, 0.0)], &[(2.0, 0.0)]],
    );

    let starts: Vec<_> = log
        .events
        .iter()
        .filter_map(|e| match e {
            TrackEvent::Start { track, t } => Some((*track, *t)),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 1, "exactly one track starts: {:?}", log.events);
    let (track, t0) = starts[0];
    assert_eq!(t0, 0);

    let continues: Vec<_> = log
        .events
        .iter()
        .filter_map(|e| match e {
            TrackEvent::Continue { track: tr, t } if *tr == track => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(continues, vec![1, 2], "track follows the moving point");
    assert_eq!(log.count_false_alarms(), 0, "no report is clutter");
    assert!(
        !log.events.iter().any(|e| matches!(e, TrackEvent::Skip { .. })),
        "nothing skipped: {:?}",
        log.events
    );
    assert_no_duplicate_events(&log);
}

// ---------------------------------------------------------------------------
// S2 — lone false alarm
// ---------------------------------------------------------------------------

#[test]
fn s2_lone_false_alarm() {
    let config = TrackerConfig {
        max_depth: 3,
        min_g_hypo_ratio: 0.001,
        max_g_hypos: 10,
    };
    let params = PointParams {
        allow_start: false,
        ..PointParams::default()
    };
    let log = run(config, params, &[&[(5.0, 5.0)], &[], &[], &[]]);

    assert_eq!(
        log.events,
        vec![TrackEvent::FalseAlarm { t: 0 }],
        "the only interpretation of the report is clutter"
    );
}

// ---------------------------------------------------------------------------
// S3 — two-target crossover
// ---------------------------------------------------------------------------

#[test]
fn s3_two_target_crossover() {
    let config = TrackerConfig {
        max_depth: 3,
        min_g_hypo_ratio: 0.001,
        max_g_hypos: 10,
    };
    // Targets meet at (2, 2) on scan 2, then separate; the gate admits
    // both associations around the crossing.
    let scans: Vec<Vec<(f64, f64)>> = (0..5)
        .map(|t| {
            let t = t as f64;
            vec![(t, t), (t, 4.0 - t)]
        })
        .collect();
    let scan_refs: Vec<&[(f64, f64)]> = scans.iter().map(|s| s.as_slice()).collect();
    let log = run(config, PointParams::default(), &scan_refs);

    assert_eq!(log.count_false_alarms(), 0);
    assert_eq!(log.count_starts(), 2, "two targets start: {:?}", log.events);

    // Every scan's two reports are explained exactly once each.
    for t in 0..5 {
        assert_eq!(
            events_at(&log, t)
                .iter()
                .filter(|e| matches!(
                    e,
                    TrackEvent::Start { .. } | TrackEvent::Continue { .. }
                ))
                .count(),
            2,
            "scan {t} must commit both reports: {:?}",
            log.events
        );
    }

    // Each started track is continued on all four later scans.
    for e in &log.events {
        if let TrackEvent::Start { track, t } = e {
            assert_eq!(*t, 0);
            let continues: Vec<_> = log
                .events
                .iter()
                .filter_map(|e| match e {
                    TrackEvent::Continue { track: tr, t } if tr == track => Some(*t),
                    _ => None,
                })
                .collect();
            assert_eq!(
                continues,
                vec![1, 2, 3, 4],
                "track {track} must persist through the crossover"
            );
        }
    }
    assert_no_duplicate_events(&log);
}

// ---------------------------------------------------------------------------
// S4 — skip
// ---------------------------------------------------------------------------

#[test]
fn s4_skipped_detection() {
    let config = TrackerConfig {
        max_depth: 3,
        min_g_hypo_ratio: 0.001,
        max_g_hypos: 10,
    };
    let log = run(
        config,
        PointParams::default(),
        &[&[(0.0, 0.0)], &[], &[(0.0, 0.0)]],
    );

    let kinds: Vec<&TrackEvent> = log
        .events
        .iter()
        .filter(|e| !matches!(e, TrackEvent::End { .. }))
        .collect();
    assert_eq!(kinds.len(), 3, "start, skip, continue: {:?}", log.events);
    assert!(matches!(kinds[0], TrackEvent::Start { t: 0, .. }));
    assert!(
        matches!(kinds[1], TrackEvent::Skip { t: 1, .. }),
        "missed detection bridged by a skip: {:?}",
        log.events
    );
    assert!(matches!(kinds[2], TrackEvent::Continue { t: 2, .. }));
    assert_eq!(log.count_false_alarms(), 0);
    assert_no_duplicate_events(&log);
}

// ---------------------------------------------------------------------------
// S5 — end
// ---------------------------------------------------------------------------

#[test]
fn s5_track_end() {
    let config = TrackerConfig {
        max_depth: 3,
        min_g_hypo_ratio: 0.001,
        max_g_hypos: 10,
    };
    // P(end) = 1 makes ending free; the track still continues while
    // reports keep arriving, then ends as soon as they stop.
    let params = PointParams {
        end_ll: 0.0,
        ..PointParams::default()
    };
    let log = run(
        config,
        params,
        &[&[(0.0, 0.0)], &[(0.0, 0.0)], &[], &[]],
    );

    let track = match log.events.first() {
        Some(TrackEvent::Start { track, t: 0 }) => *track,
        other => panic!("expected a start first, got {other:?}"),
    };
    assert!(
        log.events.contains(&TrackEvent::Continue { track, t: 1 }),
        "{:?}",
        log.events
    );
    assert!(
        log.events.contains(&TrackEvent::End { track, t: 1 }),
        "track ends at the last continue's scan: {:?}",
        log.events
    );
    assert!(
        !log.events.iter().any(|e| matches!(e, TrackEvent::Skip { .. })),
        "free ending beats paying to skip: {:?}",
        log.events
    );
    assert_no_duplicate_events(&log);
}

// ---------------------------------------------------------------------------
// S6 — pruning law
// ---------------------------------------------------------------------------

#[test]
fn s6_single_hypothesis_pruning() {
    let config = TrackerConfig {
        max_depth: 3,
        min_g_hypo_ratio: 0.001,
        max_g_hypos: 1,
    };
    let model = PointModel::new(PointParams::default());
    let mut engine = TrackerEngine::new(config, vec![model]);
    let mut log = EventLog::new();

    for t in 0..5 {
        let t = t as f64;
        engine.add_reports(batch(&[(t, t), (t, 4.0 - t)]), 1.0);
        assert!(engine.scan(&mut log));
        engine.check_invariants();
        let stats = engine.stats();
        assert!(
            stats.max_group_hypos <= 1,
            "every group holds exactly one joint hypothesis, got {stats:?}"
        );
    }
    engine.clear(&mut log);
    assert!(!engine.is_in_use());

    // A single retained hypothesis per group forces one consistent
    // interpretation: both reports of each scan committed exactly once.
    for t in 0..5 {
        assert_eq!(
            events_at(&log, t)
                .iter()
                .filter(|e| !matches!(e, TrackEvent::End { .. }))
                .count(),
            2,
            "scan {t}: {:?}",
            log.events
        );
    }
    assert_no_duplicate_events(&log);
}

// ---------------------------------------------------------------------------
// Round trip — clear() idempotence
// ---------------------------------------------------------------------------

#[test]
fn clear_is_idempotent() {
    let config = TrackerConfig::default();
    let model = PointModel::new(PointParams::default());
    let mut engine = TrackerEngine::new(config, vec![model]);
    let mut log = EventLog::new();

    engine.add_reports(batch(&[(0.0, 0.0)]), 1.0);
    assert!(engine.scan(&mut log));
    engine.clear(&mut log);
    assert!(!engine.is_in_use());

    let after_first_clear = log.events.clone();
    engine.clear(&mut log);
    assert_eq!(
        log.events, after_first_clear,
        "a second clear must not re-verify anything"
    );
    assert_no_duplicate_events(&log);
}
