//! Constant-velocity Kalman model over the state (x, dx, y, dy).
//!
//! # Design choices
//! - Unit time step between scans; positions are image-plane coordinates.
//! - The filter derivations that don't depend on a report (prediction,
//!   innovation covariance inverse, gain, updated covariance, likelihood
//!   coefficient) are computed lazily per state: a state may be pruned
//!   before any report is ever validated against it.
//! - A continuation is gated on the Mahalanobis distance of the
//!   innovation; reports outside the gate are not worth considering.
//! - The probability that a track ends grows with the number of scans
//!   the state has already skipped: P(end) = 1 − exp(−skips/λ).
//!
//! ## Transition and noise (unit step)
//! F = [[1,1,0,0],[0,1,0,0],[0,0,1,1],[0,0,0,1]]
//! Q = q · [[⅓,½,0,0],[½,1,0,0],[0,0,⅓,½],[0,0,½,1]]
//! H = [[1,0,0,0],[0,0,1,0]]

use crate::report::CornerReport;
use mht_core::{Model, ModelState, ReportData};
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::{Rc, Weak};

/// log(2π^(m/2)) for the 2-dimensional measurement space.
const LOG_NORM_FACTOR: f64 = 1.596_359_7;

/// Keeps a vanishing end probability away from log(0).
const EPSILON: f64 = 1e-14;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CvModelConfig {
    /// Measurement variance of the corner x position (pixels²).
    pub position_variance_x: f64,
    /// Measurement variance of the corner y position (pixels²).
    pub position_variance_y: f64,
    /// Process noise spectral density (acceleration variance).
    pub process_variance: f64,
    /// Initial velocity variance for a freshly started track.
    pub state_variance: f64,
    /// Expected number of new tracks per scan; a start is scored
    /// log(mean_new_tracks).
    pub mean_new_tracks: f64,
    /// Scale of the end probability: P(end) = 1 − exp(−skips/λ).
    pub lambda_end: f64,
    /// Probability that an existing target is detected on a scan.
    pub detect_prob: f64,
    /// Mahalanobis gate (squared distance) for validating a report.
    pub max_distance: f64,
}

impl Default for CvModelConfig {
    fn default() -> Self {
        Self {
            position_variance_x: 1.0,
            position_variance_y: 1.0,
            process_variance: 0.5,
            state_variance: 10.0,
            mean_new_tracks: 0.1,
            lambda_end: 5.0,
            detect_prob: 0.9,
            max_distance: 9.21, // χ²(0.99, 2)
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

pub struct CvModel {
    config: CvModelConfig,
    /// Measurement covariance R.
    r: Matrix2<f64>,
    /// Covariance for a freshly started track.
    start_p: Matrix4<f64>,
    start_ll: f64,
    skip_ll: f64,
    detect_ll: f64,
    me: RefCell<Weak<CvModel>>,
}

impl CvModel {
    pub fn new(config: CvModelConfig) -> Rc<CvModel> {
        let r = Matrix2::new(config.position_variance_x, 0.0, 0.0, config.position_variance_y);
        let start_p = Matrix4::new(
            config.position_variance_x, 0.0, 0.0, 0.0,
            0.0, config.state_variance, 0.0, 0.0,
            0.0, 0.0, config.position_variance_y, 0.0,
            0.0, 0.0, 0.0, config.state_variance,
        );
        let model = Rc::new(CvModel {
            start_ll: config.mean_new_tracks.ln(),
            skip_ll: (1.0 - config.detect_prob).ln(),
            detect_ll: config.detect_prob.ln(),
            config,
            r,
            start_p,
            me: RefCell::new(Weak::new()),
        });
        *model.me.borrow_mut() = Rc::downgrade(&model);
        model
    }

    pub fn config(&self) -> &CvModelConfig {
        &self.config
    }

    fn handle(&self) -> Rc<CvModel> {
        self.me.borrow().upgrade().expect("model dropped")
    }

    fn end_prob(&self, state: &CvState) -> f64 {
        let p = 1.0 - (-(state.skip_count as f64) / self.config.lambda_end).exp();
        if p == 0.0 {
            EPSILON
        } else {
            p
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Filter derivations independent of any particular report.
struct Derived {
    /// State prediction x₁ = F·x.
    prediction: Vector4<f64>,
    /// Updated covariance for the successor state.
    next_p: Matrix4<f64>,
    /// Inverse innovation covariance S⁻¹.
    s_inv: Matrix2<f64>,
    /// Filter gain W = P₁·Hᵀ·S⁻¹.
    gain: Matrix4x2<f64>,
    /// Innovation-independent part of the continuation likelihood:
    /// −(log 2π^(m/2) + ½·log det S).
    ll_coef: f64,
}

pub struct CvState {
    pos_x: f64,
    pos_y: f64,
    /// Velocity lives in cells: the first continuation of a track seeds
    /// it from the report displacement (see `bootstrap_velocity`).
    vel_x: Cell<f64>,
    vel_y: Cell<f64>,
    p: Matrix4<f64>,
    log_likelihood: f64,
    /// Consecutive scans this estimate has gone unmeasured.
    skip_count: u32,
    derived: OnceCell<Derived>,
    mdl: Rc<CvModel>,
}

impl CvState {
    pub fn x(&self) -> f64 {
        self.pos_x
    }
    pub fn y(&self) -> f64 {
        self.pos_y
    }
    pub fn dx(&self) -> f64 {
        self.vel_x.get()
    }
    pub fn dy(&self) -> f64 {
        self.vel_y.get()
    }
    pub fn skip_count(&self) -> u32 {
        self.skip_count
    }

    fn state_vector(&self) -> Vector4<f64> {
        Vector4::new(self.pos_x, self.vel_x.get(), self.pos_y, self.vel_y.get())
    }

    fn setup(&self) -> &Derived {
        self.derived.get_or_init(|| {
            let q_scale = self.mdl.config.process_variance;
            let f = Matrix4::new(
                1.0, 1.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 1.0,
                0.0, 0.0, 0.0, 1.0,
            );
            let q = Matrix4::new(
                1.0 / 3.0, 0.5, 0.0, 0.0,
                0.5, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0 / 3.0, 0.5,
                0.0, 0.0, 0.5, 1.0,
            ) * q_scale;
            let h = Matrix2x4::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0);

            let p1 = f * self.p * f.transpose() + q;
            let s = h * p1 * h.transpose() + self.mdl.r;
            let ll_coef = -(LOG_NORM_FACTOR + s.determinant().ln() / 2.0);
            let s_inv = s
                .try_inverse()
                .expect("innovation covariance is singular");
            let gain = p1 * h.transpose() * s_inv;
            let next_p = p1 - gain * s * gain.transpose();

            Derived {
                prediction: f * self.state_vector(),
                next_p,
                s_inv,
                gain,
                ll_coef,
            }
        })
    }

    /// A freshly started track carries zero velocity. Its first validated
    /// continuation seeds the velocity from the report displacement, so
    /// the prediction lands on the report.
    fn bootstrap_velocity(&self, report: &CornerReport) {
        if self.vel_x.get() == 0.0 && self.vel_y.get() == 0.0 {
            self.vel_x.set(report.x - self.pos_x);
            self.vel_y.set(report.y - self.pos_y);
        }
    }
}

impl ModelState for CvState {
    fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }
    fn model(&self) -> &dyn Model {
        self.mdl.as_ref()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Model impl
// ---------------------------------------------------------------------------

fn downcast_state(state: &dyn ModelState) -> &CvState {
    state
        .as_any()
        .downcast_ref::<CvState>()
        .expect("constant-velocity model handed a foreign state")
}

fn downcast_report(report: &dyn ReportData) -> &CornerReport {
    report
        .as_any()
        .downcast_ref::<CornerReport>()
        .expect("constant-velocity model handed a foreign report")
}

impl Model for CvModel {
    fn begin_new_states(
        &self,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> usize {
        usize::from(state.is_some() || report.is_some())
    }

    fn new_state(
        &self,
        i: usize,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> Option<Rc<dyn ModelState>> {
        assert_eq!(i, 0, "constant-velocity model promises a single candidate");
        let state = state.map(downcast_state);
        let report = report.map(downcast_report);

        match (state, report) {
            (None, Some(r)) => Some(Rc::new(CvState {
                pos_x: r.x,
                pos_y: r.y,
                vel_x: Cell::new(0.0),
                vel_y: Cell::new(0.0),
                p: self.start_p,
                log_likelihood: self.start_ll,
                skip_count: 0,
                derived: OnceCell::new(),
                mdl: self.handle(),
            })),
            (Some(s), None) => {
                let d = s.setup();
                Some(Rc::new(CvState {
                    pos_x: d.prediction[0],
                    pos_y: d.prediction[2],
                    vel_x: Cell::new(d.prediction[1]),
                    vel_y: Cell::new(d.prediction[3]),
                    p: d.next_p,
                    log_likelihood: 0.0,
                    skip_count: s.skip_count + 1,
                    derived: OnceCell::new(),
                    mdl: self.handle(),
                }))
            }
            (Some(s), Some(r)) => {
                s.bootstrap_velocity(r);
                let d = s.setup();
                let v = Vector2::new(r.x - d.prediction[0], r.y - d.prediction[2]);
                let distance = (v.transpose() * d.s_inv * v)[(0, 0)];
                if distance > self.config.max_distance {
                    return None;
                }
                let updated = d.prediction + d.gain * v;
                Some(Rc::new(CvState {
                    pos_x: updated[0],
                    pos_y: updated[2],
                    vel_x: Cell::new(updated[1]),
                    vel_y: Cell::new(updated[3]),
                    p: d.next_p,
                    log_likelihood: d.ll_coef - distance / 2.0,
                    skip_count: 0,
                    derived: OnceCell::new(),
                    mdl: self.handle(),
                }))
            }
            (None, None) => None,
        }
    }

    fn end_log_likelihood(&self, state: &dyn ModelState) -> f64 {
        self.end_prob(downcast_state(state)).ln()
    }

    fn continue_log_likelihood(&self, state: &dyn ModelState) -> f64 {
        (1.0 - self.end_prob(downcast_state(state))).ln()
    }

    fn skip_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        self.skip_ll
    }

    fn detect_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        self.detect_ll
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
