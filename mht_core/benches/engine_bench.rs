use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mht_core::events::EventLog;
use mht_core::model::{Model, ModelState, ReportData};
use mht_core::{TrackerConfig, TrackerEngine};
use std::any::Any;
use std::rc::Rc;

// Minimal constant-position model: enough structure to exercise tree
// growth, grouping and the k-best enumerator without Kalman math.

struct BenchModel {
    me: std::cell::RefCell<std::rc::Weak<BenchModel>>,
}

impl BenchModel {
    fn new() -> Rc<BenchModel> {
        let model = Rc::new(BenchModel {
            me: std::cell::RefCell::new(std::rc::Weak::new()),
        });
        *model.me.borrow_mut() = Rc::downgrade(&model);
        model
    }
}

struct BenchState {
    x: f64,
    y: f64,
    ll: f64,
    mdl: Rc<BenchModel>,
}

impl ModelState for BenchState {
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

struct BenchReport {
    x: f64,
    y: f64,
}

impl ReportData for BenchReport {
    fn false_alarm_log_likelihood(&self) -> f64 {
        (0.01f64).ln()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Model for BenchModel {
    fn begin_new_states(
        &self,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> usize {
        usize::from(state.is_some() || report.is_some())
    }

    fn new_state(
        &self,
        _i: usize,
        state: Option<&dyn ModelState>,
        report: Option<&dyn ReportData>,
    ) -> Option<Rc<dyn ModelState>> {
        let mdl = self.me.borrow().upgrade().expect("model dropped");
        let report = report.map(|r| r.as_any().downcast_ref::<BenchReport>().unwrap());
        let state = state.map(|s| s.as_any().downcast_ref::<BenchState>().unwrap());
        match (state, report) {
            (None, Some(r)) => Some(Rc::new(BenchState {
                x: r.x,
                y: r.y,
                ll: (0.1f64).ln(),
                mdl,
            })),
            (Some(s), None) => Some(Rc::new(BenchState {
                x: s.x,
                y: s.y,
                ll: 0.0,
                mdl,
            })),
            (Some(s), Some(r)) => {
                let d2 = (s.x - r.x).powi(2) + (s.y - r.y).powi(2);
                if d2 > 9.0 {
                    return None;
                }
                Some(Rc::new(BenchState {
                    x: r.x,
                    y: r.y,
                    ll: -d2 / 2.0,
                    mdl,
                }))
            }
            (None, None) => None,
        }
    }

    fn end_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        (0.05f64).ln()
    }
    fn continue_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        (0.95f64).ln()
    }
    fn skip_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        (0.1f64).ln()
    }
    fn detect_log_likelihood(&self, _state: &dyn ModelState) -> f64 {
        (0.9f64).ln()
    }
}

fn make_batch(n: usize, t: f64) -> Vec<Box<dyn ReportData>> {
    (0..n)
        .map(|i| {
            Box::new(BenchReport {
                x: i as f64 * 10.0 + t,
                y: i as f64 * 10.0,
            }) as Box<dyn ReportData>
        })
        .collect()
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for n in [5, 20, 50] {
        group.bench_function(format!("{n}_targets_10_scans"), |b| {
            b.iter(|| {
                let mut engine = TrackerEngine::new(
                    TrackerConfig {
                        max_depth: 3,
                        min_g_hypo_ratio: 0.01,
                        max_g_hypos: 10,
                    },
                    vec![BenchModel::new()],
                );
                let mut log = EventLog::new();
                for t in 0..10 {
                    engine.add_reports(make_batch(n, t as f64), 1.0);
                    engine.scan(&mut log);
                }
                engine.clear(&mut log);
                black_box(log.events.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
