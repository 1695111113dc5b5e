//! `trackcorners` CLI: run the MHT corner tracker over scan files or
//! synthetic scenarios.
//!
//! Input is a JSON array of scans (`sim::CornerScan`); output is a JSON
//! document with one record per committed track (measured and estimated
//! positions per scan) plus the false alarms.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mht_core::{
    EventSink, ModelState, ReportData, ScanStamp, TrackId, TrackerConfig, TrackerEngine,
};
use motion_models::{CornerReport, CvModel, CvModelConfig, CvState};
use serde::{Deserialize, Serialize};
use sim::{CornerScan, Scenario, ScenarioKind};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "trackcorners", about = "Multiple-hypothesis corner tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track corners from a JSON scan file.
    Track {
        /// Path to a JSON array of scans.
        input: PathBuf,
        /// Write the track/false-alarm document here (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Tracking parameter file (JSON); defaults are used if omitted.
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Generate a synthetic scenario's scans to a JSON file.
    Simulate {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility.
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output scan file.
        output: PathBuf,
    },
    /// Generate a scenario and track it in one run.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Write the track/false-alarm document here (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Tracking parameter file (JSON); defaults are used if omitted.
        #[arg(long)]
        params: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Everything the tracker run needs, serializable so parameter sets can
/// be kept alongside data files.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct TrackParams {
    max_depth: i64,
    min_g_hypo_ratio: f64,
    max_g_hypos: usize,
    /// Expected number of false alarms per scan; each report's clutter
    /// likelihood is its log.
    mean_false_alarms: f64,
    model: CvModelConfig,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_g_hypo_ratio: 0.001,
            max_g_hypos: 100,
            mean_false_alarms: 0.5,
            model: CvModelConfig::default(),
        }
    }
}

fn load_params(path: Option<&Path>) -> Result<TrackParams> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading parameter file {}", p.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing parameter file {}", p.display()))
        }
        None => Ok(TrackParams::default()),
    }
}

// ---------------------------------------------------------------------------
// Output document
// ---------------------------------------------------------------------------

/// One committed step of one track. `rx`/`ry` are absent for skipped
/// scans; `sx`/`sy` are the estimated position.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct TrackElement {
    time: ScanStamp,
    frame: i64,
    rx: Option<f64>,
    ry: Option<f64>,
    sx: f64,
    sy: f64,
    log_likelihood: f64,
    corner_id: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CornerTrackRecord {
    id: u64,
    /// Scan index the track was decided to end on, if it ended.
    ended_at: Option<ScanStamp>,
    elements: Vec<TrackElement>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FalseAlarmRecord {
    time: ScanStamp,
    frame: i64,
    x: f64,
    y: f64,
    corner_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TrackDocument {
    params: TrackParams,
    tracks: Vec<CornerTrackRecord>,
    false_alarms: Vec<FalseAlarmRecord>,
}

// ---------------------------------------------------------------------------
// Event sink: assemble track records from verify callbacks
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CornerTrackSink {
    tracks: Vec<CornerTrackRecord>,
    falarms: Vec<FalseAlarmRecord>,
}

impl CornerTrackSink {
    /// Find the record with the given id, creating it on first use.
    fn find_track(&mut self, id: TrackId) -> &mut CornerTrackRecord {
        if let Some(pos) = self.tracks.iter().position(|t| t.id == id.0) {
            return &mut self.tracks[pos];
        }
        self.tracks.push(CornerTrackRecord {
            id: id.0,
            ended_at: None,
            elements: Vec::new(),
        });
        self.tracks.last_mut().expect("just pushed")
    }

    fn push_element(
        &mut self,
        id: TrackId,
        t: ScanStamp,
        state: &dyn ModelState,
        report: Option<&CornerReport>,
    ) {
        let cv = state
            .as_any()
            .downcast_ref::<CvState>()
            .expect("sink expects constant-velocity states");
        let element = TrackElement {
            time: t,
            frame: report.map_or(t, |r| r.frame),
            rx: report.map(|r| r.x),
            ry: report.map(|r| r.y),
            sx: cv.x(),
            sy: cv.y(),
            log_likelihood: state.log_likelihood(),
            corner_id: report.map(|r| r.corner_id),
        };
        self.find_track(id).elements.push(element);
    }

    fn false_alarms(&self) -> &[FalseAlarmRecord] {
        &self.falarms
    }
}

impl EventSink for CornerTrackSink {
    fn start_track(
        &mut self,
        track: TrackId,
        t: ScanStamp,
        state: &dyn ModelState,
        report: &dyn ReportData,
    ) {
        let report = report
            .as_any()
            .downcast_ref::<CornerReport>()
            .expect("sink expects corner reports");
        self.push_element(track, t, state, Some(report));
    }

    fn continue_track(
        &mut self,
        track: TrackId,
        t: ScanStamp,
        state: &dyn ModelState,
        report: &dyn ReportData,
    ) {
        let report = report
            .as_any()
            .downcast_ref::<CornerReport>()
            .expect("sink expects corner reports");
        self.push_element(track, t, state, Some(report));
    }

    fn skip_track(&mut self, track: TrackId, t: ScanStamp, state: &dyn ModelState) {
        self.push_element(track, t, state, None);
    }

    fn end_track(&mut self, track: TrackId, t: ScanStamp) {
        self.find_track(track).ended_at = Some(t);
    }

    fn false_alarm(&mut self, t: ScanStamp, report: &dyn ReportData) {
        let report = report
            .as_any()
            .downcast_ref::<CornerReport>()
            .expect("sink expects corner reports");
        self.falarms.push(FalseAlarmRecord {
            time: t,
            frame: report.frame,
            x: report.x,
            y: report.y,
            corner_id: report.corner_id,
        });
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Track {
            input,
            output,
            params,
        } => {
            let scans = load_scans(&input)?;
            let params = load_params(params.as_deref())?;
            let document = track_scans(&scans, params);
            write_document(&document, output.as_deref())?;
        }
        Commands::Simulate {
            scenario,
            seed,
            output,
        } => {
            let scans = Scenario::build(scenario, seed).generate();
            std::fs::write(&output, serde_json::to_string_pretty(&scans)?)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} scans to {}", scans.len(), output.display());
        }
        Commands::RunScenario {
            scenario,
            seed,
            output,
            params,
        } => {
            let scans = Scenario::build(scenario, seed).generate();
            let params = load_params(params.as_deref())?;
            let document = track_scans(&scans, params);
            write_document(&document, output.as_deref())?;
        }
    }
    Ok(())
}

fn load_scans(path: &Path) -> Result<Vec<CornerScan>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scan file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing scan file {}", path.display()))
}

/// Feed every scan through the tracker, drain it, and assemble the
/// output document.
fn track_scans(scans: &[CornerScan], params: TrackParams) -> TrackDocument {
    let model = CvModel::new(params.model.clone());
    let mut engine = TrackerEngine::new(
        TrackerConfig {
            max_depth: params.max_depth,
            min_g_hypo_ratio: params.min_g_hypo_ratio,
            max_g_hypos: params.max_g_hypos,
        },
        vec![model],
    );
    let mut sink = CornerTrackSink::default();
    let falarm_ll = params.mean_false_alarms.ln();

    let mut corner_id = 0u64;
    for scan in scans {
        let reports: Vec<Box<dyn ReportData>> = scan
            .corners
            .iter()
            .map(|c| {
                let report = CornerReport::new(c.x, c.y, scan.frame, corner_id, falarm_ll);
                corner_id += 1;
                Box::new(report) as Box<dyn ReportData>
            })
            .collect();
        engine.add_reports(reports, 1.0);
        engine.scan(&mut sink);

        let stats = engine.stats();
        tracing::debug!(
            time = engine.current_time(),
            trees = stats.track_trees,
            groups = stats.groups,
            group_hypos = stats.group_hypos,
            "scan complete"
        );
    }
    engine.clear(&mut sink);

    tracing::info!(
        tracks = sink.tracks.len(),
        false_alarms = sink.false_alarms().len(),
        "tracking complete"
    );

    TrackDocument {
        params,
        tracks: sink.tracks,
        false_alarms: sink.falarms,
    }
}

fn write_document(document: &TrackDocument, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(document)?;
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Wrote {} tracks and {} false alarms to {}",
                document.tracks.len(),
                document.false_alarms.len(),
                path.display()
            );
        }
        None => println!("{text}"),
    }
    Ok(())
}
