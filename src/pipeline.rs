//! Single-detector candidate pipeline orchestration
//!
//! Drives the full flow: partitioned template loop feeding the ranking
//! statistic, concatenation into the foreground accumulator, temporal
//! clustering, significance estimation, and the atomic container write.
//! Nothing re-enters an earlier stage.

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::bank;
use crate::cluster::cluster_over_time;
use crate::foreground::{
    ForegroundAccumulator, ForegroundColumns, ForegroundFile, RunMetadata, SegmentColumns,
};
use crate::ranking::{RankingStatistic, StatError};
use crate::significance::{
    count_louder, false_alarm_probability, inverse_false_alarm_rate, seconds_to_years,
};
use crate::trigger::{total_livetime, TriggerSource};

/// Errors for a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No candidates across the entire assigned template range. A run that
    /// produced nothing must fail loudly rather than commit an empty but
    /// "successful" container.
    #[error("No candidates survived in the assigned template range")]
    EmptyForeground,

    /// The container declares no valid analysis time. Every IFAR and FAP
    /// divides by the livetime, so zero livetime would commit a container
    /// full of degenerate significance values.
    #[error("Trigger container has zero valid analysis time")]
    ZeroLivetime,

    #[error(transparent)]
    Stat(#[from] StatError),

    #[error("Failed to write output container {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Run configuration for the core pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Partition index within the template bank split
    pub part: u32,
    /// Total number of partitions
    pub pieces: u32,
    /// Shuffle template order with the fixed seed before partitioning
    pub randomize_templates: bool,
    /// Clustering window in seconds; `None` disables clustering
    pub cluster_window: Option<f64>,
    /// Destination path for the foreground container
    pub output: PathBuf,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub templates_processed: usize,
    pub templates_with_triggers: usize,
    pub candidates_ranked: usize,
    pub candidates_surviving: usize,
    pub foreground_time_seconds: f64,
}

/// Execute the full pipeline over one trigger source
pub fn run(
    source: &mut dyn TriggerSource,
    statistic: &RankingStatistic,
    config: &PipelineConfig,
) -> Result<RunSummary> {
    let detector = source.detector().to_string();
    let segments = source.valid_segments().to_vec();
    let foreground_time = total_livetime(&segments);
    if foreground_time <= 0.0 {
        return Err(PipelineError::ZeroLivetime);
    }
    let template_ids = bank::template_ids(
        source.num_templates(),
        config.part,
        config.pieces,
        config.randomize_templates,
    );
    info!(
        detector = %detector,
        templates = template_ids.len(),
        part = config.part,
        pieces = config.pieces,
        "starting template loop"
    );

    let mut accumulator = ForegroundAccumulator::new();
    let mut templates_with_triggers = 0;

    for &template_id in &template_ids {
        let batch = source.select_template(template_id);
        if batch.is_empty() {
            debug!(template = template_id, "template has no triggers, skipping");
            continue;
        }
        templates_with_triggers += 1;

        let single = statistic.single(&detector, batch)?;
        let mut singles = HashMap::new();
        singles.insert(detector.clone(), single);
        let stats = statistic.combine(&singles)?;

        accumulator.append_template(batch, &stats);
    }

    if accumulator.is_empty() {
        return Err(PipelineError::EmptyForeground);
    }
    info!(candidates = accumulator.len(), "template loop complete");

    // One survivor per temporal cluster; disabled window keeps everything.
    let survivors = match config.cluster_window {
        Some(window) if window > 0.0 => {
            cluster_over_time(accumulator.stats(), accumulator.times(), window)
        }
        _ => cluster_over_time(accumulator.stats(), accumulator.times(), 0.0),
    };

    let surviving_stats: Vec<f64> = survivors.iter().map(|&i| accumulator.stats()[i]).collect();

    // The clustered foreground doubles as its own comparison population with
    // unit weights; ties count as louder.
    let (_, n_louder) = count_louder(&surviving_stats, &surviving_stats, None);

    let mut columns = ForegroundColumns::default();
    for (&idx, &louder) in survivors.iter().zip(&n_louder) {
        let ifar = inverse_false_alarm_rate(louder, foreground_time);
        columns.stat.push(accumulator.stats()[idx]);
        columns.decimation_factor.push(1);
        columns.timeslide_id.push(0);
        columns.template_id.push(accumulator.template_ids()[idx]);
        columns.time.push(accumulator.times()[idx]);
        columns.trigger_id.push(accumulator.trigger_ids()[idx]);
        columns.ifar_years.push(seconds_to_years(ifar));
        columns
            .fap
            .push(false_alarm_probability(foreground_time, ifar));
    }

    let container = ForegroundFile {
        metadata: RunMetadata {
            foreground_time_seconds: foreground_time,
            num_detectors: 1,
            pivot: detector.clone(),
            fixed: detector.clone(),
            ifos: vec![detector.clone()],
        },
        segments: vec![SegmentColumns::from_segments(&detector, &segments)],
        foreground: columns,
    };
    container
        .write_atomic(&config.output)
        .map_err(|source| PipelineError::Write {
            path: config.output.display().to_string(),
            source,
        })?;

    let summary = RunSummary {
        templates_processed: template_ids.len(),
        templates_with_triggers,
        candidates_ranked: accumulator.len(),
        candidates_surviving: survivors.len(),
        foreground_time_seconds: foreground_time,
    };
    info!(
        surviving = summary.candidates_surviving,
        ranked = summary.candidates_ranked,
        "run complete"
    );
    Ok(summary)
}
