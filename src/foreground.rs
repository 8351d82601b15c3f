//! Foreground candidate accumulation and the output container
//!
//! Candidates accumulate across the whole template range into one set of
//! growth-amortized column buffers, finalized once after the template loop.
//! The output container is written atomically: serialize to a sibling temp
//! path, then rename, so an interrupted run leaves nothing behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::trigger::{Segment, Trigger};

/// Append-only candidate columns accumulated across templates
///
/// Zero-lag single-detector data: every record carries `timeslide_id` 0 and
/// `decimation_factor` 1.
#[derive(Debug, Default)]
pub struct ForegroundAccumulator {
    stat: Vec<f64>,
    time: Vec<f64>,
    template_id: Vec<u64>,
    trigger_id: Vec<u64>,
}

impl ForegroundAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one template's ranked batch
    ///
    /// `stats` parallels `batch`; both come from the same `single`/`combine`
    /// pass over the template's triggers.
    pub fn append_template(&mut self, batch: &[Trigger], stats: &[f64]) {
        debug_assert_eq!(batch.len(), stats.len());
        self.stat.extend_from_slice(stats);
        self.time.extend(batch.iter().map(|t| t.time));
        self.template_id.extend(batch.iter().map(|t| t.template_id));
        self.trigger_id.extend(batch.iter().map(|t| t.trigger_id));
    }

    pub fn len(&self) -> usize {
        self.stat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stat.is_empty()
    }

    pub fn stats(&self) -> &[f64] {
        &self.stat
    }

    pub fn times(&self) -> &[f64] {
        &self.time
    }

    pub fn template_ids(&self) -> &[u64] {
        &self.template_id
    }

    pub fn trigger_ids(&self) -> &[u64] {
        &self.trigger_id
    }
}

/// Run-level metadata for the output container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Total valid analysis time in seconds
    pub foreground_time_seconds: f64,
    /// Number of detectors contributing (1 in single-detector mode)
    pub num_detectors: u32,
    /// Pivot detector (equals the single active detector)
    pub pivot: String,
    /// Fixed detector (equals the single active detector)
    pub fixed: String,
    /// All contributing detector identifiers
    pub ifos: Vec<String>,
}

/// Per-detector valid-segment arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentColumns {
    pub detector: String,
    pub start: Vec<f64>,
    pub end: Vec<f64>,
}

impl SegmentColumns {
    pub fn from_segments(detector: &str, segments: &[Segment]) -> Self {
        Self {
            detector: detector.to_string(),
            start: segments.iter().map(|s| s.start).collect(),
            end: segments.iter().map(|s| s.end).collect(),
        }
    }
}

/// Surviving-candidate columns with attached significance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForegroundColumns {
    pub stat: Vec<f64>,
    pub decimation_factor: Vec<u32>,
    pub timeslide_id: Vec<i64>,
    pub template_id: Vec<u64>,
    pub time: Vec<f64>,
    pub trigger_id: Vec<u64>,
    pub ifar_years: Vec<f64>,
    pub fap: Vec<f64>,
}

/// The persisted foreground container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForegroundFile {
    pub metadata: RunMetadata,
    pub segments: Vec<SegmentColumns>,
    pub foreground: ForegroundColumns,
}

impl ForegroundFile {
    /// Write the container atomically
    ///
    /// Serializes to `<path>.tmp` in the destination directory and renames
    /// into place, so a partial or interrupted run never commits output.
    pub fn write_atomic(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }
}
