//! Trigger data model and the trigger container source
//!
//! Triggers arrive already veto-filtered: the upstream search applies the
//! detector segment vetoes before writing the container, so this module only
//! models the surviving records and the valid analysis segments.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Errors for trigger container loading
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Failed to read trigger file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse trigger file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Trigger file {path} declares no detector identifier")]
    MissingDetector { path: String },
}

/// One matched-filter detection record from a single detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// GPS-style detector time in seconds
    pub time: f64,
    /// Waveform template that produced this trigger
    pub template_id: u64,
    /// Opaque identifier back into the source container
    pub trigger_id: u64,
    /// Matched-filter signal-to-noise ratio
    pub snr: f64,
    /// Chi-square signal-consistency statistic
    pub chisq: f64,
    /// Degrees of freedom of the chi-square test
    pub chisq_dof: u32,
    /// Sine-Gaussian veto chi-square
    pub sg_chisq: f64,
}

impl Trigger {
    /// Reduced chi-square (chisq per degree of freedom)
    pub fn reduced_chisq(&self) -> f64 {
        if self.chisq_dof == 0 {
            return 0.0;
        }
        self.chisq / f64::from(self.chisq_dof)
    }
}

/// A half-open valid analysis time interval [start, end)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    /// Duration in seconds (zero for degenerate segments)
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Total livetime of a segment list in seconds
pub fn total_livetime(segments: &[Segment]) -> f64 {
    segments.iter().map(Segment::duration).sum()
}

/// Source of per-template trigger batches
///
/// The seam to the upstream container: the pipeline selects one template at a
/// time, borrows its batch, and never re-reads a template.
pub trait TriggerSource {
    /// Number of templates in the bank this container was searched against
    fn num_templates(&self) -> usize;

    /// Identifier of the originating instrument (e.g. "H1")
    fn detector(&self) -> &str;

    /// Valid (analyzed, not vetoed) time segments for this detector
    fn valid_segments(&self) -> &[Segment];

    /// Select a template and borrow its surviving triggers
    ///
    /// Out-of-range template ids yield an empty batch rather than an error;
    /// the caller treats empty batches as "no candidates".
    fn select_template(&mut self, template_id: usize) -> &[Trigger];
}

/// JSON-backed trigger container
///
/// Holds per-template trigger arrays indexed densely by template id, the
/// detector identifier, and the detector's valid segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerFile {
    /// Originating detector identifier
    pub detector: String,
    /// Valid analysis segments (veto-filtered livetime)
    pub segments: Vec<Segment>,
    /// Per-template trigger batches, indexed by template id
    pub templates: Vec<Vec<Trigger>>,
}

impl TriggerFile {
    /// Load a trigger container from a JSON file
    pub fn open(path: &Path) -> Result<Self, TriggerError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| TriggerError::Read {
            path: display.clone(),
            source,
        })?;
        let container: TriggerFile = serde_json::from_reader(BufReader::new(file)).map_err(
            |source| TriggerError::Parse {
                path: display.clone(),
                source,
            },
        )?;
        if container.detector.is_empty() {
            return Err(TriggerError::MissingDetector { path: display });
        }
        Ok(container)
    }
}

impl TriggerSource for TriggerFile {
    fn num_templates(&self) -> usize {
        self.templates.len()
    }

    fn detector(&self) -> &str {
        &self.detector
    }

    fn valid_segments(&self) -> &[Segment] {
        &self.segments
    }

    fn select_template(&mut self, template_id: usize) -> &[Trigger] {
        self.templates
            .get(template_id)
            .map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(time: f64, template_id: u64, trigger_id: u64, snr: f64) -> Trigger {
        Trigger {
            time,
            template_id,
            trigger_id,
            snr,
            chisq: 1.0,
            chisq_dof: 1,
            sg_chisq: 1.0,
        }
    }

    #[test]
    fn test_reduced_chisq() {
        let mut t = trigger(0.0, 0, 0, 8.0);
        t.chisq = 20.0;
        t.chisq_dof = 10;
        assert!((t.reduced_chisq() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_reduced_chisq_zero_dof() {
        let mut t = trigger(0.0, 0, 0, 8.0);
        t.chisq_dof = 0;
        assert_eq!(t.reduced_chisq(), 0.0);
    }

    #[test]
    fn test_segment_duration_and_livetime() {
        let segs = vec![
            Segment {
                start: 0.0,
                end: 100.0,
            },
            Segment {
                start: 200.0,
                end: 250.0,
            },
        ];
        assert!((total_livetime(&segs) - 150.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_segment_has_zero_duration() {
        let seg = Segment {
            start: 10.0,
            end: 5.0,
        };
        assert_eq!(seg.duration(), 0.0);
    }

    #[test]
    fn test_select_template_out_of_range_is_empty() {
        let mut file = TriggerFile {
            detector: "H1".to_string(),
            segments: Vec::new(),
            templates: vec![vec![trigger(1.0, 0, 0, 6.0)]],
        };
        assert_eq!(file.select_template(0).len(), 1);
        assert!(file.select_template(5).is_empty());
    }

    #[test]
    fn test_container_round_trips_through_json() {
        let file = TriggerFile {
            detector: "L1".to_string(),
            segments: vec![Segment {
                start: 0.0,
                end: 64.0,
            }],
            templates: vec![Vec::new(), vec![trigger(12.5, 1, 7, 9.5)]],
        };
        let json = serde_json::to_string(&file).unwrap();
        let back: TriggerFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.detector, "L1");
        assert_eq!(back.templates.len(), 2);
        assert_eq!(back.templates[1][0].trigger_id, 7);
    }
}
