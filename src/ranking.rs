//! Ranking statistic engine
//!
//! Maps raw per-trigger detector measurements to a single scalar detection
//! statistic, consistently across detectors and templates, so candidates from
//! different templates can be ranked against each other. The set of supported
//! statistic families is closed; each family implements the same two-step
//! contract: `single` produces per-detector intermediates, `combine` reduces
//! them to the final scalar.

use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::trigger::Trigger;

/// Default sine-Gaussian veto threshold (reduced chi-square units)
const DEFAULT_SG_THRESHOLD: f64 = 4.0;

/// Errors for statistic configuration and evaluation
#[derive(Error, Debug)]
pub enum StatError {
    #[error("Malformed statistic keyword {0:?}: expected KEY:VALUE")]
    MalformedKeyword(String),

    #[error("Unknown statistic keyword {0:?}")]
    UnknownKeyword(String),

    #[error("Invalid value {value:?} for statistic keyword {key}")]
    InvalidKeywordValue { key: String, value: String },

    #[error("Statistic family {0:?} requires at least one statistic file")]
    MissingStatFiles(StatFamily),

    #[error("Failed to read statistic file {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse statistic file {path}: {source}")]
    FileParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Statistic file {path} is for detector {detector}, not in the active set")]
    DetectorMismatch { path: String, detector: String },

    #[error("No fit coefficients for template {0}")]
    MissingTemplateFit(u64),

    #[error("No active detectors configured")]
    NoDetectors,

    #[error("No intermediate statistics for detector {0}")]
    MissingIntermediate(String),

    #[error("Multi-detector combination is not supported by this statistic")]
    MultiDetectorUnsupported,
}

pub type Result<T> = std::result::Result<T, StatError>;

/// Supported ranking statistic families
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatFamily {
    /// Raw matched-filter SNR
    Snr,
    /// Chi-square-reweighted SNR
    Newsnr,
    /// Reweighted SNR with sine-Gaussian veto penalty
    NewsnrSgveto,
    /// Reweighted SNR ranked against a per-template exponential noise fit
    ExpfitCount,
}

/// Per-template exponential noise fit coefficients
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TemplateFit {
    pub template_id: u64,
    /// Fit slope of the trigger-rate tail above `threshold`
    pub alpha: f64,
    /// Trigger rate at the fit threshold
    pub rate: f64,
    /// Reweighted-SNR value the fit was anchored at
    pub threshold: f64,
}

/// On-disk statistic calibration file
#[derive(Debug, Deserialize)]
struct StatFile {
    detector: String,
    fits: Vec<TemplateFit>,
}

/// Chi-square reweighted SNR
///
/// Leaves SNR untouched while the reduced chi-square is consistent with
/// noise (<= 1), and suppresses it with the standard sixth-root weighting
/// above that.
pub fn newsnr(snr: f64, reduced_chisq: f64) -> f64 {
    if reduced_chisq > 1.0 {
        snr / (((1.0 + reduced_chisq.powi(3)) / 2.0).powf(1.0 / 6.0))
    } else {
        snr
    }
}

/// Ranking statistic engine, constructed once per run
///
/// Calibration data is loaded at construction; afterwards `single` and
/// `combine` are pure and safe to call repeatedly from any thread.
#[derive(Debug)]
pub struct RankingStatistic {
    family: StatFamily,
    detectors: Vec<String>,
    sg_threshold: f64,
    fits: HashMap<u64, TemplateFit>,
}

impl RankingStatistic {
    /// Build the engine from a family, calibration files, the active
    /// detector set, and free-form keyword overrides
    ///
    /// All configuration problems surface here, before any trigger is
    /// processed.
    pub fn new(
        family: StatFamily,
        stat_files: &[PathBuf],
        detectors: &[String],
        keywords: &[String],
    ) -> Result<Self> {
        if detectors.is_empty() {
            return Err(StatError::NoDetectors);
        }
        let overrides = parse_keywords(keywords)?;
        let sg_threshold = overrides
            .sg_threshold
            .unwrap_or(DEFAULT_SG_THRESHOLD);

        let mut fits = HashMap::new();
        if family == StatFamily::ExpfitCount {
            if stat_files.is_empty() {
                return Err(StatError::MissingStatFiles(family));
            }
            for path in stat_files {
                load_stat_file(path, detectors, &mut fits)?;
            }
        }

        Ok(Self {
            family,
            detectors: detectors.to_vec(),
            sg_threshold,
            fits,
        })
    }

    /// Statistic family this engine was built for
    pub fn family(&self) -> StatFamily {
        self.family
    }

    /// Per-detector intermediate statistics for one template's batch
    ///
    /// Pure function of the batch; each trigger's value is independent of
    /// processing order.
    pub fn single(&self, _detector: &str, batch: &[Trigger]) -> Result<Vec<f64>> {
        batch.iter().map(|t| self.rank_trigger(t)).collect()
    }

    /// Combine per-detector intermediates into the final scalar statistic
    ///
    /// The signature admits multiple detectors, but this engine ranks a
    /// single instrument: the sole detector's intermediates pass through
    /// unchanged, and supplying more than one is rejected.
    pub fn combine(&self, singles: &HashMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        if singles.len() > 1 {
            return Err(StatError::MultiDetectorUnsupported);
        }
        let detector = self.detectors.first().ok_or(StatError::NoDetectors)?;
        let values = singles
            .get(detector)
            .ok_or_else(|| StatError::MissingIntermediate(detector.clone()))?;
        Ok(values.clone())
    }

    fn rank_trigger(&self, trigger: &Trigger) -> Result<f64> {
        let nsnr = newsnr(trigger.snr, trigger.reduced_chisq());
        match self.family {
            StatFamily::Snr => Ok(trigger.snr),
            StatFamily::Newsnr => Ok(nsnr),
            StatFamily::NewsnrSgveto => Ok(self.apply_sg_veto(nsnr, trigger.sg_chisq)),
            StatFamily::ExpfitCount => {
                let fit = self
                    .fits
                    .get(&trigger.template_id)
                    .ok_or(StatError::MissingTemplateFit(trigger.template_id))?;
                // Negative log of the fitted noise trigger rate at this
                // reweighted SNR; larger means less noise-like.
                Ok(fit.alpha * (nsnr - fit.threshold) - fit.rate.ln())
            }
        }
    }

    fn apply_sg_veto(&self, nsnr: f64, sg_chisq: f64) -> f64 {
        if sg_chisq > self.sg_threshold {
            nsnr * (self.sg_threshold / sg_chisq).sqrt()
        } else {
            nsnr
        }
    }
}

/// Recognized keyword overrides
#[derive(Debug, Default)]
struct KeywordOverrides {
    sg_threshold: Option<f64>,
}

/// Parse `KEY:VALUE` keyword override strings
///
/// Malformed or unrecognized keywords are configuration errors and fail the
/// whole run before processing starts.
fn parse_keywords(keywords: &[String]) -> Result<KeywordOverrides> {
    let mut overrides = KeywordOverrides::default();
    for raw in keywords {
        let Some((key, value)) = raw.split_once(':') else {
            return Err(StatError::MalformedKeyword(raw.clone()));
        };
        match key.trim() {
            "sg_threshold" => {
                let parsed: f64 =
                    value
                        .trim()
                        .parse()
                        .map_err(|_| StatError::InvalidKeywordValue {
                            key: key.trim().to_string(),
                            value: value.trim().to_string(),
                        })?;
                overrides.sg_threshold = Some(parsed);
            }
            other => return Err(StatError::UnknownKeyword(other.to_string())),
        }
    }
    Ok(overrides)
}

fn load_stat_file(
    path: &Path,
    detectors: &[String],
    fits: &mut HashMap<u64, TemplateFit>,
) -> Result<()> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| StatError::FileRead {
        path: display.clone(),
        source,
    })?;
    let parsed: StatFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StatError::FileParse {
            path: display.clone(),
            source,
        })?;
    if !detectors.contains(&parsed.detector) {
        return Err(StatError::DetectorMismatch {
            path: display,
            detector: parsed.detector,
        });
    }
    for fit in parsed.fits {
        fits.insert(fit.template_id, fit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(snr: f64, chisq: f64, chisq_dof: u32, sg_chisq: f64) -> Trigger {
        Trigger {
            time: 100.0,
            template_id: 0,
            trigger_id: 0,
            snr,
            chisq,
            chisq_dof,
            sg_chisq,
        }
    }

    fn engine(family: StatFamily) -> RankingStatistic {
        RankingStatistic::new(family, &[], &["H1".to_string()], &[]).unwrap()
    }

    #[test]
    fn test_newsnr_passes_through_clean_triggers() {
        assert_eq!(newsnr(8.0, 0.5), 8.0);
        assert_eq!(newsnr(8.0, 1.0), 8.0);
    }

    #[test]
    fn test_newsnr_suppresses_high_chisq() {
        let reweighted = newsnr(8.0, 4.0);
        assert!(reweighted < 8.0);
        // ((1 + 64) / 2)^(1/6) = 32.5^(1/6)
        let expected = 8.0 / 32.5f64.powf(1.0 / 6.0);
        assert!((reweighted - expected).abs() < 1e-12);
    }

    #[test]
    fn test_snr_family_is_identity_on_snr() {
        let stat = engine(StatFamily::Snr);
        let batch = vec![trigger(9.0, 50.0, 10, 1.0)];
        let vals = stat.single("H1", &batch).unwrap();
        assert_eq!(vals, vec![9.0]);
    }

    #[test]
    fn test_sg_veto_only_penalizes_above_threshold() {
        let stat = engine(StatFamily::NewsnrSgveto);
        let clean = vec![trigger(8.0, 1.0, 1, 2.0)];
        let loud_sg = vec![trigger(8.0, 1.0, 1, 16.0)];
        assert_eq!(stat.single("H1", &clean).unwrap(), vec![8.0]);
        let penalized = stat.single("H1", &loud_sg).unwrap()[0];
        assert!((penalized - 8.0 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sg_threshold_keyword_override() {
        let stat = RankingStatistic::new(
            StatFamily::NewsnrSgveto,
            &[],
            &["H1".to_string()],
            &["sg_threshold:16.0".to_string()],
        )
        .unwrap();
        // sg_chisq of 16 is now exactly at threshold, so no penalty.
        let batch = vec![trigger(8.0, 1.0, 1, 16.0)];
        assert_eq!(stat.single("H1", &batch).unwrap(), vec![8.0]);
    }

    #[test]
    fn test_malformed_keyword_is_config_error() {
        let err = RankingStatistic::new(
            StatFamily::Newsnr,
            &[],
            &["H1".to_string()],
            &["sg_threshold=4".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, StatError::MalformedKeyword(_)));
    }

    #[test]
    fn test_unknown_keyword_is_config_error() {
        let err = RankingStatistic::new(
            StatFamily::Newsnr,
            &[],
            &["H1".to_string()],
            &["no_such_key:1".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, StatError::UnknownKeyword(_)));
    }

    #[test]
    fn test_expfit_requires_stat_files() {
        let err = RankingStatistic::new(
            StatFamily::ExpfitCount,
            &[],
            &["H1".to_string()],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, StatError::MissingStatFiles(_)));
    }

    #[test]
    fn test_combine_passes_single_detector_through() {
        let stat = engine(StatFamily::Newsnr);
        let mut singles = HashMap::new();
        singles.insert("H1".to_string(), vec![5.0, 6.5]);
        assert_eq!(stat.combine(&singles).unwrap(), vec![5.0, 6.5]);
    }

    #[test]
    fn test_combine_rejects_multiple_detectors() {
        let stat = engine(StatFamily::Newsnr);
        let mut singles = HashMap::new();
        singles.insert("H1".to_string(), vec![5.0]);
        singles.insert("L1".to_string(), vec![5.0]);
        assert!(matches!(
            stat.combine(&singles).unwrap_err(),
            StatError::MultiDetectorUnsupported
        ));
    }

    #[test]
    fn test_combine_missing_detector_errors() {
        let stat = engine(StatFamily::Newsnr);
        let singles = HashMap::new();
        assert!(matches!(
            stat.combine(&singles).unwrap_err(),
            StatError::MissingIntermediate(_)
        ));
    }
}
