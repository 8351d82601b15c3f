//! CLI argument parsing for snglrank

use clap::Parser;
use std::path::PathBuf;

use crate::ranking::StatFamily;

#[derive(Parser, Debug)]
#[command(name = "snglrank")]
#[command(version)]
#[command(about = "Rank, cluster, and assign significance to single-detector matched-filter triggers", long_about = None)]
pub struct Cli {
    /// Trigger container file (JSON), with detector vetoes already applied
    #[arg(long = "trigger-file", value_name = "PATH")]
    pub trigger_file: PathBuf,

    /// Destination path for the foreground output container
    #[arg(short = 'o', long = "output-file", value_name = "PATH")]
    pub output_file: PathBuf,

    /// Ranking statistic family
    #[arg(long = "ranking-statistic", value_enum, default_value = "newsnr")]
    pub ranking_statistic: StatFamily,

    /// Statistic calibration files (required by the expfit-count family)
    #[arg(long = "statistic-files", value_name = "PATH", num_args = 0..)]
    pub statistic_files: Vec<PathBuf>,

    /// Statistic keyword overrides as KEY:VALUE pairs (e.g. sg_threshold:6.0)
    #[arg(long = "statistic-keywords", value_name = "KEY:VALUE", num_args = 0..)]
    pub statistic_keywords: Vec<String>,

    /// Slice of the template bank to process, as PART/PIECES
    #[arg(
        long = "template-fraction-range",
        value_name = "PART/PIECES",
        default_value = "0/1"
    )]
    pub template_fraction_range: String,

    /// Shuffle template order with a fixed seed before partitioning, so each
    /// slice samples the bank pseudo-randomly instead of contiguously
    #[arg(long = "randomize-template-order")]
    pub randomize_template_order: bool,

    /// Clustering window in seconds (omit to disable temporal clustering)
    #[arg(long = "cluster-window", value_name = "SECONDS")]
    pub cluster_window: Option<f64>,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec![
            "snglrank",
            "--trigger-file",
            "triggers.json",
            "-o",
            "out.json",
        ];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn test_cli_requires_trigger_and_output() {
        let result = Cli::try_parse_from(["snglrank"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.ranking_statistic, StatFamily::Newsnr);
        assert_eq!(cli.template_fraction_range, "0/1");
        assert!(cli.cluster_window.is_none());
        assert!(!cli.randomize_template_order);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_ranking_statistic_values() {
        let cli = parse(&["--ranking-statistic", "expfit-count"]);
        assert_eq!(cli.ranking_statistic, StatFamily::ExpfitCount);
        let bad = Cli::try_parse_from([
            "snglrank",
            "--trigger-file",
            "t.json",
            "-o",
            "o.json",
            "--ranking-statistic",
            "no-such-family",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_cli_cluster_window() {
        let cli = parse(&["--cluster-window", "4.0"]);
        assert_eq!(cli.cluster_window, Some(4.0));
    }

    #[test]
    fn test_cli_statistic_keywords_collects_pairs() {
        let cli = parse(&["--statistic-keywords", "sg_threshold:6.0", "other:1"]);
        assert_eq!(
            cli.statistic_keywords,
            vec!["sg_threshold:6.0".to_string(), "other:1".to_string()]
        );
    }

    #[test]
    fn test_cli_template_fraction_range() {
        let cli = parse(&["--template-fraction-range", "3/16"]);
        assert_eq!(cli.template_fraction_range, "3/16");
    }

    #[test]
    fn test_cli_randomize_flag() {
        let cli = parse(&["--randomize-template-order"]);
        assert!(cli.randomize_template_order);
    }
}
