use anyhow::Result;
use clap::Parser;
use snglrank::{bank, cli::Cli, pipeline, ranking::RankingStatistic, trigger::TriggerFile};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    // All configuration problems surface here, before any trigger is read.
    let (part, pieces) = bank::parse_partition(&args.template_fraction_range)?;
    if let Some(window) = args.cluster_window {
        if !window.is_finite() || window < 0.0 {
            anyhow::bail!("Invalid value for --cluster-window: {}", window);
        }
    }

    let mut source = TriggerFile::open(&args.trigger_file)?;
    let detectors = vec![source.detector.clone()];
    let statistic = RankingStatistic::new(
        args.ranking_statistic,
        &args.statistic_files,
        &detectors,
        &args.statistic_keywords,
    )?;

    let config = pipeline::PipelineConfig {
        part,
        pieces,
        randomize_templates: args.randomize_template_order,
        cluster_window: args.cluster_window,
        output: args.output_file,
    };
    let summary = pipeline::run(&mut source, &statistic, &config)?;

    println!(
        "Processed {} templates ({} with triggers): {} candidates ranked, {} surviving, {:.1} s foreground time",
        summary.templates_processed,
        summary.templates_with_triggers,
        summary.candidates_ranked,
        summary.candidates_surviving,
        summary.foreground_time_seconds
    );
    Ok(())
}
