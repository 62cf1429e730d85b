//! `fd-describe`: single-pass descriptive statistics over an untyped CSV file.
//!
//! Logs go to stderr; stdout carries one summary line per run.

use std::path::PathBuf;

use clap::Parser;
use fd_accum::DEFAULT_TOP_N;
use fd_detect::{DEFAULT_MULTI_VALUED_COLUMNS, DEFAULT_NUMERIC_THRESHOLD, DEFAULT_SAMPLE_ROWS};
use fd_runtime::{StatsConfig, parse_column_list};
use fd_stream::StatsReport;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "fd_describe=info,fd_stream=info,fd_io=info";

#[derive(Parser, Debug)]
#[command(
    name = "fd-describe",
    version,
    about = "Descriptive statistics for a CSV file in one streaming pass"
)]
struct Args {
    /// CSV file with a header row
    #[arg(env = "FD_DESCRIBE_SOURCE")]
    source: PathBuf,

    /// Where to write the JSON result
    #[arg(short, long, env = "FD_DESCRIBE_OUTPUT")]
    output: PathBuf,

    /// Grouping column; repeat or comma-separate for a composite key
    #[arg(short = 'g', long = "group-by", env = "FD_DESCRIBE_GROUP_BY")]
    group_by: Vec<String>,

    /// Rows sampled for column type detection
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS, env = "FD_DESCRIBE_SAMPLE_ROWS")]
    sample_rows: usize,

    /// Numeric share of non-missing samples a column must exceed
    #[arg(
        long,
        default_value_t = DEFAULT_NUMERIC_THRESHOLD,
        env = "FD_DESCRIBE_NUMERIC_THRESHOLD"
    )]
    numeric_threshold: f64,

    /// Column that always holds stringified lists (default: publisher_platforms)
    #[arg(long = "multi-valued", env = "FD_DESCRIBE_MULTI_VALUED")]
    multi_valued: Vec<String>,

    /// Column to leave out of the summaries (default: the ad_creative_* text columns)
    #[arg(long = "exclude", env = "FD_DESCRIBE_EXCLUDE")]
    exclude: Vec<String>,

    /// Summarize every column, including the default exclusions
    #[arg(long, conflicts_with = "exclude")]
    include_all_columns: bool,

    /// Most-common entries kept per frequency table
    #[arg(
        long,
        default_value_t = DEFAULT_TOP_N,
        conflicts_with = "all_frequencies",
        env = "FD_DESCRIBE_TOP"
    )]
    top: usize,

    /// Keep complete frequency tables
    #[arg(long)]
    all_frequencies: bool,

    /// Wrap the result in an analysis_metadata envelope
    #[arg(long, env = "FD_DESCRIBE_WITH_METADATA")]
    with_metadata: bool,
}

fn split_columns(values: &[String]) -> Vec<String> {
    values.iter().flat_map(|raw| parse_column_list(raw)).collect()
}

impl Args {
    fn into_config(self) -> StatsConfig {
        let multi_valued = match split_columns(&self.multi_valued) {
            columns if columns.is_empty() => DEFAULT_MULTI_VALUED_COLUMNS
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            columns => columns,
        };
        let mut config = StatsConfig::new(self.source, self.output)
            .with_group_by(split_columns(&self.group_by))
            .with_multi_valued_columns(multi_valued)
            .with_sample_rows(self.sample_rows)
            .with_numeric_threshold(self.numeric_threshold)
            .with_top_n((!self.all_frequencies).then_some(self.top))
            .with_metadata(self.with_metadata);
        let exclude = split_columns(&self.exclude);
        if self.include_all_columns || !exclude.is_empty() {
            config = config.with_exclude_columns(exclude);
        }
        config
    }
}

fn summary_line(report: &StatsReport, config: &StatsConfig) -> String {
    format!(
        "{} rows analyzed ({} skipped), {} {} group(s) -> {}",
        report.metadata.total_rows_processed,
        report.metadata.skipped_rows,
        report.result.group_count(),
        if config.is_grouped() { "grouped" } else { "overall" },
        config.output_path.display()
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().into_config();
    tracing::info!(
        source = %config.source_path.display(),
        grouped_by = ?config.group_by,
        sample_rows = config.detect.sample_rows,
        "starting analysis"
    );

    let report = fd_io::run(&config).inspect_err(|err| {
        tracing::error!(%err, "analysis failed");
    })?;
    println!("{}", summary_line(&report, &config));
    Ok(())
}
