//! Command-line interface for the marketpulse macro pipeline

mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Datelike;
use clap::Parser;
use pulse_data::catalog::{self, DEFAULT_YEAR_RANGE, YEAR_BOUNDS};
use pulse_data::{Pipeline, PipelineOutcome, PipelineParams, PulseConfig};
use pulse_utils::LogConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "marketpulse")]
#[command(about = "Compare annual macro indicators from World Bank open data", long_about = None)]
struct Args {
    /// Country ISO3 code or catalog name (repeatable)
    #[arg(short, long = "country", value_name = "COUNTRY")]
    countries: Vec<String>,

    /// World Bank indicator code (repeatable)
    #[arg(short, long = "indicator", value_name = "CODE")]
    indicators: Vec<String>,

    /// First year to keep
    #[arg(long, default_value_t = DEFAULT_YEAR_RANGE.0)]
    min_year: i32,

    /// Last year to keep [default: 2024, capped at the current year]
    #[arg(long)]
    max_year: Option<i32>,

    /// Z-score each series before pivoting and correlating
    #[arg(long)]
    normalize: bool,

    /// Print the raw rows
    #[arg(long)]
    raw: bool,

    /// Write the filtered rows to a CSV file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// List the built-in countries and indicators and exit
    #[arg(long)]
    list: bool,
}

impl Args {
    fn params(&self) -> PipelineParams {
        let countries: Vec<String> = if self.countries.is_empty() {
            catalog::DEFAULT_COUNTRIES.iter().map(ToString::to_string).collect()
        } else {
            self.countries.iter().map(|c| catalog::resolve_country(c)).collect()
        };

        let indicators: Vec<String> = if self.indicators.is_empty() {
            catalog::DEFAULT_INDICATORS.iter().map(ToString::to_string).collect()
        } else {
            self.indicators.iter().map(|i| i.trim().to_string()).collect()
        };

        let current_year = chrono::Utc::now().year();
        let max_year = self
            .max_year
            .unwrap_or_else(|| DEFAULT_YEAR_RANGE.1.min(current_year));

        PipelineParams::new(
            countries,
            indicators,
            self.min_year.max(YEAR_BOUNDS.0),
            max_year,
        )
        .normalize(self.normalize)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let log_config = if args.json_logs {
        LogConfig::default().json()
    } else {
        LogConfig::default()
    };
    pulse_utils::init_tracing(&log_config);

    if args.list {
        println!("{}", output::catalog_table());
        return Ok(ExitCode::SUCCESS);
    }

    let params = args.params();
    params.validate()?;

    let config = PulseConfig::default().with_env()?;
    let pipeline = Pipeline::new(&config)?;

    info!(
        "Loading {} countries x {} indicators from World Bank",
        params.countries.len(),
        params.indicators.len()
    );
    let outcome = pipeline.run(&params).await?;

    for line in output::failure_lines(outcome.failures()) {
        eprintln!("{line}");
    }

    let PipelineOutcome::Ready(report) = outcome else {
        eprintln!("error: No data loaded. Try different countries/indicators or years.");
        return Ok(ExitCode::FAILURE);
    };

    let primary = &params.countries[0];
    println!("# MarketPulse: {}-{}", params.min_year, params.max_year);
    println!(
        "{}",
        output::kpi_table(&report.dataset, primary, &params.indicators, pipeline.labels())
    );

    for (code, view) in &report.indicator_views {
        let label = pipeline.labels().label(code);
        let suffix = if params.normalize { " (normalized)" } else { "" };
        println!("\n## {label}{suffix}");
        println!("{}", output::wide_table(view));
    }

    println!("\n## Cross-series correlation");
    println!("{}", output::correlation_table(&report.correlation));

    if args.raw {
        println!("\n## Raw data");
        println!("{}", output::raw_table(&report.dataset, pipeline.labels()));
    }

    if let Some(path) = &args.csv {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        pulse_data::export::write_csv(&report.dataset, pipeline.labels(), std::io::BufWriter::new(file))?;
        println!("\nWrote {} rows to {}", report.dataset.len(), path.display());
    }

    Ok(ExitCode::SUCCESS)
}
