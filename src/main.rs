use anyhow::{Context, Result};
use clap::Parser;
use revscan::cli::{Cli, OutputFormat};
use revscan::config::AnalysisConfig;
use revscan::csv_output;
use revscan::json_output::JsonOutput;
use revscan::pipeline::ReviewAnalyzer;
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

fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_toml_file(path)?,
        None => AnalysisConfig::default(),
    };
    args.apply_overrides(&mut config);
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid analysis settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let shape = config.product_name_shape;
    let alpha = config.significance_level;
    let analyzer = ReviewAnalyzer::new(config).context("Failed to initialize text normalizer")?;

    let outcomes = analyzer.analyze_batch(&args.files);
    let mut failed = 0;

    for outcome in &outcomes {
        let report = match &outcome.result {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{}: {}: {}", outcome.path.display(), e.component(), e);
                failed += 1;
                continue;
            }
        };

        if !args.no_write {
            if let Err(e) = csv_output::write_tables(report, &args.output_dir, shape) {
                eprintln!(
                    "{}: writing results to {}: {}",
                    outcome.path.display(),
                    args.output_dir.display(),
                    e
                );
                failed += 1;
            }
        }

        match args.format {
            OutputFormat::Text => print!("{}", report.display(alpha)),
            OutputFormat::Csv => {
                for (file_name, table) in csv_output::result_tables(report, shape) {
                    println!("# {}", file_name);
                    print!("{}", table.to_csv());
                }
            }
            OutputFormat::Json => {}
        }
    }

    if args.format == OutputFormat::Json {
        let json = JsonOutput::new(&outcomes)
            .to_json()
            .context("Failed to serialize JSON output")?;
        println!("{}", json);
    }

    if failed > 0 {
        eprintln!("{} of {} files failed", failed, outcomes.len());
        std::process::exit(1);
    }

    Ok(())
}
