use crate::cli::args::{Cli, Commands, ConfigArgs};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::processors::Pipeline;
use crate::readers::ParsePolicy;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            validate_only,
        } => {
            let pipeline = Pipeline::new(load_config(&config, true)?)?.with_quiet(cli.quiet);

            let report = if validate_only {
                pipeline.execute().await?
            } else {
                pipeline.run().await?
            };

            if let Some(fact) = report.fact_report() {
                println!(
                    "Fact table: {} rows ({} without departure, {} unknown ports, {} with temperature)",
                    fact.output_rows,
                    fact.missing_departure,
                    fact.unknown_port,
                    fact.temperature_matches
                );
            }
            println!(
                "Built {} stages in {:.1}s",
                report.stages.len(),
                report.elapsed_ms as f64 / 1000.0
            );
            if validate_only {
                println!("Validation complete - no run report written");
            }
        }

        Commands::Check { config } => {
            let pipeline = Pipeline::new(load_config(&config, false)?)?;
            let checks = pipeline.check().await?;

            for check in &checks {
                println!("✅ {} ({}): {} rows", check.description, check.table, check.rows);
            }
        }

        Commands::Info { config } => {
            let pipeline = Pipeline::new(load_config(&config, false)?)?;
            let infos = pipeline.table_infos()?;

            if infos.is_empty() {
                println!(
                    "No tables found under {}",
                    pipeline.config().output_base().display()
                );
            }
            for table in infos {
                println!("{}\n", table.summary());
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// File and environment first, then command-line overrides; commands that only
/// read the output do not need an input base
fn load_config(args: &ConfigArgs, needs_input: bool) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::load(args.config.as_deref())?;

    if let Some(input) = &args.input {
        builder = builder.input_base(input);
    }
    if let Some(output) = &args.output {
        builder = builder.output_base(output);
    }
    if let Some(compression) = &args.compression {
        builder = builder.compression(compression);
    }
    if let Some(workers) = args.max_workers {
        builder = builder.max_workers(workers);
    }
    if !needs_input {
        builder = builder.default_input_base(".");
    }
    if args.strict_mappings {
        builder = builder.parse_policy(ParsePolicy::Strict);
    }

    let config = builder.build()?;
    info!(config = ?config, "configuration loaded");
    Ok(config)
}
