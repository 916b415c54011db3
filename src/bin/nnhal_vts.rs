use clap::{Parser, Subcommand};
use nnhal_vts::config::{HarnessConfig, DEFAULT_CLI_WAIT_TIMEOUT};
use nnhal_vts::device::{DeviceConfig, ReferenceDevice};
use nnhal_vts::environment::VtsEnvironment;
use nnhal_vts::hal::OperationType;
use nnhal_vts::logging::{self, LogFormat, LogLevel, LoggingConfig};
use nnhal_vts::suite::ConformanceSuite;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "nnhal-vts", version)]
#[command(about = "Run the device conformance suite against the reference CPU device", long_about = None)]
struct Cli {
    /// Log level (overrides NNHAL_VTS_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the conformance cases and print a report
    Run {
        /// Only run cases whose name contains this substring
        #[arg(short, long)]
        filter: Option<String>,
        /// Bound every completion wait (milliseconds, default 10000)
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Absolute tolerance for float output comparison
        #[arg(long)]
        tolerance: Option<f32>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Restrict the reference device to these operations (e.g. ADD,MUL)
        #[arg(long, value_delimiter = ',')]
        operations: Vec<String>,
        /// Simulated per-execution latency (milliseconds)
        #[arg(long)]
        latency_ms: Option<u64>,
    },
    /// List the case names in run order
    List {
        /// Only list cases whose name contains this substring
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Run {
            filter,
            timeout_ms,
            tolerance,
            json,
            operations,
            latency_ms,
        } => {
            let mut config = HarnessConfig::from_env()?;
            if let Some(filter) = filter {
                config = config.with_case_filter(filter);
            }
            if let Some(ms) = timeout_ms {
                config = config.with_wait_timeout(Duration::from_millis(ms));
            }
            if let Some(tolerance) = tolerance {
                config = config.with_tolerance(tolerance);
            }
            config = config.or_wait_timeout(DEFAULT_CLI_WAIT_TIMEOUT);
            config.validate()?;

            let mut device_config = DeviceConfig::default();
            if !operations.is_empty() {
                let ops = parse_operations(&operations)?;
                device_config = device_config.with_supported_operations(&ops);
            }
            if let Some(ms) = latency_ms {
                device_config = device_config.with_execution_latency(Duration::from_millis(ms));
            }

            let device = Arc::new(ReferenceDevice::new(device_config));
            let env = VtsEnvironment::new(device.clone(), config);
            let report = ConformanceSuite::standard().run(&env);
            tracing::info!(stats = ?device.stats(), "reference device totals");

            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report);
            }
            let code = report.exit_code();
            drop(env);
            drop(device);
            std::process::exit(code);
        }
        Commands::List { filter } => {
            let suite = ConformanceSuite::standard();
            for name in suite.names() {
                if filter.as_deref().map_or(true, |f| name.contains(f)) {
                    println!("{}", name);
                }
            }
        }
    }
    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut config = LoggingConfig::from_env()?;
    if let Some(level) = cli.log_level {
        config = config.with_level(level);
    }
    if cli.log_json {
        config = config.with_format(LogFormat::Json);
    }
    if let Some(path) = &cli.log_file {
        config = config.with_log_file(path.clone());
    }
    logging::init_with_config(&config)?;
    Ok(())
}

fn parse_operations(names: &[String]) -> anyhow::Result<Vec<OperationType>> {
    names
        .iter()
        .map(|name| match name.trim().to_ascii_uppercase().as_str() {
            "ADD" => Ok(OperationType::Add),
            "MUL" => Ok(OperationType::Mul),
            "RELU" => Ok(OperationType::Relu),
            "RELU1" => Ok(OperationType::Relu1),
            "RELU6" => Ok(OperationType::Relu6),
            other => anyhow::bail!("unknown operation '{}'", other),
        })
        .collect()
}
