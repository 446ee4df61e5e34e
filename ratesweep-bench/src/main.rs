use clap::{Parser, ValueEnum};
use ratesweep_bench::config::load_endpoints;
use ratesweep_bench::report::{JsonLinesSink, SummarySink, TableSink};
use ratesweep_bench::workload::{self, SyntheticProfile, WorkloadArgs};
use ratesweep_bench::{EmptyPassPolicy, RateRange, Sweep, SweepConfig, WorkloadKind};
use ratesweep_client::{Client, ClientConfig, IdentityPaths};
use ratesweep_common::{ConfigError, ServiceEndpoints, DEFAULT_BASE_HOST};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnEmpty {
    Abort,
    Continue,
}

#[derive(Parser)]
#[command(name = "ratesweep", about = "Open-loop request rate sweep")]
struct Args {
    /// First target rate (ops/s)
    rate_start: f64,

    /// Sweep stops before reaching this rate
    rate_end: f64,

    /// Rate increment between passes
    rate_step: f64,

    /// Seconds each pass paces calls for
    duration: f64,

    /// Workload name, e.g. get_ss_null, get_ac_auth, get_ss_secret, synthetic
    workload: String,

    /// Collection uid (get_ss_secret)
    col_uid: Option<Uuid>,

    /// Secret uid (get_ss_secret)
    sec_uid: Option<Uuid>,

    /// Client certificate (PEM) for authenticated workloads
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Client private key (PEM, PKCS#8) for authenticated workloads
    #[arg(long)]
    key: Option<PathBuf>,

    /// Services live at acs.<base> and ss.<base>
    #[arg(long, default_value = DEFAULT_BASE_HOST)]
    base_host: String,

    /// JSON file with explicit acs_addr/ss_addr; overrides --base-host
    #[arg(long)]
    services: Option<PathBuf>,

    /// Use http instead of https for API calls
    #[arg(long)]
    plain_http: bool,

    /// Seconds of headroom used to size the worker pool (rate * window)
    #[arg(long, default_value_t = 1.0)]
    min_window: f64,

    /// Skip the discarded warm-up pass
    #[arg(long)]
    no_warmup: bool,

    /// Fail calls that take longer than this many milliseconds
    #[arg(long)]
    call_timeout_ms: Option<u64>,

    /// What to do when a level schedules no calls
    #[arg(long, value_enum, default_value = "abort")]
    on_empty: OnEmpty,

    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    /// Synthetic workload: minimum latency (ms)
    #[arg(long, default_value_t = 5)]
    synthetic_min_ms: u64,

    /// Synthetic workload: maximum latency (ms)
    #[arg(long, default_value_t = 20)]
    synthetic_max_ms: u64,

    /// Synthetic workload: probability that a call fails
    #[arg(long, default_value_t = 0.0)]
    synthetic_failure_rate: f64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (config, workload) = match setup(&args).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            process::exit(3);
        }
    };

    let mut sink: Box<dyn SummarySink> = match args.format {
        Format::Table => Box::new(TableSink::new(std::io::stdout())),
        Format::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    let mut sweep = Sweep::new(config, workload);
    match sweep.run(sink.as_mut()).await {
        Ok(report) => {
            if !report.failed_levels.is_empty() {
                tracing::warn!(skipped = report.failed_levels.len(), "some rate levels produced no calls");
            }
        }
        Err(e) => {
            eprintln!("Sweep aborted: {e}");
            process::exit(1);
        }
    }
}

async fn setup(args: &Args) -> Result<(SweepConfig, Arc<dyn workload::Workload>), ConfigError> {
    let kind = WorkloadKind::from_name(&args.workload)
        .ok_or_else(|| ConfigError::UnknownWorkload(args.workload.clone()))?;

    let endpoints = match &args.services {
        Some(path) => load_endpoints(path)?,
        None => ServiceEndpoints::from_base(&args.base_host),
    };

    let identity = match (&args.cert, &args.key) {
        (Some(cert), Some(key)) => Some(IdentityPaths { cert: cert.clone(), key: key.clone() }),
        (None, None) => None,
        _ => return Err(ConfigError::InvalidIdentity("--cert and --key must be given together".to_string())),
    };
    if kind.requires_identity() && identity.is_none() {
        return Err(ConfigError::MissingArgument {
            workload: kind.as_name().to_string(),
            argument: "--cert/--key".to_string(),
        });
    }

    let client = Client::new(ClientConfig { endpoints, tls: !args.plain_http, identity })?;

    let workload_args = WorkloadArgs {
        col_uid: args.col_uid,
        sec_uid: args.sec_uid,
        synthetic: SyntheticProfile {
            min_latency: Duration::from_millis(args.synthetic_min_ms),
            max_latency: Duration::from_millis(args.synthetic_max_ms),
            failure_rate: args.synthetic_failure_rate,
        },
    };
    let workload = workload::build(kind, Arc::new(client), &workload_args).await?;

    let duration = secs(args.duration, "duration")?;
    let mut config = SweepConfig::new(RateRange::new(args.rate_start, args.rate_end, args.rate_step), duration);
    config.min_window = secs(args.min_window, "min-window")?;
    config.warmup = !args.no_warmup;
    config.call_timeout = args.call_timeout_ms.map(Duration::from_millis);
    config.on_empty_pass = match args.on_empty {
        OnEmpty::Abort => EmptyPassPolicy::Abort,
        OnEmpty::Continue => EmptyPassPolicy::Continue,
    };

    Ok((config, workload))
}

fn secs(value: f64, name: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::Setup(format!("invalid {name} {value}: {e}")))
}
