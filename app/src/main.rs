use std::path::PathBuf;

use clap::Parser;
use common::config::Config;
use eyre::{Context, Result};
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod report;

const MODULES: &[&str] = &["io_latency_report", "common", "phase_compare"];

/// Summarizes per-message-size latency results and renders comparison plots
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Directory holding the `<label>_<size>.txt` results
    #[arg(short, long)]
    data: Option<PathBuf>,
    /// Directory the plots are written to
    #[arg(short, long)]
    plots: Option<PathBuf>,
    /// YAML config, the built-in plot sets are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
    /// Print the effective config and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new("off");
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    let config = load_config(&args)?;
    if args.print_config {
        print!("{}", serde_yml::to_string(&config)?);
        return Ok(());
    }

    if let Err(err) = report::run(&config) {
        error!("{err:#?}");
        return Err(err);
    }
    Ok(())
}

/// Config file or the built-in plot sets, with the path flags applied on top
fn load_config(args: &Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .context(format!("Read config {}", path.display()))?;
            serde_yml::from_str(&data).context(format!("Parse config {}", path.display()))?
        }
        None => phase_compare::default_config(),
    };

    if let Some(data) = &args.data {
        config.settings.data_dir = data.clone();
    }
    if let Some(plots) = &args.plots {
        config.settings.plot_dir = plots.clone();
    }
    Ok(config)
}
