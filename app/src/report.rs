use common::{
    config::Config,
    dataset::build_dataset,
    plot::{ensure_plot_dirs, plot},
};
use eyre::{Context, Result};
use tracing::{info, warn};

/// Builds the dataset from `data_dir`, then writes the summary table and every
/// configured plot into `plot_dir`.
pub fn run(config: &Config) -> Result<()> {
    let settings = &config.settings;
    let dataset = build_dataset(&settings.data_dir)
        .context(format!("Read results from {}", settings.data_dir.display()))?;
    if dataset.is_empty() {
        warn!(
            "No results found in {}, plots will be empty",
            settings.data_dir.display()
        );
    }

    ensure_plot_dirs(std::slice::from_ref(&settings.plot_dir))?;
    if settings.summary {
        let summary_path = settings.plot_dir.join("summary.csv");
        dataset
            .write_csv(&summary_path)
            .context(format!("Write summary {}", summary_path.display()))?;
        info!("Wrote {}", summary_path.display());
    }

    let written = plot(&config.plots, &dataset, &settings.plot_dir)?;
    info!(
        "{}: wrote {} figures to {}",
        config.name,
        written.len(),
        settings.plot_dir.display()
    );
    Ok(())
}
