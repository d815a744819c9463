use core::fmt::Debug;
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use downcast_rs::{Downcast, impl_downcast};
use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    classify::{Label, Phase},
    dataset::Dataset,
    partition::Partition,
    stats::StatisticKind,
};

/// Qualitative palette used for every figure (ColorBrewer Set2)
pub const PALETTE: [(u8, u8, u8); 8] = [
    (102, 194, 165),
    (252, 141, 98),
    (141, 160, 203),
    (231, 138, 195),
    (166, 216, 84),
    (255, 217, 47),
    (229, 196, 148),
    (179, 179, 179),
];

#[typetag::serde(tag = "type")]
pub trait Plot: Debug + DynClone + Downcast + Send + Sync {
    /// Prefix of every file this plot writes
    fn name(&self) -> &str;
    /// Renders the dataset
    ///
    /// Arguments:
    /// * `dataset` - Aggregated statistics of the whole results directory
    /// * `plot_path` - The directory images are written to, ie. /plots
    ///
    /// Returns the paths of the written images
    fn plot(&self, dataset: &Dataset, plot_path: &Path) -> Result<Vec<PathBuf>>;
}
clone_trait_object!(Plot);
impl_downcast!(Plot);

/// One line in a figure: a phase of one experiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Series {
    pub label: Label,
    pub phase: Phase,
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label, self.phase)
    }
}

/// Series picked for a plot, every phase of `label` unless `phases` is given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSelection {
    pub label: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<Phase>>,
}

impl SeriesSelection {
    pub fn all_phases(label: Label) -> Self {
        Self {
            label,
            phases: None,
        }
    }

    pub fn phases(label: Label, phases: &[Phase]) -> Self {
        Self {
            label,
            phases: Some(phases.to_vec()),
        }
    }

    pub fn series(&self) -> Vec<Series> {
        let phases = match &self.phases {
            Some(phases) => {
                for phase in phases {
                    if !self.label.phases().contains(phase) {
                        warn!("{} never measures {phase}", self.label);
                    }
                }
                phases.as_slice()
            }
            None => self.label.phases(),
        };
        phases
            .iter()
            .map(|phase| Series {
                label: self.label,
                phase: *phase,
            })
            .collect()
    }
}

pub fn expand_selections(selections: &[SeriesSelection]) -> Vec<Series> {
    let mut series = Vec::new();
    for item in selections.iter().flat_map(SeriesSelection::series) {
        if !series.contains(&item) {
            series.push(item);
        }
    }
    series
}

/// `(message size, value)` points of one series, in partition order
pub fn series_points(
    partition: &Partition,
    series: Series,
    kind: StatisticKind,
) -> Vec<(u64, f64)> {
    partition
        .rows
        .iter()
        .filter(|x| x.experiment.label == series.label)
        .filter_map(|x| {
            x.phases
                .get(&series.phase)
                .map(|summary| (x.experiment.message_size, summary.get(kind)))
        })
        .collect()
}

/// Hands out palette colors in first-seen order, one instance per figure so
/// a series keeps its color across the figure's subplots
#[derive(Debug, Default)]
pub struct SeriesColors {
    assigned: HashMap<Series, usize>,
}

impl SeriesColors {
    pub fn color(&mut self, series: Series) -> (u8, u8, u8) {
        let next = self.assigned.len();
        let idx = *self.assigned.entry(series).or_insert(next);
        PALETTE[idx % PALETTE.len()]
    }
}

pub fn ensure_plot_dirs(dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        fs::create_dir_all(dir).context(format!("Create plot dir {}", dir.display()))?;
    }
    Ok(())
}

/// Stores the plotted values next to the image, in `plot_data/<stem>.json`
pub fn write_plot_data<T: Serialize>(plot_dir: &Path, stem: &str, data: &T) -> Result<PathBuf> {
    let plot_data_dir = plot_dir.join("plot_data");
    ensure_plot_dirs(std::slice::from_ref(&plot_data_dir))?;
    let data_path = plot_data_dir.join(format!("{stem}.json"));
    fs::write(&data_path, serde_json::to_string_pretty(data)?)
        .context(format!("Write plot data {}", data_path.display()))?;
    Ok(data_path)
}

/// Runs every configured plot in order
pub fn plot(plots: &[Box<dyn Plot>], dataset: &Dataset, plot_path: &Path) -> Result<Vec<PathBuf>> {
    if plots.is_empty() {
        debug!("No plots");
        return Ok(Vec::new());
    }

    ensure_plot_dirs(&[plot_path.to_owned()])?;
    let mut written = Vec::new();
    for plot in plots {
        let files = plot
            .plot(dataset, plot_path)
            .context(format!("Render plot {}", plot.name()))?;
        debug!("{} wrote {} files", plot.name(), files.len());
        written.extend(files);
    }
    Ok(written)
}
