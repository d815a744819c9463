use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::plot::Plot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    pub plots: Vec<Box<dyn Plot>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the harness `*.txt` files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory images, plot data and the summary table are written to
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,
    /// Also write `summary.csv` into `plot_dir`
    #[serde(default = "default_true")]
    pub summary: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            plot_dir: default_plot_dir(),
            summary: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use eyre::Result;

    use super::*;
    use crate::{dataset::Dataset, plot::Plot};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Noop {
        name: String,
    }

    #[typetag::serde]
    impl Plot for Noop {
        fn name(&self) -> &str {
            &self.name
        }

        fn plot(&self, _dataset: &Dataset, _plot_path: &Path) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn settings_default_when_missing() {
        let config: Config = serde_yml::from_str(
            "name: test\nplots:\n  - type: Noop\n    name: first\n",
        )
        .unwrap();
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.plots.len(), 1);
        assert_eq!(config.plots[0].name(), "first");
        assert!(config.plots[0].downcast_ref::<Noop>().is_some());
    }

    #[test]
    fn partial_settings() {
        let config: Config = serde_yml::from_str(
            "name: test\nsettings:\n  data_dir: compare_results\n  summary: false\nplots: []\n",
        )
        .unwrap();
        assert_eq!(config.settings.data_dir, PathBuf::from("compare_results"));
        assert_eq!(config.settings.plot_dir, PathBuf::from("plots"));
        assert!(!config.settings.summary);
    }

    #[test]
    fn unknown_plot_type_is_rejected() {
        let config = serde_yml::from_str::<Config>("name: test\nplots:\n  - type: Heatmap\n");
        assert!(config.is_err());
    }
}
