use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    NS_TO_US,
    classify::{Experiment, Phase, classify},
    error::{Error, Result},
    record::{Records, read_records},
    stats::Summary,
};

/// Aggregated statistics of one results file, in microseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
    pub experiment: Experiment,
    pub phases: BTreeMap<Phase, Summary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    label: &'a str,
    message_size: u64,
    phase: &'a str,
    mean_us: f64,
    p99_us: f64,
    max_us: f64,
}

impl Dataset {
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes one line per (experiment, phase) pair
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let csv_error = |source| Error::Csv {
            path: path.to_owned(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        for row in &self.rows {
            for (phase, summary) in &row.phases {
                writer
                    .serialize(SummaryLine {
                        label: row.experiment.label.name(),
                        message_size: row.experiment.message_size,
                        phase: phase.column(),
                        mean_us: summary.mean,
                        p99_us: summary.p99,
                        max_us: summary.max,
                    })
                    .map_err(csv_error)?;
            }
        }
        writer.flush().map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })
    }
}

/// Computes a [`Summary`] for every phase the experiment's label declares.
/// Phases without a column or without samples are left out.
pub fn aggregate(experiment: Experiment, records: &Records) -> DatasetRow {
    let phases = experiment
        .label
        .phases()
        .iter()
        .filter_map(|phase| {
            let samples = records.samples(phase.column())?;
            let summary = Summary::from_samples(&samples)?.scaled(NS_TO_US);
            Some((*phase, summary))
        })
        .collect::<BTreeMap<_, _>>();

    if phases.len() < experiment.label.phases().len() {
        debug!(
            "{} has data for {} of {} phases",
            records.path.display(),
            phases.len(),
            experiment.label.phases().len()
        );
    }

    DatasetRow { experiment, phases }
}

#[derive(Debug, Default)]
pub struct DatasetBuilder {
    rows: Vec<DatasetRow>,
}

impl DatasetBuilder {
    pub fn add_records(&mut self, experiment: Experiment, records: &Records) {
        self.rows.push(aggregate(experiment, records));
    }

    /// Classifies, reads and aggregates one file. On error nothing is added.
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|x| x.to_str())
            .ok_or_else(|| Error::FileName {
                name: path.display().to_string(),
                reason: "file name is not valid UTF-8",
            })?;
        let experiment = classify(file_name)?;
        let records = read_records(path)?;
        self.add_records(experiment, &records);
        Ok(())
    }

    pub fn finish(self) -> Dataset {
        Dataset { rows: self.rows }
    }
}

/// Aggregates every results file in `dir`.
///
/// Only failing to list `dir` is an error. Files are visited in name order so
/// repeated runs over the same directory produce the same dataset.
pub fn build_dataset(dir: &Path) -> Result<Dataset> {
    let io_error = |source| Error::Io {
        path: dir.to_owned(),
        source,
    };

    let mut files = fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.map(|x| x.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()
        .map_err(io_error)?;
    files.retain(|x| x.is_file());
    files.sort();

    let mut builder = DatasetBuilder::default();
    let mut skipped = 0;
    for file in &files {
        match builder.add_file(file) {
            Ok(()) => {}
            Err(err @ Error::UnknownLabel { .. }) => {
                debug!("Ignoring {err}");
                skipped += 1;
            }
            Err(err) => {
                warn!("Skipping file: {err}");
                skipped += 1;
            }
        }
    }

    let dataset = builder.finish();
    info!(
        "Aggregated {} files from {} ({} skipped)",
        dataset.len(),
        dir.display(),
        skipped
    );
    Ok(dataset)
}
