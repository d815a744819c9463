use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning one results file into aggregated rows.
///
/// Only [`Error::Io`] on the results directory itself aborts a run, every other
/// variant is reported and the offending file or row is skipped.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{name}: {reason}")]
    FileName { name: String, reason: &'static str },
    #[error("{name}: unknown experiment label `{label}`")]
    UnknownLabel { name: String, label: String },
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("{}: missing header line", path.display())]
    MissingHeader { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
