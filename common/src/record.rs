use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One data line of a results file, aligned to [`Records::columns`]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    values: Vec<f64>,
}

impl SampleRow {
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// The parsed contents of one results file. Values stay in the units the
/// harness wrote them in (nanoseconds).
#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<SampleRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Whitespace,
}

impl Records {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|x| x == column)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|x| x.values[idx])
    }

    /// Every sample of `column`, or [`None`] if the file has no such column
    pub fn samples(&self, column: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|x| x.values[idx]).collect())
    }
}

pub fn read_records(path: &Path) -> Result<Records> {
    let data = fs::read(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_records(path, data)
}

/// Parses a header line followed by numeric rows.
///
/// Tab separated when the header contains a tab, otherwise split on runs of
/// whitespace. Rows that do not match the header, including rows that are not
/// valid UTF-8, are skipped with a warning.
pub fn parse_records(path: &Path, data: impl AsRef<[u8]>) -> Result<Records> {
    let data = data.as_ref();
    let header_line = data
        .split(|x| *x == b'\n')
        .find(|x| !x.trim_ascii().is_empty())
        .ok_or_else(|| Error::MissingHeader {
            path: path.to_owned(),
        })?;
    let delimiter = if header_line.contains(&b'\t') {
        Delimiter::Tab
    } else {
        Delimiter::Whitespace
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .delimiter(b'\t')
        .from_reader(data);

    let mut records = reader.byte_records().filter_map(|record| {
        let record = match record {
            Ok(record) => record,
            Err(source) => {
                warn!(
                    "{}",
                    Error::Csv {
                        path: path.to_owned(),
                        source
                    }
                );
                return None;
            }
        };
        let line = record.position().map(|x| x.line()).unwrap_or_default();
        match StringRecord::from_byte_record(record) {
            Ok(record) => Some((line, record)),
            Err(err) => {
                warn!(
                    "Skipping row: {}",
                    Error::Parse {
                        path: path.to_owned(),
                        line,
                        reason: format!("not valid UTF-8: {}", err.utf8_error()),
                    }
                );
                None
            }
        }
    });

    let columns: Vec<String> = loop {
        let (_, record) = records.next().ok_or_else(|| Error::MissingHeader {
            path: path.to_owned(),
        })?;
        let fields = split_fields(&record, delimiter);
        if !fields.is_empty() {
            break fields.into_iter().map(str::to_owned).collect();
        }
    };

    let mut rows = Vec::new();
    for (line, record) in records {
        let fields = split_fields(&record, delimiter);
        if fields.is_empty() {
            continue;
        }

        match parse_row(&columns, &fields) {
            Ok(values) => rows.push(SampleRow { values }),
            Err(reason) => warn!(
                "Skipping row: {}",
                Error::Parse {
                    path: path.to_owned(),
                    line,
                    reason,
                }
            ),
        }
    }

    debug!(
        "Read {} rows of {:?} from {}",
        rows.len(),
        columns,
        path.display()
    );
    Ok(Records {
        path: path.to_owned(),
        columns,
        rows,
    })
}

fn split_fields(record: &StringRecord, delimiter: Delimiter) -> Vec<&str> {
    match delimiter {
        Delimiter::Tab => {
            if record.iter().all(str::is_empty) {
                Vec::new()
            } else {
                record.iter().collect()
            }
        }
        Delimiter::Whitespace => record.iter().flat_map(str::split_whitespace).collect(),
    }
}

fn parse_row(columns: &[String], fields: &[&str]) -> std::result::Result<Vec<f64>, String> {
    if fields.len() != columns.len() {
        return Err(format!(
            "expected {} fields, found {}",
            columns.len(),
            fields.len()
        ));
    }

    fields
        .iter()
        .zip(columns)
        .map(|(field, column)| match field.parse::<f64>() {
            Ok(x) if x.is_finite() && x >= 0.0 => Ok(x),
            _ => Err(format!("`{field}` is not a duration in column `{column}`")),
        })
        .collect()
}
