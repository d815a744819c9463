use std::fmt;

use crate::{
    dataset::{Dataset, DatasetRow},
    util::format_size,
};

/// Which message sizes a [`Partition`] covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionId {
    All,
    AtMost(u64),
    Above(u64),
}

impl PartitionId {
    /// Used in output file names
    pub fn slug(&self) -> String {
        match self {
            PartitionId::All => "all".to_owned(),
            PartitionId::AtMost(x) => format!("le_{}", format_size(*x)),
            PartitionId::Above(x) => format!("gt_{}", format_size(*x)),
        }
    }

    pub fn contains(&self, message_size: u64) -> bool {
        match self {
            PartitionId::All => true,
            PartitionId::AtMost(x) => message_size <= *x,
            PartitionId::Above(x) => message_size > *x,
        }
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionId::All => f.write_str("all message sizes"),
            PartitionId::AtMost(x) => write!(f, "Message Size <= {}", format_size(*x)),
            PartitionId::Above(x) => write!(f, "Message Size > {}", format_size(*x)),
        }
    }
}

/// A view of the dataset rows in one message-size range, ordered by ascending
/// message size with ties kept in dataset order
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    pub id: PartitionId,
    pub rows: Vec<&'a DatasetRow>,
}

impl<'a> Partition<'a> {
    pub fn new(dataset: &'a Dataset, id: PartitionId) -> Self {
        let mut rows = dataset
            .rows()
            .iter()
            .filter(|x| id.contains(x.experiment.message_size))
            .collect::<Vec<_>>();
        rows.sort_by_key(|x| x.experiment.message_size);
        Self { id, rows }
    }

    pub fn all(dataset: &'a Dataset) -> Self {
        Self::new(dataset, PartitionId::All)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Splits into `<= threshold` and `> threshold`
pub fn split(dataset: &Dataset, threshold: u64) -> (Partition<'_>, Partition<'_>) {
    (
        Partition::new(dataset, PartitionId::AtMost(threshold)),
        Partition::new(dataset, PartitionId::Above(threshold)),
    )
}
