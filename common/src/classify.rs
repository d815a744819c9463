use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The I/O mechanism a results file was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "sync_io")]
    SyncIo,
    #[serde(rename = "async_io")]
    AsyncIo,
    #[serde(rename = "async io - O_SYNC")]
    AsyncIoSync,
    #[serde(rename = "async io - O_DSYNC")]
    AsyncIoDsync,
    #[serde(rename = "mmap_io")]
    MmapIo,
    #[serde(rename = "rdma_send_recv")]
    RdmaSendRecv,
    #[serde(rename = "rdma_send_recv_c")]
    RdmaSendRecvC,
}

impl Label {
    pub const ALL: [Label; 7] = [
        Label::SyncIo,
        Label::AsyncIo,
        Label::AsyncIoSync,
        Label::AsyncIoDsync,
        Label::MmapIo,
        Label::RdmaSendRecv,
        Label::RdmaSendRecvC,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Label::SyncIo => "sync_io",
            Label::AsyncIo => "async_io",
            Label::AsyncIoSync => "async io - O_SYNC",
            Label::AsyncIoDsync => "async io - O_DSYNC",
            Label::MmapIo => "mmap_io",
            Label::RdmaSendRecv => "rdma_send_recv",
            Label::RdmaSendRecvC => "rdma_send_recv_c",
        }
    }

    /// Everything in front of `_<size>.txt` in the harness output names
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Label::AsyncIoSync => "async_io_sync_elapsed_time",
            Label::AsyncIoDsync => "async_io_dsync_elapsed_time",
            other => other.name(),
        }
    }

    pub fn from_file_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|x| x.file_prefix() == prefix)
    }

    pub fn file_name(&self, message_size: u64) -> String {
        format!("{}_{message_size}.txt", self.file_prefix())
    }

    /// The columns each harness measures. Anything else in a file is ignored.
    pub fn phases(&self) -> &'static [Phase] {
        match self {
            Label::SyncIo => &[Phase::Write],
            Label::AsyncIo => &[Phase::Initiation, Phase::Write, Phase::Fsync],
            Label::AsyncIoSync | Label::AsyncIoDsync => &[
                Phase::WriteRegistered,
                Phase::WriteCompleted,
                Phase::FsyncRegistered,
                Phase::FsyncCompleted,
                Phase::NonBlocking,
            ],
            Label::MmapIo => &[Phase::Memcpy, Phase::Msync],
            Label::RdmaSendRecv | Label::RdmaSendRecvC => {
                &[Phase::BeforeWait, Phase::AfterWait, Phase::Rtt]
            }
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A separately timed stage of one I/O operation, named after its header column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "write_duration_nsec")]
    Write,
    #[serde(rename = "initiation_duration_nsec")]
    Initiation,
    #[serde(rename = "fsync_duration_nsec")]
    Fsync,
    #[serde(rename = "flush_duration_nsec")]
    Flush,
    #[serde(rename = "memcpy_duration_nsec")]
    Memcpy,
    #[serde(rename = "msync_duration_nsec")]
    Msync,
    #[serde(rename = "elapsed_after_write_registered_nsec")]
    WriteRegistered,
    #[serde(rename = "elapsed_after_write_completed_nsec")]
    WriteCompleted,
    #[serde(rename = "elapsed_after_fsync_registered_nsec")]
    FsyncRegistered,
    #[serde(rename = "elapsed_after_fsync_completed_nsec")]
    FsyncCompleted,
    #[serde(rename = "non_blocking_time_nsec")]
    NonBlocking,
    #[serde(rename = "before wait")]
    BeforeWait,
    #[serde(rename = "after wait")]
    AfterWait,
    #[serde(rename = "rtt")]
    Rtt,
}

impl Phase {
    pub const ALL: [Phase; 14] = [
        Phase::Write,
        Phase::Initiation,
        Phase::Fsync,
        Phase::Flush,
        Phase::Memcpy,
        Phase::Msync,
        Phase::WriteRegistered,
        Phase::WriteCompleted,
        Phase::FsyncRegistered,
        Phase::FsyncCompleted,
        Phase::NonBlocking,
        Phase::BeforeWait,
        Phase::AfterWait,
        Phase::Rtt,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Phase::Write => "write_duration_nsec",
            Phase::Initiation => "initiation_duration_nsec",
            Phase::Fsync => "fsync_duration_nsec",
            Phase::Flush => "flush_duration_nsec",
            Phase::Memcpy => "memcpy_duration_nsec",
            Phase::Msync => "msync_duration_nsec",
            Phase::WriteRegistered => "elapsed_after_write_registered_nsec",
            Phase::WriteCompleted => "elapsed_after_write_completed_nsec",
            Phase::FsyncRegistered => "elapsed_after_fsync_registered_nsec",
            Phase::FsyncCompleted => "elapsed_after_fsync_completed_nsec",
            Phase::NonBlocking => "non_blocking_time_nsec",
            Phase::BeforeWait => "before wait",
            Phase::AfterWait => "after wait",
            Phase::Rtt => "rtt",
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|x| x.column() == s)
            .ok_or_else(|| format!("Unknown phase column {s}"))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Experiment {
    pub label: Label,
    pub message_size: u64,
}

/// Recovers the experiment from a harness output name, `<label tokens>_<size>.txt`
pub fn classify(file_name: &str) -> Result<Experiment> {
    let name_error = |reason| Error::FileName {
        name: file_name.to_owned(),
        reason,
    };

    let stem = file_name
        .strip_suffix(".txt")
        .ok_or_else(|| name_error("expected a .txt extension"))?;
    let (prefix, size) = stem
        .rsplit_once('_')
        .ok_or_else(|| name_error("missing _<message size> suffix"))?;
    let message_size = size
        .parse::<u64>()
        .map_err(|_| name_error("message size is not an integer"))?;
    if message_size == 0 {
        return Err(name_error("message size must be positive"));
    }

    let label = Label::from_file_prefix(prefix).ok_or_else(|| Error::UnknownLabel {
        name: file_name.to_owned(),
        label: prefix.to_owned(),
    })?;

    Ok(Experiment {
        label,
        message_size,
    })
}
