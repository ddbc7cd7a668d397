use super::{for_each_line, Source};
use crate::{
    error::Result,
    model::{MetricDescriptor, MetricSample},
    parse::parse_float,
    procfs::{self, ProcFs},
};
use std::{
    io::BufRead,
    path::{Path, PathBuf},
};
use tracing::debug;

pub static READS_COMPLETED: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_reads_completed_total",
    "Total number of reads completed successfully.",
    &["device"],
);
pub static READS_MERGED: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_reads_merged_total",
    "Total number of reads merged.",
    &["device"],
);
pub static SECTORS_READ: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_sectors_read_total",
    "Total number of sectors read successfully.",
    &["device"],
);
pub static READ_TIME: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_read_time_seconds_total",
    "Total time spent reading from disk, in seconds.",
    &["device"],
);
pub static WRITES_COMPLETED: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_writes_completed_total",
    "Total number of writes completed successfully.",
    &["device"],
);
pub static WRITES_MERGED: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_writes_merged_total",
    "Total number of writes merged.",
    &["device"],
);
pub static SECTORS_WRITTEN: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_sectors_written_total",
    "Total number of sectors written successfully.",
    &["device"],
);
pub static WRITE_TIME: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_write_time_seconds_total",
    "Total time spent writing to disk, in seconds.",
    &["device"],
);
pub static IO_TIME: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_io_time_seconds_total",
    "Total time spent doing I/Os, in seconds.",
    &["device"],
);
pub static WEIGHTED_IO_TIME: MetricDescriptor = MetricDescriptor::counter(
    "node_disk_weighted_io_time_seconds_total",
    "Total weighted time spent doing I/Os, in seconds.",
    &["device"],
);

/// Column in a diskstats line, the descriptor it feeds, and the divisor applied.
/// Times are reported in milliseconds. Column 11 (I/Os in flight) and the
/// discard/flush columns of newer kernels are not read.
static COLUMNS: [(usize, &MetricDescriptor, f64); 10] = [
    (3, &READS_COMPLETED, 1.0),
    (4, &READS_MERGED, 1.0),
    (5, &SECTORS_READ, 1.0),
    (6, &READ_TIME, 1000.0),
    (7, &WRITES_COMPLETED, 1.0),
    (8, &WRITES_MERGED, 1.0),
    (9, &SECTORS_WRITTEN, 1.0),
    (10, &WRITE_TIME, 1000.0),
    (12, &IO_TIME, 1000.0),
    (13, &WEIGHTED_IO_TIME, 1000.0),
];

static DESCRIPTORS: [&MetricDescriptor; 10] = [
    &READS_COMPLETED,
    &READS_MERGED,
    &SECTORS_READ,
    &READ_TIME,
    &WRITES_COMPLETED,
    &WRITES_MERGED,
    &SECTORS_WRITTEN,
    &WRITE_TIME,
    &IO_TIME,
    &WEIGHTED_IO_TIME,
];

const MIN_FIELDS: usize = 14;

/// Reads `/proc/diskstats`: per-device I/O counters
pub struct DiskSource {
    path: PathBuf,
}

impl DiskSource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("diskstats"),
        }
    }

    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        for_each_line(&self.path, reader, |_, line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < MIN_FIELDS {
                debug!(line = %line, "ignoring short diskstats line");
                return;
            }

            let device = parts[2];
            for &(idx, desc, divisor) in COLUMNS.iter() {
                sink.push(MetricSample::new(
                    desc,
                    vec![device.to_string()],
                    parse_float(parts[idx]) / divisor,
                ));
            }
        })
    }
}

impl Source for DiskSource {
    fn name(&self) -> &'static str {
        "diskstats"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn describe(&self) -> &'static [&'static MetricDescriptor] {
        &DESCRIPTORS
    }

    fn collect(&self, sink: &mut Vec<MetricSample>) -> Result<()> {
        let reader = procfs::open(&self.path)?;
        self.scan(reader, sink)
    }
}
