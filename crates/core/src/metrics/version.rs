use super::{read_first_line, Source};
use crate::{
    error::Result,
    model::{MetricDescriptor, MetricSample},
    procfs::{self, ProcFs},
};
use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

pub static KERNEL_VERSION: MetricDescriptor = MetricDescriptor::gauge(
    "node_kernel_version",
    "Kernel version of the node.",
    &["version"],
);

static DESCRIPTORS: [&MetricDescriptor; 1] = [&KERNEL_VERSION];

/// Exposes the `/proc/version` banner as a label on a constant `1` gauge
pub struct VersionSource {
    path: PathBuf,
}

impl VersionSource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("version"),
        }
    }

    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        let line = read_first_line(&self.path, reader)?;
        // An empty first line yields no sample, not a `version=""` series
        if !line.is_empty() {
            sink.push(MetricSample::new(&KERNEL_VERSION, vec![line], 1.0));
        }
        Ok(())
    }
}

impl Source for VersionSource {
    fn name(&self) -> &'static str {
        "version"
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
