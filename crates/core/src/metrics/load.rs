use super::{read_first_line, Source};
use crate::{
    error::{CoreError, Result},
    model::{MetricDescriptor, MetricSample},
    parse::parse_float_strict,
    procfs::{self, ProcFs},
};
use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

pub static LOAD1: MetricDescriptor =
    MetricDescriptor::gauge("node_load1", "1 minute load average.", &[]);
pub static LOAD5: MetricDescriptor =
    MetricDescriptor::gauge("node_load5", "5 minute load average.", &[]);
pub static LOAD15: MetricDescriptor =
    MetricDescriptor::gauge("node_load15", "15 minute load average.", &[]);

static DESCRIPTORS: [&MetricDescriptor; 3] = [&LOAD1, &LOAD5, &LOAD15];

/// Reads the 1, 5 and 15 minute load averages from `/proc/loadavg`
pub struct LoadSource {
    path: PathBuf,
}

impl LoadSource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("loadavg"),
        }
    }

    /// All three averages must parse; otherwise nothing is emitted.
    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        let line = read_first_line(&self.path, reader)?;
        let mut tokens = line.split_whitespace();

        let mut values = [0.0; 3];
        for (slot, desc) in values.iter_mut().zip(DESCRIPTORS.iter()) {
            let token = tokens.next().ok_or_else(|| {
                CoreError::malformed(&self.path, format!("missing value for {}", desc.name))
            })?;
            *slot = parse_float_strict(token).ok_or_else(|| {
                CoreError::malformed(&self.path, format!("invalid load average {token:?}"))
            })?;
        }

        sink.extend(
            DESCRIPTORS
                .iter()
                .zip(values)
                .map(|(&desc, value)| MetricSample::unlabeled(desc, value)),
        );
        Ok(())
    }
}

impl Source for LoadSource {
    fn name(&self) -> &'static str {
        "loadavg"
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
