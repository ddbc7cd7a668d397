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

pub static UPTIME: MetricDescriptor =
    MetricDescriptor::gauge("node_uptime_seconds", "System uptime in seconds.", &[]);

static DESCRIPTORS: [&MetricDescriptor; 1] = [&UPTIME];

/// Reads seconds since boot from `/proc/uptime`
pub struct UptimeSource {
    path: PathBuf,
}

impl UptimeSource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("uptime"),
        }
    }

    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        let line = read_first_line(&self.path, reader)?;
        let token = line
            .split_whitespace()
            .next()
            .ok_or_else(|| CoreError::malformed(&self.path, "empty file"))?;
        let uptime = parse_float_strict(token)
            .ok_or_else(|| CoreError::malformed(&self.path, format!("invalid uptime {token:?}")))?;

        sink.push(MetricSample::unlabeled(&UPTIME, uptime));
        Ok(())
    }
}

impl Source for UptimeSource {
    fn name(&self) -> &'static str {
        "uptime"
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
