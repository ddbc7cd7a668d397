pub mod disk;
pub mod load;
pub mod memory;
pub mod network;
pub mod stat;
pub mod uptime;
pub mod version;

pub use disk::DiskSource;
pub use load::LoadSource;
pub use memory::MemorySource;
pub use network::NetworkSource;
pub use stat::StatSource;
pub use uptime::UptimeSource;
pub use version::VersionSource;

use crate::{
    config::Config,
    error::{CoreError, Result},
    model::{MetricDescriptor, MetricSample},
    procfs::ProcFs,
};
use std::{
    io::BufRead,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// One kernel pseudo-file and the metrics parsed out of it.
///
/// Implementations hold no state besides their path: every `collect` opens the
/// file afresh, so concurrent scrapes never share anything mutable.
pub trait Source: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn path(&self) -> &Path;

    /// Every descriptor `collect` may emit
    fn describe(&self) -> &'static [&'static MetricDescriptor];

    /// Push this cycle's samples into `sink`. On a mid-scan error, samples
    /// already pushed are kept.
    fn collect(&self, sink: &mut Vec<MetricSample>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Stat,
    Disk,
    Uptime,
    Load,
    Network,
    Memory,
    Version,
}

/// Order in which sources run during a collection
pub const SOURCE_ORDER: [SourceKind; 7] = [
    SourceKind::Stat,
    SourceKind::Disk,
    SourceKind::Uptime,
    SourceKind::Load,
    SourceKind::Network,
    SourceKind::Memory,
    SourceKind::Version,
];

impl SourceKind {
    pub fn build(self, proc: &ProcFs) -> Box<dyn Source> {
        match self {
            Self::Stat => Box::new(StatSource::new(proc)),
            Self::Disk => Box::new(DiskSource::new(proc)),
            Self::Uptime => Box::new(UptimeSource::new(proc)),
            Self::Load => Box::new(LoadSource::new(proc)),
            Self::Network => Box::new(NetworkSource::new(proc)),
            Self::Memory => Box::new(MemorySource::new(proc)),
            Self::Version => Box::new(VersionSource::new(proc)),
        }
    }
}

pub static COLLECT_DURATION: MetricDescriptor = MetricDescriptor::counter(
    "node_collect_duration_seconds_total",
    "Wall-clock seconds spent collecting metrics, summed over all collections.",
    &[],
);

pub const DEFAULT_COLLECT_BUDGET: Duration = Duration::from_secs(10);

/// Main collector that runs every source in [`SOURCE_ORDER`] on demand
pub struct MetricsCollector {
    sources: Vec<Box<dyn Source>>,
    budget: Duration,
    collect_nanos: AtomicU64,
}

impl MetricsCollector {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            sources: SOURCE_ORDER.iter().map(|kind| kind.build(proc)).collect(),
            budget: DEFAULT_COLLECT_BUDGET,
            collect_nanos: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&ProcFs::new(&config.proc_root)).with_budget(config.collect_budget())
    }

    /// Collections slower than `budget` are logged. Nothing is cancelled.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Descriptors of every metric `collect` can produce, in source order,
    /// followed by the collection duration. Identical on every call.
    pub fn describe(&self) -> Vec<&'static MetricDescriptor> {
        self.sources
            .iter()
            .flat_map(|s| s.describe().iter().copied())
            .chain(std::iter::once(&COLLECT_DURATION))
            .collect()
    }

    /// Run every source on the calling thread and return their samples,
    /// then the collection duration sample.
    ///
    /// A failing source is logged and contributes whatever it pushed before
    /// failing; it never stops the sources after it.
    pub fn collect(&self) -> Vec<MetricSample> {
        let started = Instant::now();
        let mut samples = Vec::new();

        for source in &self.sources {
            let before = samples.len();
            match source.collect(&mut samples) {
                Ok(()) => debug!(
                    source = source.name(),
                    samples = samples.len() - before,
                    "collected source"
                ),
                Err(e) => warn!(
                    source = source.name(),
                    path = %source.path().display(),
                    error = %e,
                    "source collection failed"
                ),
            }
        }

        let elapsed = started.elapsed();
        if elapsed > self.budget {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "collection exceeded its time budget"
            );
        }

        let elapsed_nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let total_nanos = self
            .collect_nanos
            .fetch_add(elapsed_nanos, Ordering::Relaxed)
            .saturating_add(elapsed_nanos);
        samples.push(MetricSample::unlabeled(
            &COLLECT_DURATION,
            Duration::from_nanos(total_nanos).as_secs_f64(),
        ));

        samples
    }
}

/// Feed each line of a line-oriented pseudo-file to `f` with its zero-based
/// index. Lines that are not valid UTF-8 are skipped but still counted; an I/O
/// error ends the scan with `CoreError::Read`.
pub(crate) fn for_each_line<R, F>(path: &Path, reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, &str),
{
    for (lineno, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.map_err(|e| CoreError::read(path, e))?;
        match std::str::from_utf8(&raw) {
            Ok(line) => f(lineno, line.strip_suffix('\r').unwrap_or(line)),
            Err(e) => debug!(path = %path.display(), lineno, error = %e, "ignoring non-UTF-8 line"),
        }
    }
    Ok(())
}

/// First line of a single-line pseudo-file, terminator stripped. Empty if the file is empty.
pub(crate) fn read_first_line<R: BufRead>(path: &Path, mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| CoreError::read(path, e))?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{failing_reader, write_fixture};
    use std::collections::HashSet;

    fn names(samples: &[MetricSample]) -> HashSet<&'static str> {
        samples.iter().map(|s| s.desc.name).collect()
    }

    #[test]
    fn test_source_order() {
        let collector = MetricsCollector::new(&ProcFs::default());
        assert_eq!(
            collector.source_names(),
            vec!["stat", "diskstats", "uptime", "loadavg", "net/dev", "meminfo", "version"]
        );
    }

    #[test]
    fn test_describe_is_stable() {
        let collector = MetricsCollector::new(&ProcFs::default());
        let first = collector.describe();
        let second = collector.describe();
        assert_eq!(first, second);
        assert_eq!(first.last().map(|d| d.name), Some(COLLECT_DURATION.name));

        let unique: HashSet<&str> = first.iter().map(|d| d.name).collect();
        assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn test_collected_descriptors_are_advertised() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let collector = MetricsCollector::new(&ProcFs::new(dir.path()));

        let advertised: HashSet<*const MetricDescriptor> = collector
            .describe()
            .into_iter()
            .map(|d| d as *const MetricDescriptor)
            .collect();
        let samples = collector.collect();
        assert!(!samples.is_empty());
        for sample in &samples {
            assert!(advertised.contains(&(sample.desc as *const MetricDescriptor)));
            assert_eq!(sample.label_values.len(), sample.desc.label_names.len());
        }
    }

    #[test]
    fn test_collect_follows_source_order() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let collector = MetricsCollector::new(&ProcFs::new(dir.path()));
        let samples = collector.collect();

        let first_of = |name: &str| samples.iter().position(|s| s.desc.name == name).unwrap();
        let order = [
            first_of("node_cpu_seconds_total"),
            first_of("node_disk_reads_completed_total"),
            first_of("node_uptime_seconds"),
            first_of("node_load1"),
            first_of("nic_up"),
            first_of("node_mem_total_bytes"),
            first_of("node_kernel_version"),
            first_of("node_collect_duration_seconds_total"),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(samples.last().unwrap().desc.name, COLLECT_DURATION.name);
    }

    #[test]
    fn test_missing_source_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        std::fs::remove_file(dir.path().join("stat")).unwrap();
        std::fs::remove_file(dir.path().join("meminfo")).unwrap();

        let collector = MetricsCollector::new(&ProcFs::new(dir.path()));
        let samples = collector.collect();
        let names = names(&samples);

        assert!(!names.contains("node_cpu_seconds_total"));
        assert!(!names.contains("node_context_switches_total"));
        assert!(!names.contains("node_mem_total_bytes"));
        for expected in [
            "node_disk_reads_completed_total",
            "node_uptime_seconds",
            "node_load1",
            "nic_up",
            "node_kernel_version",
            "node_collect_duration_seconds_total",
        ] {
            assert!(names.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_empty_proc_root_still_reports_duration() {
        let dir = tempfile::tempdir().unwrap();
        let collector = MetricsCollector::new(&ProcFs::new(dir.path()));
        let samples = collector.collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].desc.name, COLLECT_DURATION.name);
        assert!(samples[0].value >= 0.0);
    }

    #[test]
    fn test_uptime_example() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uptime"), "12345.67 98765.43").unwrap();
        let collector = MetricsCollector::new(&ProcFs::new(dir.path()));
        let samples = collector.collect();
        let uptime: Vec<&MetricSample> = samples
            .iter()
            .filter(|s| s.desc.name == "node_uptime_seconds")
            .collect();
        assert_eq!(uptime.len(), 1);
        assert_eq!(uptime[0].value, 12345.67);
    }

    #[test]
    fn test_duration_is_cumulative() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let collector = MetricsCollector::new(&ProcFs::new(dir.path()));

        let mut previous = 0.0;
        for _ in 0..3 {
            let duration = collector.collect().last().unwrap().value;
            assert!(duration >= previous);
            previous = duration;
        }
    }

    #[test]
    fn test_for_each_line_skips_invalid_utf8() {
        let path = Path::new("/proc/stat");
        let mut seen = Vec::new();
        for_each_line(path, &b"a\r\nb\xff\nc"[..], |lineno, line| {
            seen.push((lineno, line.to_string()))
        })
        .unwrap();
        assert_eq!(seen, vec![(0, "a".to_string()), (2, "c".to_string())]);
    }

    #[test]
    fn test_for_each_line_read_error() {
        let path = Path::new("/proc/stat");
        let mut seen = Vec::new();
        let result = for_each_line(path, failing_reader("a\nb\n"), |_, line| {
            seen.push(line.to_string())
        });
        assert!(matches!(result, Err(CoreError::Read { .. })));
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn test_read_first_line() {
        let path = Path::new("/proc/version");
        assert_eq!(read_first_line(path, "abc\r\ndef\n".as_bytes()).unwrap(), "abc");
        assert_eq!(read_first_line(path, "abc".as_bytes()).unwrap(), "abc");
        assert_eq!(read_first_line(path, "".as_bytes()).unwrap(), "");
    }
}
