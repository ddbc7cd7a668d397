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

pub static MEM_TOTAL: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_total_bytes", "Total memory in bytes", &[]);
pub static MEM_FREE: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_free_bytes", "Free memory in bytes", &[]);
pub static MEM_AVAILABLE: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_available_bytes", "Available memory in bytes", &[]);
pub static SWAP_TOTAL: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_swap_total_bytes", "Total swap space in bytes", &[]);
pub static SWAP_FREE: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_swap_free_bytes", "Free swap space in bytes", &[]);
pub static MAPPED: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_mapped_bytes", "Mapped memory in bytes", &[]);
pub static SHMEM: MetricDescriptor =
    MetricDescriptor::gauge("node_mem_shmem_bytes", "Shared memory in bytes", &[]);

const TRACKED_KEYS: usize = 7;

/// Tracked meminfo keys, in emission order
static TRACKED: [(&str, &MetricDescriptor); TRACKED_KEYS] = [
    ("MemTotal", &MEM_TOTAL),
    ("MemFree", &MEM_FREE),
    ("MemAvailable", &MEM_AVAILABLE),
    ("SwapTotal", &SWAP_TOTAL),
    ("SwapFree", &SWAP_FREE),
    ("Mapped", &MAPPED),
    ("Shmem", &SHMEM),
];

static DESCRIPTORS: [&MetricDescriptor; 7] = [
    &MEM_TOTAL,
    &MEM_FREE,
    &MEM_AVAILABLE,
    &SWAP_TOTAL,
    &SWAP_FREE,
    &MAPPED,
    &SHMEM,
];

/// Bytes per unit. Anything other than `kB`, including a missing unit, scales to zero.
fn unit_multiplier(unit: Option<&str>) -> f64 {
    match unit {
        Some("kB") => 1024.0,
        _ => 0.0,
    }
}

/// Reads `/proc/meminfo` for a fixed set of memory and swap gauges
pub struct MemorySource {
    path: PathBuf,
}

impl MemorySource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("meminfo"),
        }
    }

    /// Scans the whole file before emitting; a read error leaves the sink untouched.
    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        let mut values = [0.0_f64; TRACKED_KEYS];

        for_each_line(&self.path, reader, |_, line| {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                return;
            };
            let key = key.strip_suffix(':').unwrap_or(key);
            if let Some(slot) = TRACKED.iter().position(|(name, _)| *name == key) {
                values[slot] = parse_float(value) * unit_multiplier(fields.next());
            }
        })?;

        sink.extend(
            TRACKED
                .iter()
                .zip(values)
                .map(|(&(_, desc), value)| MetricSample::unlabeled(desc, value)),
        );
        Ok(())
    }
}

impl Source for MemorySource {
    fn name(&self) -> &'static str {
        "meminfo"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::CoreError, testutil::failing_reader};

    const MEMINFO: &str = "\
MemTotal:       16318148 kB
MemFree:         1260532 kB
MemAvailable:    9431008 kB
Buffers:          640236 kB
Cached:          7609936 kB
SwapTotal:       2097148 kB
SwapFree:        2097148 kB
Mapped:           968024 kB
Shmem:            523092 kB
HugePages_Total:       0
";

    fn scan(input: &str) -> Vec<MetricSample> {
        let source = MemorySource::new(&ProcFs::default());
        let mut sink = Vec::new();
        source.scan(input.as_bytes(), &mut sink).unwrap();
        sink
    }

    #[test]
    fn test_allow_list_only() {
        let samples = scan(MEMINFO);
        let names: Vec<&str> = samples.iter().map(|s| s.desc.name).collect();
        assert_eq!(
            names,
            vec![
                "node_mem_total_bytes",
                "node_mem_free_bytes",
                "node_mem_available_bytes",
                "node_mem_swap_total_bytes",
                "node_mem_swap_free_bytes",
                "node_mem_mapped_bytes",
                "node_mem_shmem_bytes",
            ]
        );
    }

    #[test]
    fn test_kilobytes_to_bytes() {
        let samples = scan(MEMINFO);
        assert_eq!(samples[0].value, 16318148.0 * 1024.0);
        assert_eq!(samples[2].value, 9431008.0 * 1024.0);
        assert_eq!(samples[6].value, 523092.0 * 1024.0);
    }

    #[test]
    fn test_absent_keys_are_zero() {
        let samples = scan("MemTotal: 1000 kB\n");
        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0].value, 1024000.0);
        assert!(samples[1..].iter().all(|s| s.value == 0.0));
    }

    #[test]
    fn test_unknown_or_missing_unit_is_zero() {
        let samples = scan("MemTotal: 1000 MB\nMemFree: 500\n");
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[1].value, 0.0);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let input = b"MemTotal: 1000 kB\nMem\xffFree: 1 kB\nMemFree: 500 kB\n";
        let source = MemorySource::new(&ProcFs::default());
        let mut sink = Vec::new();
        source.scan(&input[..], &mut sink).unwrap();

        assert_eq!(sink[0].value, 1024000.0);
        assert_eq!(sink[1].value, 512000.0);
    }

    #[test]
    fn test_read_error_emits_nothing() {
        let source = MemorySource::new(&ProcFs::default());
        let mut sink = Vec::new();
        let result = source.scan(failing_reader(MEMINFO), &mut sink);

        assert!(matches!(result, Err(CoreError::Read { .. })));
        assert!(sink.is_empty());
    }
}
