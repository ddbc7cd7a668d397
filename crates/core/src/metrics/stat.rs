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

/// Kernel ticks per second assumed for `/proc/stat` jiffies
pub const USER_HZ: f64 = 100.0;

pub static CPU_SECONDS: MetricDescriptor = MetricDescriptor::counter(
    "node_cpu_seconds_total",
    "Seconds the CPUs spent in each mode.",
    &["cpu", "mode"],
);
pub static INTERRUPTS: MetricDescriptor = MetricDescriptor::counter(
    "node_intr_total",
    "Total number of interrupts serviced.",
    &[],
);
pub static CONTEXT_SWITCHES: MetricDescriptor = MetricDescriptor::counter(
    "node_context_switches_total",
    "Total number of context switches.",
    &[],
);
pub static BOOT_TIME: MetricDescriptor = MetricDescriptor::gauge(
    "node_boot_time_seconds",
    "Node boot time, in seconds since epoch.",
    &[],
);
pub static PROCESSES: MetricDescriptor = MetricDescriptor::counter(
    "node_processes_total",
    "Total number of processes.",
    &[],
);
pub static PROCS_RUNNING: MetricDescriptor = MetricDescriptor::gauge(
    "node_procs_running",
    "Number of processes in runnable state.",
    &[],
);
pub static PROCS_BLOCKED: MetricDescriptor = MetricDescriptor::gauge(
    "node_procs_blocked",
    "Number of processes blocked.",
    &[],
);
pub static SOFTIRQS: MetricDescriptor = MetricDescriptor::counter(
    "node_softirq_total",
    "Total number of soft IRQs.",
    &["type"],
);

static DESCRIPTORS: [&MetricDescriptor; 8] = [
    &CPU_SECONDS,
    &INTERRUPTS,
    &CONTEXT_SWITCHES,
    &BOOT_TIME,
    &PROCESSES,
    &PROCS_RUNNING,
    &PROCS_BLOCKED,
    &SOFTIRQS,
];

/// Field index and mode name for each emitted CPU mode.
/// Index 5 (iowait) is left out: the waiting task is not using the CPU it is
/// accounted against, another task can be scheduled there meanwhile.
const CPU_MODES: [(usize, &str); 9] = [
    (1, "user"),
    (2, "nice"),
    (3, "system"),
    (4, "idle"),
    (6, "irq"),
    (7, "softirq"),
    (8, "steal"),
    (9, "guest"),
    (10, "guest_nice"),
];

const CPU_MIN_FIELDS: usize = 11;

/// Reads `/proc/stat`: per-CPU mode times, interrupt, context switch and process counts
pub struct StatSource {
    path: PathBuf,
}

impl StatSource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("stat"),
        }
    }

    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        for_each_line(&self.path, reader, |_, line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let Some(record) = parts.first() else {
                return;
            };

            if record.starts_with("cpu") {
                if parts.len() < CPU_MIN_FIELDS {
                    debug!(line = %line, "ignoring short cpu line");
                    return;
                }
                let cpu = parts[0];
                for (idx, mode) in CPU_MODES {
                    sink.push(MetricSample::new(
                        &CPU_SECONDS,
                        vec![cpu.to_string(), mode.to_string()],
                        parse_float(parts[idx]) / USER_HZ,
                    ));
                }
            } else if record.starts_with("softirq") {
                // parts[1] is the total; per-type values keep their position after it
                for (idx, value) in parts.iter().enumerate().skip(2) {
                    sink.push(MetricSample::new(
                        &SOFTIRQS,
                        vec![(idx - 1).to_string()],
                        parse_float(value),
                    ));
                }
            } else if let Some(desc) = single_value_record(record) {
                match parts.get(1) {
                    Some(value) => sink.push(MetricSample::unlabeled(desc, parse_float(value))),
                    None => debug!(line = %line, "ignoring {} line without value", desc.name),
                }
            }
        })
    }
}

fn single_value_record(record: &str) -> Option<&'static MetricDescriptor> {
    static RECORDS: [(&str, &MetricDescriptor); 6] = [
        ("intr", &INTERRUPTS),
        ("ctxt", &CONTEXT_SWITCHES),
        ("btime", &BOOT_TIME),
        ("processes", &PROCESSES),
        ("procs_running", &PROCS_RUNNING),
        ("procs_blocked", &PROCS_BLOCKED),
    ];
    RECORDS
        .iter()
        .find(|(prefix, _)| record.starts_with(prefix))
        .map(|(_, desc)| *desc)
}

impl Source for StatSource {
    fn name(&self) -> &'static str {
        "stat"
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
