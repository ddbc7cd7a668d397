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

pub static NIC_UP: MetricDescriptor = MetricDescriptor::gauge("nic_up", "NIC up status", &["nic"]);
pub static RX_BYTES: MetricDescriptor =
    MetricDescriptor::counter("nic_rx_bytes_total", "Total received bytes", &["nic"]);
pub static RX_ERRS: MetricDescriptor =
    MetricDescriptor::counter("nic_rx_errs_total", "Total received errors", &["nic"]);
pub static RX_DROPS: MetricDescriptor =
    MetricDescriptor::counter("nic_rx_drops_total", "Total received drops", &["nic"]);
pub static TX_BYTES: MetricDescriptor =
    MetricDescriptor::counter("nic_tx_bytes_total", "Total transmitted bytes", &["nic"]);
pub static TX_ERRS: MetricDescriptor =
    MetricDescriptor::counter("nic_tx_errs_total", "Total transmitted errors", &["nic"]);
pub static TX_DROPS: MetricDescriptor =
    MetricDescriptor::counter("nic_tx_drops_total", "Total transmitted drops", &["nic"]);

// packets, fifo, frame, compressed and multicast columns are not exported
static COLUMNS: [(usize, &MetricDescriptor); 6] = [
    (1, &RX_BYTES),
    (2, &RX_ERRS),
    (3, &RX_DROPS),
    (9, &TX_BYTES),
    (10, &TX_ERRS),
    (11, &TX_DROPS),
];

static DESCRIPTORS: [&MetricDescriptor; 7] = [
    &NIC_UP, &RX_BYTES, &RX_ERRS, &RX_DROPS, &TX_BYTES, &TX_ERRS, &TX_DROPS,
];

const HEADER_LINES: usize = 2;
const MIN_FIELDS: usize = 17;

/// Reads `/proc/net/dev`: per-interface traffic, error and drop counters.
///
/// An interface counts as up when it has an entry. Interfaces the kernel does
/// not list are absent rather than reported down.
pub struct NetworkSource {
    path: PathBuf,
}

impl NetworkSource {
    pub fn new(proc: &ProcFs) -> Self {
        Self {
            path: proc.path("net/dev"),
        }
    }

    pub fn scan<R: BufRead>(&self, reader: R, sink: &mut Vec<MetricSample>) -> Result<()> {
        for_each_line(&self.path, reader, |lineno, line| {
            if lineno < HEADER_LINES {
                return;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < MIN_FIELDS {
                debug!(line = %line, "ignoring short net/dev line");
                return;
            }

            let nic = fields[0].strip_suffix(':').unwrap_or(fields[0]);
            sink.push(MetricSample::new(&NIC_UP, vec![nic.to_string()], 1.0));
            for &(idx, desc) in COLUMNS.iter() {
                sink.push(MetricSample::new(
                    desc,
                    vec![nic.to_string()],
                    parse_float(fields[idx]),
                ));
            }
        })
    }
}

impl Source for NetworkSource {
    fn name(&self) -> &'static str {
        "net/dev"
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
