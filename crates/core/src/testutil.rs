use std::{
    fs,
    io::{self, BufReader, Read},
    path::Path,
};

pub const STAT: &str = "\
cpu  10132153 290696 3084719 46828483 16683 0 25195 0 175628 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 23933 0
intr 114930548 113199788 3 0 5 263 0 4
ctxt 1990473
btime 1062191376
processes 2915
procs_running 1
procs_blocked 0
softirq 229245889 94 60001584 13619 5175704 2471304 28 51212741 59130143 0 51240672
";

pub const DISKSTATS: &str = "\
   8       0 sda 52341 1203 4184420 30450 88012 61023 3392184 120230 0 61030 150680 0 0 0 0
";

pub const UPTIME: &str = "12345.67 98765.43\n";

pub const LOADAVG: &str = "0.52 0.58 0.59 2/1034 48213\n";

pub const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
  eth0: 100 0 0 0 0 0 0 0 200 0 0 0 0 0 0 0
";

pub const MEMINFO: &str = "\
MemTotal:       16318148 kB
MemFree:         1260532 kB
MemAvailable:    9431008 kB
SwapTotal:       2097148 kB
SwapFree:        2097148 kB
Mapped:           968024 kB
Shmem:            523092 kB
";

pub const VERSION: &str = "Linux version 6.8.0-45-generic (buildd@lcy02) #45-Ubuntu SMP\n";

/// Populate `root` with one well-formed copy of every pseudo-file the sources read
pub fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("net")).unwrap();
    fs::write(root.join("stat"), STAT).unwrap();
    fs::write(root.join("diskstats"), DISKSTATS).unwrap();
    fs::write(root.join("uptime"), UPTIME).unwrap();
    fs::write(root.join("loadavg"), LOADAVG).unwrap();
    fs::write(root.join("net/dev"), NET_DEV).unwrap();
    fs::write(root.join("meminfo"), MEMINFO).unwrap();
    fs::write(root.join("version"), VERSION).unwrap();
}

struct BrokenPipe;

impl Read for BrokenPipe {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "device went away"))
    }
}

/// Yields `good` and then fails every further read
pub fn failing_reader(good: &'static str) -> impl io::BufRead {
    BufReader::new(good.as_bytes().chain(BrokenPipe))
}
