// LINUX: AGGREGATE "cpu" LINE OF /proc/stat
// cpu  user nice system idle iowait irq softirq steal ...
// BUSY = user + nice + system, TICKS = BUSY + idle. UNIT: USER_HZ JIFFIES.

use std::path::{Path, PathBuf};

use regex::Regex;

use super::{now_secs, Sample, SampleSource};
use crate::error::{LoadError, LoadResult};

pub const PROC_STAT_PATH: &str = "/proc/stat";

// FIRST FOUR COUNTERS OF THE AGGREGATE LINE. PER-CPU LINES ("cpu0 ...")
// NEVER MATCH BECAUSE A BLANK MUST FOLLOW "cpu". FIELDS NEVER SPAN LINES.
const CPU_LINE: &str = r"(?m)^cpu[ \t]+(\d+)[ \t]+(\d+)[ \t]+(\d+)[ \t]+(\d+)";

pub struct ProcStat {
    path: PathBuf,
    cpu_line: Regex,
}

impl ProcStat {
    pub fn new() -> LoadResult<Self> {
        Self::with_path(PROC_STAT_PATH)
    }

    pub fn with_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let cpu_line = Regex::new(CPU_LINE)
            .map_err(|e| LoadError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            cpu_line,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for ProcStat {
    fn poll(&mut self) -> LoadResult<Sample> {
        let time = now_secs();
        let raw = std::fs::read_to_string(&self.path)?;
        let (busy, ticks) = parse_proc_stat(&raw, &self.cpu_line)?;
        Ok(Sample { busy, ticks, time })
    }
}

// EXTRACT (busy, ticks) FROM /proc/stat CONTENT
pub fn parse_proc_stat(raw: &str, cpu_line: &Regex) -> LoadResult<(f64, f64)> {
    let caps = cpu_line.captures(raw).ok_or_else(|| {
        LoadError::SourceUnavailable("no aggregate cpu line in /proc/stat".to_string())
    })?;

    let mut fields = [0u64; 4];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = caps[i + 1]
            .parse()
            .map_err(|e| LoadError::SourceUnavailable(format!("bad /proc/stat counter: {e}")))?;
    }
    let [user, nice, system, idle] = fields;

    let busy = (user + nice + system) as f64;
    Ok((busy, busy + idle as f64))
}
