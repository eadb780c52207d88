// LOADSLOT EVENT LOG
// RECORDS ESTIMATOR SNAPSHOTS DURING A MONITOR SESSION
// PRE-ALLOCATED RING BUFFER. NO HEAP ALLOCATION DURING MONITORING.
// WRAPS AROUND AT CAPACITY -- OLDEST ENTRIES OVERWRITTEN. NEVER PERSISTED.

const MAX_SNAPSHOTS: usize = 8192;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub time:          f64,
    pub instantaneous: f64,
    pub average:       f64,
    pub error:         f64,
    pub available:     u32,
    pub threshold:     f64,
}

pub struct EventLog {
    snapshots: Vec<Snapshot>,
    head:      usize,
    len:       usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            snapshots: vec![Snapshot::default(); MAX_SNAPSHOTS],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // RECORD ONE SNAPSHOT. CALLED ONCE PER TICK FROM THE MONITOR LOOP.
    // OVERWRITES OLDEST ENTRY WHEN FULL.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.snapshots[self.head] = snapshot;
        self.head = (self.head + 1) % MAX_SNAPSHOTS;
        if self.len < MAX_SNAPSHOTS {
            self.len += 1;
        }
    }

    // ITERATE SNAPSHOTS IN CHRONOLOGICAL ORDER
    pub fn iter_chronological(&self) -> impl Iterator<Item = &Snapshot> {
        let start = if self.len < MAX_SNAPSHOTS { 0 } else { self.head };
        (0..self.len).map(move |i| {
            &self.snapshots[(start + i) % MAX_SNAPSHOTS]
        })
    }

    // NUMBER OF TIMES available WENT DOWN / UP BETWEEN CONSECUTIVE SNAPSHOTS
    pub fn transitions(&self) -> (u64, u64) {
        let mut down = 0u64;
        let mut up = 0u64;
        let mut prev: Option<u32> = None;
        for s in self.iter_chronological() {
            if let Some(p) = prev {
                if s.available < p {
                    down += 1;
                } else if s.available > p {
                    up += 1;
                }
            }
            prev = Some(s.available);
        }
        (down, up)
    }

    // PRINT THE FULL TABLE, OLDEST FIRST
    pub fn dump(&self) {
        let mut iter = self.iter_chronological();
        let first = match iter.next() {
            Some(s) => s,
            None => return,
        };
        let base_time = first.time;

        println!("\n{:<10} {:<10} {:<10} {:<10} {:<10} {:<10}",
            "TIME_S", "INSTANT", "AVERAGE", "ERROR", "AVAIL", "THRESH");
        println!("{}", "-".repeat(64));

        for s in std::iter::once(first).chain(iter) {
            println!("{:<10.1} {:<10.3} {:<10.3} {:<10.3} {:<10} {:<10.2}",
                s.time - base_time, s.instantaneous, s.average,
                s.error, s.available, s.threshold);
        }

        if self.len == MAX_SNAPSHOTS {
            println!("\n(RING BUFFER WRAPPED -- SHOWING MOST RECENT {} SNAPSHOTS)", MAX_SNAPSHOTS);
        }
        println!("TOTAL SNAPSHOTS: {}", self.len);
    }

    // SUMMARY STATISTICS
    pub fn summary(&self) {
        if self.len < 2 {
            return;
        }

        let snapshots: Vec<&Snapshot> = self.iter_chronological().collect();

        let mean_load = snapshots.iter().map(|s| s.average).sum::<f64>() / snapshots.len() as f64;
        let peak_load = snapshots.iter().map(|s| s.instantaneous).fold(0.0, f64::max);
        let min_avail = snapshots.iter().map(|s| s.available).min().unwrap_or(0);
        let max_avail = snapshots.iter().map(|s| s.available).max().unwrap_or(0);
        let (shed, granted) = self.transitions();

        let elapsed_s = snapshots[snapshots.len() - 1].time - snapshots[0].time;

        println!("\n{}", "=".repeat(50));
        println!("LOADSLOT SUMMARY");
        println!("{}", "=".repeat(50));
        println!("  MEAN LOAD:         {:.2} cores", mean_load);
        println!("  PEAK INSTANT LOAD: {:.2} cores", peak_load);
        println!("  AVAILABLE RANGE:   {}..={}", min_avail, max_avail);
        println!("  SLOTS SHED:        {}", shed);
        println!("  SLOTS GRANTED:     {}", granted);
        println!("  ELAPSED:           {:.1}s", elapsed_s);
        println!("  SAMPLES:           {}", self.len);
    }
}
