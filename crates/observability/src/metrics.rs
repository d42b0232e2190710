//! Relay metrics
//!
//! Recorders for the `metrics` facade plus an in-memory aggregator that
//! summarises a run.

use metrics::{counter, gauge, histogram};

/// Histogram of ready checks per frame
pub const POLLS_PER_FRAME: &str = "tof_relay_polls_per_frame";

/// Histogram of estimated liquid heights
pub const LIQUID_HEIGHT_HIST: &str = "tof_relay_liquid_height_mm_hist";

/// Record one acquired frame
///
/// `polls` is the number of ready checks it took, `usable_zones` the zones
/// with a trusted target.
pub fn record_frame_acquired(polls: u32, usable_zones: usize) {
    counter!("tof_relay_frames_acquired_total").increment(1);
    histogram!(POLLS_PER_FRAME).record(f64::from(polls));
    gauge!("tof_relay_usable_zones").set(usable_zones as f64);
}

/// Record a failed bus operation
pub fn record_transport_error(operation: &str) {
    counter!(
        "tof_relay_transport_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record the estimated liquid height, or a frame without a reading
pub fn record_liquid_height(height_mm: Option<i32>) {
    match height_mm {
        Some(height) => {
            gauge!("tof_relay_liquid_height_mm").set(f64::from(height));
            histogram!(LIQUID_HEIGHT_HIST).record(f64::from(height));
        }
        None => counter!("tof_relay_frames_without_level_total").increment(1),
    }
}

/// Record one telemetry send attempt
pub fn record_telemetry_sent(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "tof_relay_telemetry_sent_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Level statistics aggregated over a run
#[derive(Debug, Clone, Default)]
pub struct LevelStatsAggregator {
    /// Frames seen
    pub total_frames: u64,

    /// Frames without a qualifying zone
    pub frames_without_level: u64,

    /// Readings whose surface lies beyond the mounting height
    pub out_of_mount: u64,

    /// Liquid height (mm)
    pub height_stats: RunningStats,

    /// Ready checks per frame
    pub poll_stats: RunningStats,
}

impl LevelStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one frame
    pub fn update(&mut self, height_mm: Option<i32>, polls: u32) {
        self.total_frames += 1;
        self.poll_stats.push(f64::from(polls));

        match height_mm {
            Some(height) => {
                if height < 0 {
                    self.out_of_mount += 1;
                }
                self.height_stats.push(f64::from(height));
            }
            None => self.frames_without_level += 1,
        }
    }

    /// Build the summary report
    pub fn summary(&self) -> LevelSummary {
        LevelSummary {
            total_frames: self.total_frames,
            frames_without_level: self.frames_without_level,
            out_of_mount: self.out_of_mount,
            coverage: if self.total_frames > 0 {
                (self.total_frames - self.frames_without_level) as f64 / self.total_frames as f64
                    * 100.0
            } else {
                0.0
            },
            height_mm: StatsSummary::from(&self.height_stats),
            polls_per_frame: StatsSummary::from(&self.poll_stats),
        }
    }
}

/// Level summary
#[derive(Debug, Clone, Default)]
pub struct LevelSummary {
    pub total_frames: u64,
    pub frames_without_level: u64,
    pub out_of_mount: u64,
    /// Share of frames with a reading (%)
    pub coverage: f64,
    pub height_mm: StatsSummary,
    pub polls_per_frame: StatsSummary,
}

impl std::fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Liquid Level Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Frames with a reading: {} ({:.2}%)",
            self.total_frames - self.frames_without_level,
            self.coverage
        )?;
        writeln!(f, "Readings beyond mount: {}", self.out_of_mount)?;
        writeln!(f, "Height (mm): {}", self.height_mm)?;
        writeln!(f, "Polls per frame: {}", self.polls_per_frame)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
