//! Relay run statistics.

use acquisition::SessionStats;
use telemetry::MetricsSnapshot;

/// Statistics from a relay run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Session counters and level summary
    pub session: SessionStats,

    /// Counters of the telemetry sender
    pub sink: MetricsSnapshot,
}

impl PipelineStats {
    /// Frames per second over the whole session
    pub fn fps(&self) -> f64 {
        let secs = self.session.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.session.frames as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of send attempts that failed, as a percentage
    pub fn send_failure_rate(&self) -> f64 {
        let total = self.sink.send_count + self.sink.failure_count;
        if total > 0 {
            (self.sink.failure_count as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        println!("{}", self.session);
        println!("=== Telemetry ===");
        println!("Sent: {}", self.sink.send_count);
        println!(
            "Failed: {} ({:.2}%)",
            self.sink.failure_count,
            self.send_failure_rate()
        );
        println!("Bytes: {}", self.sink.bytes_sent);
        println!("FPS: {:.2}", self.fps());
        println!();
    }
}
