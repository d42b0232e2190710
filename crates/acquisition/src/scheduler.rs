//! Frame acquisition scheduler
//!
//! Drives a [`RangingDevice`] through `Idle → Polling → FrameReady → Polling`
//! until the frame bound, a stop request or a bus failure moves it to
//! `Stopped`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{Frame, RangingDevice, SensorConfig};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AcquisitionError, Result};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    FrameReady,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::FrameReady => "frame-ready",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Cloneable stop flag
///
/// The scheduler looks at it once per loop iteration; an in-flight bus
/// transaction always completes first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between ready checks
    pub poll_interval: Duration,

    /// Frames to acquire before stopping (None = unbounded)
    pub max_frames: Option<u64>,

    /// Extra attempts for a ready check that failed on the bus
    pub transport_retries: u32,

    /// Delay before the first retry, doubled on every further retry
    pub retry_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            max_frames: None,
            transport_retries: 0,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

impl From<&SensorConfig> for SchedulerConfig {
    fn from(sensor: &SensorConfig) -> Self {
        Self {
            poll_interval: sensor.poll_interval(),
            max_frames: sensor.max_frames(),
            transport_retries: sensor.transport_retries,
            ..Default::default()
        }
    }
}

/// Counters kept by the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerCounters {
    /// Ready checks issued
    pub polls: u64,
    /// Frames handed out
    pub frames: u64,
    /// Failed bus operations
    pub transport_errors: u64,
    /// Ready checks retried after a bus failure
    pub retries: u64,
}

/// Frame acquisition scheduler
pub struct AcquisitionScheduler<D> {
    device: D,
    config: SchedulerConfig,
    state: SchedulerState,
    stop: StopHandle,
    counters: SchedulerCounters,
    polls_this_cycle: u32,
    last_poll_count: u32,
}

impl<D: RangingDevice> AcquisitionScheduler<D> {
    /// Create an idle scheduler around a device that is already ranging
    pub fn new(device: D, config: SchedulerConfig) -> Self {
        Self {
            device,
            config,
            state: SchedulerState::Idle,
            stop: StopHandle::new(),
            counters: SchedulerCounters::default(),
            polls_this_cycle: 0,
            last_poll_count: 0,
        }
    }

    /// Share an existing stop flag
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// `Idle → Polling`
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(SchedulerState::Idle, "start")?;
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_frames = ?self.config.max_frames,
            "acquisition started"
        );
        self.state = SchedulerState::Polling;
        Ok(())
    }

    /// Ask the device whether a frame is waiting.
    ///
    /// `true` moves the scheduler to `FrameReady`. A bus failure is retried
    /// up to `transport_retries` times with exponential backoff, after which
    /// the scheduler stops and the error is returned.
    pub async fn check_ready(&mut self) -> Result<bool> {
        self.expect_state(SchedulerState::Polling, "check ready")?;
        self.polls_this_cycle += 1;
        self.counters.polls += 1;

        let mut attempt = 0u32;
        loop {
            match self.device.check_data_ready() {
                Ok(true) => {
                    self.state = SchedulerState::FrameReady;
                    return Ok(true);
                }
                Ok(false) => return Ok(false),
                Err(err) => {
                    if err.is_transport() {
                        self.counters.transport_errors += 1;
                        observability::record_transport_error("check_data_ready");
                    }
                    if err.is_transport() && attempt < self.config.transport_retries {
                        let delay = self.backoff(attempt);
                        attempt += 1;
                        self.counters.retries += 1;
                        warn!(
                            attempt,
                            max_retries = self.config.transport_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "ready check failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    error!(error = %err, "ready check failed, stopping acquisition");
                    self.state = SchedulerState::Stopped;
                    return Err(err.into());
                }
            }
        }
    }

    /// Fetch the waiting frame and hand it out.
    ///
    /// Advances the cycle count, then either re-enters `Polling` or stops when
    /// the frame bound is reached.
    pub fn fetch_frame(&mut self) -> Result<Frame> {
        self.expect_state(SchedulerState::FrameReady, "fetch frame")?;

        let frame = match self.device.get_ranging_data() {
            Ok(frame) => frame,
            Err(err) => {
                if err.is_transport() {
                    self.counters.transport_errors += 1;
                    observability::record_transport_error("get_ranging_data");
                }
                error!(error = %err, "frame fetch failed, stopping acquisition");
                self.state = SchedulerState::Stopped;
                return Err(err.into());
            }
        };

        self.counters.frames += 1;
        self.last_poll_count = self.polls_this_cycle;
        self.polls_this_cycle = 0;
        observability::record_frame_acquired(self.last_poll_count, frame.usable_zone_count());

        debug!(
            cycle = self.counters.frames,
            stream_count = frame.stream_count,
            polls = self.last_poll_count,
            "frame fetched"
        );

        self.state = if self.bound_reached() {
            info!(frames = self.counters.frames, "frame bound reached");
            SchedulerState::Stopped
        } else {
            SchedulerState::Polling
        };
        Ok(frame)
    }

    /// Poll until the next frame arrives.
    ///
    /// Returns `None` once the scheduler has stopped. Starts an idle
    /// scheduler.
    #[instrument(name = "acquisition_next_frame", skip(self), fields(cycle = self.counters.frames))]
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.state == SchedulerState::Idle {
            self.start()?;
        }

        loop {
            if self.stop.is_stopped() && self.state != SchedulerState::Stopped {
                info!(frames = self.counters.frames, "stop requested");
                self.state = SchedulerState::Stopped;
            }

            match self.state {
                SchedulerState::Stopped => return Ok(None),
                SchedulerState::FrameReady => return self.fetch_frame().map(Some),
                SchedulerState::Polling => {
                    if self.check_ready().await? {
                        return self.fetch_frame().map(Some);
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                SchedulerState::Idle => {
                    return Err(AcquisitionError::InvalidState {
                        operation: "poll",
                        state: self.state,
                    })
                }
            }
        }
    }

    /// Move to `Stopped`
    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Frames handed out so far
    pub fn cycle_count(&self) -> u64 {
        self.counters.frames
    }

    /// Ready checks it took to get the last frame
    pub fn last_poll_count(&self) -> u32 {
        self.last_poll_count
    }

    pub fn counters(&self) -> SchedulerCounters {
        self.counters
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    fn bound_reached(&self) -> bool {
        self.config
            .max_frames
            .is_some_and(|max| self.counters.frames >= max)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn expect_state(&self, expected: SchedulerState, operation: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(AcquisitionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}
