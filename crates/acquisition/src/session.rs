//! Relay session loop
//!
//! Wires scheduler → estimator → command builder → sink. One frame is
//! processed completely before the next ready check.

use std::time::{Duration, Instant};

use contracts::{
    CommandLayout, ContractError, Frame, RangingDevice, SessionBlueprint, TelemetryCommand,
    TelemetrySink, SHUTDOWN_VALUE,
};
use estimator::{LevelReading, LiquidLevelEstimator};
use observability::{LevelStatsAggregator, LevelSummary};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::bringup::SensorBringUp;
use crate::error::Result;
use crate::scheduler::{AcquisitionScheduler, SchedulerConfig, SchedulerCounters, StopHandle};

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Frame bound reached
    Completed,
    /// Stop flag raised
    Stopped,
    /// Bus or device failure
    Failed,
}

/// End-of-session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub termination: Termination,
    pub frames: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
    pub scheduler: SchedulerCounters,
    pub levels: LevelSummary,
    pub last_reading: Option<LevelReading>,
    pub elapsed: Duration,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(f, "Termination: {:?}", self.termination)?;
        writeln!(f, "Frames: {}", self.frames)?;
        writeln!(
            f,
            "Commands sent: {} ({} failed)",
            self.commands_sent, self.send_failures
        )?;
        writeln!(
            f,
            "Polls: {} (transport errors {}, retries {})",
            self.scheduler.polls, self.scheduler.transport_errors, self.scheduler.retries
        )?;
        writeln!(f, "Elapsed: {:.2?}", self.elapsed)?;
        write!(f, "{}", self.levels)
    }
}

/// Relay session
///
/// Owns the device (through the scheduler), the estimator and the sink for
/// the duration of one run.
pub struct Session<D, S> {
    scheduler: AcquisitionScheduler<D>,
    estimator: Option<LiquidLevelEstimator>,
    sink: S,
    layout: CommandLayout,
    idle_value: i16,
    levels: LevelStatsAggregator,
    commands_sent: u64,
    send_failures: u64,
    last_reading: Option<LevelReading>,
    sleep_on_exit: bool,
}

impl<D, S> Session<D, S>
where
    D: RangingDevice,
    S: TelemetrySink,
{
    /// Session sending per-zone distances, without estimation
    pub fn new(scheduler: AcquisitionScheduler<D>, sink: S) -> Self {
        Self {
            scheduler,
            estimator: None,
            sink,
            layout: CommandLayout::Distances,
            idle_value: SHUTDOWN_VALUE,
            levels: LevelStatsAggregator::new(),
            commands_sent: 0,
            send_failures: 0,
            last_reading: None,
            sleep_on_exit: false,
        }
    }

    /// Build from a blueprint around a device that is already ranging
    pub fn from_blueprint(
        device: D,
        sink: S,
        blueprint: &SessionBlueprint,
    ) -> std::result::Result<Self, ContractError> {
        let scheduler =
            AcquisitionScheduler::new(device, SchedulerConfig::from(&blueprint.sensor));
        let mut session = Self::new(scheduler, sink)
            .with_command(blueprint.telemetry.command, blueprint.telemetry.idle_value)
            .with_sleep_on_exit(blueprint.sensor.sleep_on_exit);
        if blueprint.estimator.enabled {
            session = session.with_estimator(LiquidLevelEstimator::new(
                blueprint.sensor.resolution,
                blueprint.estimator.sensor_height_mm,
            )?);
        }
        Ok(session)
    }

    pub fn with_estimator(mut self, estimator: LiquidLevelEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Select the command layout and the idle value
    pub fn with_command(mut self, layout: CommandLayout, idle_value: i16) -> Self {
        self.layout = layout;
        self.idle_value = idle_value;
        self
    }

    /// Put the sensor to sleep once ranging has stopped
    pub fn with_sleep_on_exit(mut self, sleep_on_exit: bool) -> Self {
        self.sleep_on_exit = sleep_on_exit;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    pub fn scheduler(&self) -> &AcquisitionScheduler<D> {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run until the frame bound, a stop request or a device failure.
    ///
    /// Ranging is stopped and the shutdown command is sent on every exit
    /// path. The returned stats are also produced when the loop failed; the
    /// error is then returned alongside.
    #[instrument(name = "relay_session", skip(self), fields(sink = %self.sink.name()))]
    pub async fn run(&mut self) -> (SessionStats, Result<()>) {
        let started = Instant::now();
        info!(layout = ?self.layout, estimator = self.estimator.is_some(), "session started");

        let outcome = self.drive().await;
        self.finish().await;

        let termination = match &outcome {
            Err(_) => Termination::Failed,
            Ok(()) if self.scheduler.stop_handle().is_stopped() => Termination::Stopped,
            Ok(()) => Termination::Completed,
        };
        let stats = self.stats(termination, started.elapsed());
        info!(
            frames = stats.frames,
            sent = stats.commands_sent,
            send_failures = stats.send_failures,
            termination = ?stats.termination,
            "session finished"
        );
        (stats, outcome)
    }

    async fn drive(&mut self) -> Result<()> {
        while let Some(frame) = self.scheduler.next_frame().await? {
            self.process(&frame).await;
        }
        Ok(())
    }

    async fn process(&mut self, frame: &Frame) {
        let reading = self
            .estimator
            .as_ref()
            .and_then(|estimator| estimator.estimate(frame));
        let height_mm = reading.map(|r| r.height_mm);

        self.levels
            .update(height_mm, self.scheduler.last_poll_count());
        observability::record_liquid_height(height_mm);
        self.last_reading = reading.or(self.last_reading);

        if tracing::enabled!(tracing::Level::TRACE) {
            let statuses: Vec<u8> = frame.zones.iter().map(|z| z.target_status.code()).collect();
            let distances: Vec<i16> = frame.zones.iter().map(|z| z.distance_mm).collect();
            trace!(?statuses, ?distances, "raw frame");
        }
        match reading {
            Some(reading) => debug!(
                cycle = self.scheduler.cycle_count(),
                height_mm = reading.height_mm,
                zone = reading.zone,
                signal = reading.signal_per_spad,
                within_mount = reading.is_within_mount(),
                "liquid level"
            ),
            None if self.estimator.is_some() => {
                debug!(cycle = self.scheduler.cycle_count(), "no qualifying zone")
            }
            None => {}
        }

        let command = TelemetryCommand::build(self.layout, frame, height_mm, self.idle_value);
        self.send(&command).await;
    }

    async fn send(&mut self, command: &TelemetryCommand) -> bool {
        match self.sink.send(command).await {
            Ok(()) => {
                self.commands_sent += 1;
                observability::record_telemetry_sent(self.sink.name(), true);
                true
            }
            Err(err) => {
                self.send_failures += 1;
                observability::record_telemetry_sent(self.sink.name(), false);
                warn!(error = %err, "telemetry send failed, frame dropped");
                false
            }
        }
    }

    async fn finish(&mut self) {
        self.scheduler.stop();
        if self.sleep_on_exit {
            SensorBringUp::power_down(self.scheduler.device_mut());
        } else {
            SensorBringUp::shutdown(self.scheduler.device_mut());
        }

        if self.send(&TelemetryCommand::shutdown()).await {
            debug!("shutdown command sent");
        }
        if let Err(err) = self.sink.close().await {
            error!(error = %err, "failed to close sink");
        }
    }

    fn stats(&self, termination: Termination, elapsed: Duration) -> SessionStats {
        SessionStats {
            termination,
            frames: self.scheduler.cycle_count(),
            commands_sent: self.commands_sent,
            send_failures: self.send_failures,
            scheduler: self.scheduler.counters(),
            levels: self.levels.summary(),
            last_reading: self.last_reading,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedSensor;
    use contracts::{Resolution, SimulationConfig};

    /// Records commands, optionally failing every other send
    #[derive(Default)]
    struct CaptureSink {
        commands: Vec<TelemetryCommand>,
        flaky: bool,
        attempts: u32,
        closed: bool,
    }

    impl TelemetrySink for CaptureSink {
        fn name(&self) -> &str {
            "capture"
        }

        async fn send(&mut self, command: &TelemetryCommand) -> std::result::Result<(), ContractError> {
            self.attempts += 1;
            if self.flaky && self.attempts % 2 == 0 {
                return Err(ContractError::network("capture", "link down"));
            }
            self.commands.push(*command);
            Ok(())
        }

        async fn close(&mut self) -> std::result::Result<(), ContractError> {
            self.closed = true;
            Ok(())
        }
    }

    fn ranging_sensor(surface_distance_mm: i16) -> SimulatedSensor {
        let mut sensor = SimulatedSensor::from_config(&SimulationConfig {
            surface_distance_mm,
            ready_after_polls: 1,
        });
        SensorBringUp::new(Resolution::R8x8, 15)
            .bring_up(&mut sensor)
            .unwrap();
        sensor
    }

    fn scheduler(sensor: SimulatedSensor, max_frames: u64) -> AcquisitionScheduler<SimulatedSensor> {
        AcquisitionScheduler::new(
            sensor,
            SchedulerConfig {
                poll_interval: Duration::from_millis(1),
                max_frames: Some(max_frames),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_level_commands_then_shutdown() {
        let mut session = Session::new(scheduler(ranging_sensor(50), 3), CaptureSink::default())
            .with_estimator(LiquidLevelEstimator::new(Resolution::R8x8, 216).unwrap())
            .with_command(CommandLayout::LiquidLevel, SHUTDOWN_VALUE);

        let (stats, outcome) = session.run().await;
        outcome.unwrap();

        assert_eq!(stats.termination, Termination::Completed);
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.commands_sent, 4);
        assert_eq!(stats.last_reading.map(|r| r.height_mm), Some(166));

        let sink = session.sink();
        assert!(sink.closed);
        assert_eq!(sink.commands.len(), 4);
        assert!(sink.commands[..3]
            .iter()
            .all(|cmd| cmd.values().iter().all(|v| *v == 166)));
        assert_eq!(sink.commands[3], TelemetryCommand::shutdown());
        assert!(!session.scheduler().device().is_ranging());
    }

    #[tokio::test]
    async fn test_send_failures_do_not_stop_the_loop() {
        let sink = CaptureSink {
            flaky: true,
            ..Default::default()
        };
        let mut session = Session::new(scheduler(ranging_sensor(80), 4), sink);

        let (stats, outcome) = session.run().await;
        outcome.unwrap();

        assert_eq!(stats.frames, 4);
        // 4 frames + shutdown, every second attempt fails
        assert_eq!(stats.commands_sent, 3);
        assert_eq!(stats.send_failures, 2);
    }

    #[tokio::test]
    async fn test_distance_layout_pools_grid() {
        let mut session = Session::new(scheduler(ranging_sensor(50), 1), CaptureSink::default());

        let (_, outcome) = session.run().await;
        outcome.unwrap();

        let first = session.sink().commands[0];
        // block 5 covers centre zones 18, 19, 26, 27
        assert_eq!(first.values()[5], 50);
        // block 0 holds an empty corner (distance 0) and rim zones
        assert_eq!(first.values()[0], 0);
    }

    #[tokio::test]
    async fn test_device_failure_still_sends_shutdown() {
        let sensor = ranging_sensor(50);
        let bus = sensor.bus().clone();
        let mut session = Session::new(scheduler(sensor, 100), CaptureSink::default());

        bus.fail_next(1);
        let (stats, outcome) = session.run().await;

        assert!(outcome.unwrap_err().is_transport());
        assert_eq!(stats.termination, Termination::Failed);
        assert_eq!(stats.frames, 0);
        assert_eq!(session.sink().commands, vec![TelemetryCommand::shutdown()]);
    }

    #[tokio::test]
    async fn test_sleep_on_exit_puts_sensor_to_sleep() {
        let mut session = Session::new(scheduler(ranging_sensor(50), 1), CaptureSink::default())
            .with_sleep_on_exit(true);

        let (_, outcome) = session.run().await;
        outcome.unwrap();

        let sensor = session.scheduler().device();
        assert!(!sensor.is_ranging());
        assert!(sensor.is_asleep());
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let mut session = Session::new(scheduler(ranging_sensor(50), 100), CaptureSink::default());
        session.stop_handle().stop();

        let (stats, outcome) = session.run().await;
        outcome.unwrap();
        assert_eq!(stats.termination, Termination::Stopped);
        assert_eq!(stats.frames, 0);
    }
}
