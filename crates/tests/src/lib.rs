//! # Integration Tests
//!
//! End-to-end tests across the relay crates.
//!
//! Covers:
//! - Contract smoke tests
//! - Simulated sensor → estimator → UDP/HTTP sink
//! - Configuration file → running session

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::TelemetryCommand::shutdown().values()[0], 4000);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use acquisition::{
        AcquisitionScheduler, SchedulerConfig, SensorBringUp, Session, SimulatedSensor,
        Termination,
    };
    use contracts::{
        CommandLayout, Resolution, SimulationConfig, SinkType, TelemetryConfig, SHUTDOWN_VALUE,
    };
    use estimator::LiquidLevelEstimator;
    use telemetry::{create_sender, DATAGRAM_LEN};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, UdpSocket};

    const SENSOR_HEIGHT_MM: i32 = 216;
    const SURFACE_DISTANCE_MM: i16 = 50;

    fn ranging_sensor() -> SimulatedSensor {
        let mut sensor = SimulatedSensor::from_config(&SimulationConfig {
            surface_distance_mm: SURFACE_DISTANCE_MM,
            ready_after_polls: 3,
        });
        SensorBringUp::new(Resolution::R8x8, 15)
            .bring_up(&mut sensor)
            .unwrap();
        sensor
    }

    fn scheduler(max_frames: u64) -> AcquisitionScheduler<SimulatedSensor> {
        AcquisitionScheduler::new(
            ranging_sensor(),
            SchedulerConfig {
                poll_interval: Duration::from_millis(1),
                max_frames: Some(max_frames),
                ..Default::default()
            },
        )
    }

    fn telemetry_config(sink_type: SinkType, addr: &str) -> TelemetryConfig {
        TelemetryConfig {
            name: "actuator".to_string(),
            sink_type,
            command: CommandLayout::LiquidLevel,
            idle_value: SHUTDOWN_VALUE,
            params: HashMap::from([("addr".to_string(), addr.to_string())]),
        }
    }

    fn decode_datagram(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// Simulated sensor → scheduler → estimator → UDP datagram
    ///
    /// Three not-ready polls, then a frame with the surface 50 mm below a
    /// sensor mounted 216 mm above the floor.
    #[tokio::test]
    async fn test_e2e_level_over_udp() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap().to_string();

        let sender = create_sender(&telemetry_config(SinkType::Udp, &addr))
            .await
            .unwrap();
        let mut session = Session::new(scheduler(1), sender)
            .with_estimator(LiquidLevelEstimator::new(Resolution::R8x8, SENSOR_HEIGHT_MM).unwrap())
            .with_command(CommandLayout::LiquidLevel, SHUTDOWN_VALUE);

        let (stats, outcome) = session.run().await;
        outcome.unwrap();

        assert_eq!(stats.termination, Termination::Completed);
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.scheduler.polls, 4);
        assert_eq!(stats.last_reading.map(|r| r.height_mm), Some(166));

        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(len, DATAGRAM_LEN);
        assert_eq!(decode_datagram(&buf[..len]), vec![166; 16]);

        // shutdown command follows on exit
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_datagram(&buf[..len]), vec![SHUTDOWN_VALUE; 16]);

        let snapshot = session.sink().snapshot();
        assert_eq!(snapshot.send_count, 2);
        assert_eq!(snapshot.bytes_sent, 2 * DATAGRAM_LEN as u64);
    }

    /// Read one request (headers plus `Content-Length` body) and answer 200
    async fn serve_one(listener: &TcpListener) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text
                    .lines()
                    .find_map(|line| line.strip_prefix("Content-Length: "))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        stream
            .write_all(b"HTTP/1.0 200 OK\r\n\r\n")
            .await
            .unwrap();
        String::from_utf8(request).unwrap()
    }

    #[tokio::test]
    async fn test_e2e_level_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let first = serve_one(&listener).await;
            let second = serve_one(&listener).await;
            (first, second)
        });

        let sender = create_sender(&telemetry_config(SinkType::Http, &addr))
            .await
            .unwrap();
        let mut session = Session::new(scheduler(1), sender)
            .with_estimator(LiquidLevelEstimator::new(Resolution::R8x8, SENSOR_HEIGHT_MM).unwrap())
            .with_command(CommandLayout::LiquidLevel, SHUTDOWN_VALUE);

        let (stats, outcome) = session.run().await;
        outcome.unwrap();
        assert_eq!(stats.commands_sent, 2);

        let (first, second) = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();

        let body = vec!["166"; 16].join(",");
        assert!(first.starts_with("POST / HTTP/1.0\r\n"));
        assert!(first.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(first.ends_with(&format!("\r\n\r\n{body}")));
        assert!(second.ends_with(&vec!["4000"; 16].join(",")));
    }

    /// A UDP target with no listener never stops the loop
    #[tokio::test]
    async fn test_e2e_unreachable_target_does_not_stop_acquisition() {
        let unused = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = unused.local_addr().unwrap().to_string();
        drop(unused);

        let sender = create_sender(&telemetry_config(SinkType::Udp, &addr))
            .await
            .unwrap();
        let mut session = Session::new(scheduler(3), sender)
            .with_estimator(LiquidLevelEstimator::new(Resolution::R8x8, SENSOR_HEIGHT_MM).unwrap());

        let (stats, outcome) = session.run().await;
        outcome.unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.levels.total_frames, 3);
        // three frames plus shutdown, whether or not the kernel reported refusals
        assert_eq!(stats.commands_sent + stats.send_failures, 4);
    }

    /// Configuration text → validated blueprint → running session
    #[tokio::test]
    async fn test_config_to_session() {
        let content = r#"
[sensor]
resolution = "4x4"
ranging_frequency_hz = 30
poll_interval_ms = 1
max_frames = 2

[estimator]
sensor_height_mm = 216

[simulation]
surface_distance_mm = 120
ready_after_polls = 0

[telemetry]
name = "bench"
sink_type = "log"
command = "liquid_level"
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mut device = SimulatedSensor::from_config(&blueprint.simulation);
        SensorBringUp::from_config(&blueprint.sensor)
            .bring_up(&mut device)
            .unwrap();
        let sender = create_sender(&blueprint.telemetry).await.unwrap();

        let mut session = acquisition::Session::from_blueprint(device, sender, &blueprint).unwrap();
        let (stats, outcome) = session.run().await;
        outcome.unwrap();

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.scheduler.polls, 2);
        assert_eq!(stats.last_reading.map(|r| r.height_mm), Some(96));
        assert!(!session.scheduler().device().is_ranging());
    }

    /// Crosstalk calibration on the simulated sensor decodes to one block of each kind
    #[test]
    fn test_xtalk_calibration_round_trip() {
        use calibration::{CalibrationBuffer, DecodedCalibration, XTALK_BUFFER_SIZE};
        use contracts::RangingDevice;

        let mut sensor = ranging_sensor();
        SensorBringUp::shutdown(&mut sensor);
        sensor.calibrate_xtalk(3, 4, 600).unwrap();

        let blob = sensor.get_caldata_xtalk().unwrap();
        assert_eq!(blob.len(), XTALK_BUFFER_SIZE);

        let buffer = CalibrationBuffer::new(blob).unwrap();
        let decoded = DecodedCalibration::from_blocks(buffer.decode(Resolution::R8x8));
        assert!(decoded.shape_bins().is_some());
        assert_eq!(decoded.signal_grid().map(<[u32]>::len), Some(64));
    }
}
