//! Sensor stream client - persistent channel to the measurement service
//!
//! The service pushes one event per stage per second as newline-delimited
//! JSON over a plain TCP connection. The client forwards parsed readings to
//! the sequencer over a bounded channel and reports every connect failure or
//! dropped connection as `ConnectionLost` (which the sequencer escalates).
//! It keeps redialing after a drop so the transport can heal for a later
//! session, and stops only on the teardown signal.

use crate::domain::types::{Reading, SensorMessage, StreamEvent};
use crate::infra::config::Config;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub struct SensorStreamClient {
    addr: String,
    reconnect_delay: Duration,
}

impl SensorStreamClient {
    pub fn new(config: &Config) -> Self {
        Self {
            addr: config.sensor_addr().to_string(),
            reconnect_delay: config.sensor_reconnect_delay(),
        }
    }

    /// Run until the teardown signal fires or the event channel closes
    pub async fn run(&self, event_tx: mpsc::Sender<StreamEvent>, mut teardown: watch::Receiver<bool>) {
        loop {
            if *teardown.borrow() {
                info!("sensor_stream_teardown");
                return;
            }

            let connect = tokio::select! {
                _ = teardown.changed() => continue,
                result = TcpStream::connect(&self.addr) => result,
            };

            let stream = match connect {
                Ok(stream) => {
                    info!(addr = %self.addr, "sensor_stream_connected");
                    stream
                }
                Err(e) => {
                    error!(addr = %self.addr, error = %e, "sensor_stream_connect_failed");
                    if event_tx.send(StreamEvent::ConnectionLost).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(self.reconnect_delay).await;
                    continue;
                }
            };

            if !self.read_events(stream, &event_tx, &mut teardown).await {
                return;
            }

            // Connection dropped; report and redial after a delay
            if event_tx.send(StreamEvent::ConnectionLost).await.is_err() {
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Read events from an established connection.
    /// Returns false when the client should stop (teardown or channel closed),
    /// true when the connection dropped and a redial is wanted.
    async fn read_events(
        &self,
        mut stream: TcpStream,
        event_tx: &mpsc::Sender<StreamEvent>,
        teardown: &mut watch::Receiver<bool>,
    ) -> bool {
        let mut buf = [0u8; 4096];
        let mut acc = BytesMut::with_capacity(4096);

        loop {
            tokio::select! {
                _ = teardown.changed() => {
                    if *teardown.borrow() {
                        info!("sensor_stream_teardown");
                        return false;
                    }
                }
                result = stream.read(&mut buf) => {
                    let n = match result {
                        Ok(0) => {
                            warn!("sensor_stream_closed");
                            return true;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            error!(error = %e, "sensor_stream_read_error");
                            return true;
                        }
                    };

                    acc.extend_from_slice(&buf[..n]);

                    for reading in drain_readings(&mut acc, Instant::now()) {
                        match event_tx.try_send(StreamEvent::Reading(reading)) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                // 64 slots against a one-per-second cadence:
                                // a full channel means the sequencer stopped
                                // draining. Shedding the newest reading here
                                // loses one second of progress at most.
                                warn!("sensor_event_dropped: channel full");
                            }
                            Err(TrySendError::Closed(_)) => {
                                debug!("event channel closed");
                                return false;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Upper bound on one buffered line. A peer streaming bytes with no newline
/// past this point gets the partial line discarded instead of growing the
/// accumulator without limit.
const MAX_LINE_BYTES: usize = 16 * 1024;

/// Split complete lines out of the accumulator and parse them into readings.
/// Any trailing partial line stays buffered, subject to `MAX_LINE_BYTES`.
fn drain_readings(acc: &mut BytesMut, received_at: Instant) -> Vec<Reading> {
    let mut readings = Vec::new();

    while let Some(pos) = acc.iter().position(|&b| b == b'\n') {
        let line = acc.split_to(pos + 1);
        match std::str::from_utf8(&line[..pos]) {
            Ok(text) => {
                if let Some(reading) = parse_sensor_line(text, received_at) {
                    readings.push(reading);
                }
            }
            Err(_) => warn!("sensor_stream_invalid_utf8"),
        }
    }

    if acc.len() > MAX_LINE_BYTES {
        warn!(bytes = %acc.len(), "sensor_line_overlong_discarded");
        acc.clear();
    }

    readings
}

/// Parse one line of the sensor feed into a reading
pub fn parse_sensor_line(line: &str, received_at: Instant) -> Option<Reading> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let message: SensorMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "sensor_line_parse_failed");
            return None;
        }
    };

    let reading = message.into_reading(received_at);
    if reading.is_none() {
        debug!(line = %line, "sensor_event_ignored");
    }
    reading
}
