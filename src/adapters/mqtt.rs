//! MQTT cloud transport.
//!
//! | Topic                 | Direction | Payload                     |
//! |-----------------------|-----------|-----------------------------|
//! | `<prefix>/desired`    | in        | desired configuration       |
//! | `<prefix>/reported`   | out       | [`ReportedState`], retained |
//! | `<prefix>/telemetry`  | out       | [`TelemetryRecord`]         |
//!
//! A background thread drives the rumqttc connection, re-subscribes on
//! every ConnAck and hands incoming desired documents to the
//! [`ConfigInbox`].  Publishing never blocks the loop: a record counts as
//! delivered when it was queued while the broker connection was up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{Client, Connection, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use serde_json::Value;

use crate::app::inbox::ConfigInbox;
use crate::app::ports::CloudPort;
use crate::app::reports::{ReportedState, TelemetryRecord};
use crate::config::MqttConfig;

/// Outgoing request queue depth.
const REQUEST_CAPACITY: usize = 10;
/// Back-off after a connection error before the next attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Topic names under one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub desired: String,
    pub reported: String,
    pub telemetry: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            desired: format!("{prefix}/desired"),
            reported: format!("{prefix}/reported"),
            telemetry: format!("{prefix}/telemetry"),
        }
    }
}

/// Decode a desired-state payload.  Only JSON objects are accepted.
pub fn decode_desired(payload: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            warn!("MQTT: desired payload is not an object, dropped");
            None
        }
        Err(e) => {
            warn!("MQTT: desired payload unparseable ({}), dropped", e);
            None
        }
    }
}

pub struct MqttCloud {
    client: Client,
    topics: Topics,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MqttCloud {
    /// Connect in the background and start forwarding desired documents.
    pub fn start(config: &MqttConfig, device_id: &str, prefix: &str, inbox: Arc<ConfigInbox>) -> Self {
        let client_id = config.client_id.clone().unwrap_or_else(|| device_id.to_owned());
        let mut opts = MqttOptions::new(client_id, config.host.clone(), config.port);
        opts.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            opts.set_credentials(user.clone(), pass.clone());
        }

        let (client, connection) = Client::new(opts, REQUEST_CAPACITY);
        let topics = Topics::new(prefix);
        let connected = Arc::new(AtomicBool::new(false));
        let stopping = Arc::new(AtomicBool::new(false));

        info!(
            "MQTT: connecting to {}:{} (topics under {})",
            config.host, config.port, prefix
        );
        let worker = {
            let client = client.clone();
            let desired = topics.desired.clone();
            let link = Link {
                connected: Arc::clone(&connected),
                stopping: Arc::clone(&stopping),
                inbox,
            };
            thread::Builder::new()
                .name("mqtt".into())
                .spawn(move || drive(connection, &client, &desired, &link))
                .map_err(|e| warn!("MQTT: cannot spawn connection thread: {}", e))
                .ok()
        };

        Self {
            client,
            topics,
            connected,
            stopping,
            worker,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn publish<T: Serialize>(&self, topic: &str, retain: bool, record: &T) -> bool {
        if !self.is_connected() {
            debug!("MQTT: offline, {} not sent", topic);
            return false;
        }
        let payload = match serde_json::to_vec(record) {
            Ok(p) => p,
            Err(e) => {
                warn!("MQTT: cannot encode {}: {}", topic, e);
                return false;
            }
        };
        match self.client.try_publish(topic, QoS::AtLeastOnce, retain, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("MQTT: publish {} failed: {}", topic, e);
                false
            }
        }
    }

    /// Disconnect and wait for the connection thread.  Idempotent.
    ///
    /// When the request queue is full the disconnect is sent blocking;
    /// that returns once the thread drains the queue or exits.
    pub fn stop(&mut self) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.client.try_disconnect() {
            warn!("MQTT: disconnect not queued ({}), waiting for room", e);
            if let Err(e) = self.client.disconnect() {
                debug!("MQTT: connection already closed: {}", e);
            }
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for MqttCloud {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CloudPort for MqttCloud {
    fn report_state(&mut self, state: &ReportedState) -> bool {
        self.publish(&self.topics.reported, true, state)
    }

    fn report_telemetry(&mut self, record: &TelemetryRecord) -> bool {
        self.publish(&self.topics.telemetry, false, record)
    }
}

/// State shared between the connection thread and the [`MqttCloud`].
struct Link {
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    inbox: Arc<ConfigInbox>,
}

impl Link {
    fn should_stop(&self) -> bool {
        self.stopping.load(Ordering::Acquire) || self.inbox.is_shutdown()
    }
}

/// Connection loop.  Ends on stop or shutdown, or after a disconnect.
fn drive(mut connection: Connection, client: &Client, desired_topic: &str, link: &Link) {
    let Link {
        connected, inbox, ..
    } = link;
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("MQTT: connected");
                connected.store(true, Ordering::Release);
                if let Err(e) = client.try_subscribe(desired_topic, QoS::AtLeastOnce) {
                    warn!("MQTT: subscribe {} failed: {}", desired_topic, e);
                }
            }
            Ok(Event::Incoming(Incoming::Publish(p))) if p.topic == desired_topic => {
                info!("MQTT: desired state received ({} bytes)", p.payload.len());
                if let Some(doc) = decode_desired(&p.payload) {
                    inbox.push(doc);
                }
            }
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if connected.swap(false, Ordering::AcqRel) {
                    warn!("MQTT: connection lost: {}", e);
                } else {
                    debug!("MQTT: connect failed: {}", e);
                }
                if link.should_stop() {
                    break;
                }
                thread::sleep(RECONNECT_DELAY);
            }
        }
        if link.should_stop() && !connected.load(Ordering::Acquire) {
            break;
        }
    }
    info!("MQTT: connection thread stopped");
}
