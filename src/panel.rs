// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Panel orchestration and state ownership

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::client::{run_session, PanelClient};
use crate::config::{ArmMode, CoreConfig};
use crate::error::{CoreError, Result};
use crate::event::{event_channel, CoreEvent, EventReceiver, EventSender};
use crate::push::{spawn_push_listener, EventDecoder};
use crate::sensor::{self, Sensor};
use crate::status::{AlarmCommand, PanelState};

/// Messages to the state-owner task.
///
/// Every mutation of the panel state or the sensor table travels through
/// this inbox; the owner task is the only writer.
pub(crate) enum Update {
    /// Set the panel state directly (optimistic command result)
    SetState {
        state: PanelState,
        ack: Option<oneshot::Sender<()>>,
    },
    /// A push notification arrived carrying this event code
    PushEvent { cid: u32 },
    /// Replace every sensor's status from one bulk snapshot
    ApplyBulk {
        states: Vec<u8>,
        ack: Option<oneshot::Sender<()>>,
    },
}

/// The main public API for interacting with an iAlarm-MK panel.
///
/// Construction connects to the panel, resolves its identity, takes an
/// initial status reading and, when sensor polling is enabled, enumerates
/// the sensor table. Two background tasks are started: the push listener,
/// which keeps a notification subscription alive until shutdown, and the
/// state owner, which applies all updates and publishes snapshots.
///
/// Accessors are synchronous and never touch the network; they answer from
/// the last published snapshot. Commands and polls each run as one
/// login/operation/logout session on the blocking pool, serialized so the
/// panel never sees two sessions at once.
pub struct AlarmPanel {
    config: CoreConfig,
    client: Arc<Mutex<Box<dyn PanelClient>>>,
    mac: String,
    event_tx: EventSender,
    update_tx: mpsc::UnboundedSender<Update>,
    state_rx: watch::Receiver<PanelState>,
    sensors_rx: watch::Receiver<HashMap<String, Sensor>>,
    polling_enabled: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    owner_handle: Option<JoinHandle<()>>,
    listener_handle: Option<JoinHandle<()>>,
    poller_handle: Option<JoinHandle<()>>,
}

impl AlarmPanel {
    /// Connect to the panel and start the background tasks.
    ///
    /// The MAC address must be readable within `connect_timeout_ms` or the
    /// constructor fails; nothing else is fatal. A failed initial status
    /// reading leaves the panel `Unavailable` until the first push event,
    /// and a failed or empty sensor enumeration disables polling for the
    /// lifetime of this handle.
    pub async fn connect(
        config: CoreConfig,
        client: Box<dyn PanelClient>,
        decoder: Box<dyn EventDecoder>,
    ) -> Result<Self> {
        info!("Connecting to panel at {}:{}", config.host, config.port);
        let client = Arc::new(Mutex::new(client));

        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let identity = run_blocking_session(&client, |c| c.get_network_info());
        let mac = match timeout(connect_timeout, identity).await {
            Ok(result) => result?.mac,
            Err(_) => {
                return Err(CoreError::Connectivity {
                    reason: format!(
                        "panel at {}:{} did not answer within {}ms",
                        config.host, config.port, config.connect_timeout_ms
                    ),
                });
            }
        };
        if mac.is_empty() {
            return Err(CoreError::Connectivity {
                reason: "panel returned an empty MAC address".to_string(),
            });
        }
        debug!("Panel identity resolved: {}", mac);

        let initial_state = match run_blocking_session(&client, |c| c.get_alarm_status()).await {
            Ok(code) => PanelState::from_device_status(code),
            Err(e) => {
                warn!("Initial status reading failed: {}", e);
                PanelState::Unavailable
            }
        };

        let mut sensors = HashMap::new();
        let mut polling_ok = false;
        if config.enable_sensor_polling {
            let enumeration = run_blocking_session(&client, |c| {
                let ids = c.get_sensor_ids()?;
                let zones = c.get_zones()?;
                let states = c.get_by_way()?;
                Ok((ids, zones, states))
            })
            .await
            .and_then(|(ids, zones, states)| sensor::build_table(ids, zones, states));
            match enumeration {
                Ok(table) if table.is_empty() => {
                    info!("Panel reports no sensors, polling disabled");
                }
                Ok(table) => {
                    info!("Enumerated {} sensors", table.len());
                    sensors = table;
                    polling_ok = true;
                }
                Err(e) => {
                    warn!("Sensor enumeration failed, polling disabled: {}", e);
                }
            }
        }

        let (event_tx, _event_rx) = event_channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(initial_state);
        let (sensors_tx, sensors_rx) = watch::channel(sensors);
        let polling_enabled = Arc::new(AtomicBool::new(polling_ok));

        let owner_handle = spawn_state_owner(
            update_rx,
            state_tx,
            sensors_tx,
            polling_enabled.clone(),
            event_tx.clone(),
            shutdown_rx.clone(),
        );
        let listener_handle = spawn_push_listener(
            format!("{}:{}", config.host, config.port),
            Duration::from_millis(config.push_lifetime_ms),
            Duration::from_millis(config.reconnect_delay_ms),
            decoder,
            update_tx.clone(),
            event_tx.clone(),
            shutdown_rx,
        );

        info!("Panel {} ready (state: {})", mac, initial_state);
        Ok(Self {
            config,
            client,
            mac,
            event_tx,
            update_tx,
            state_rx,
            sensors_rx,
            polling_enabled,
            shutdown_tx,
            owner_handle: Some(owner_handle),
            listener_handle: Some(listener_handle),
            poller_handle: None,
        })
    }

    /// Subscribe to panel events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    // --- Accessors ---

    /// Current panel state.
    pub fn status(&self) -> PanelState {
        *self.state_rx.borrow()
    }

    /// Snapshot of the sensor table, keyed by sensor id.
    pub fn sensors(&self) -> HashMap<String, Sensor> {
        self.sensors_rx.borrow().clone()
    }

    /// Last known vendor status code of one sensor.
    pub fn sensor_status(&self, id: &str) -> Option<u8> {
        self.sensors_rx.borrow().get(id).map(|s| s.state)
    }

    /// Whether a sensor's contact is currently open.
    pub fn is_sensor_open(&self, id: &str) -> Option<bool> {
        self.sensors_rx.borrow().get(id).map(Sensor::is_open)
    }

    /// Whether a sensor reports a low battery.
    pub fn is_sensor_low_battery(&self, id: &str) -> Option<bool> {
        self.sensors_rx.borrow().get(id).map(Sensor::is_low_battery)
    }

    /// Whether a sensor is currently in alarm.
    pub fn is_sensor_alarmed(&self, id: &str) -> Option<bool> {
        self.sensors_rx.borrow().get(id).map(Sensor::is_alarmed)
    }

    /// MAC address of the panel, as read at connect time.
    pub fn mac(&self) -> &str {
        &self.mac
    }

    // --- Commands ---

    /// Arm the panel in the given mode.
    ///
    /// Fire and forget: on success the state switches optimistically
    /// (`Arming` for away mode, `ArmedStay` for home mode) before the
    /// panel pushes its own confirmation. Failures are logged and reported
    /// as [`CoreEvent::CommandFailed`].
    pub async fn arm(&self, mode: ArmMode) {
        self.command(AlarmCommand::arm(mode)).await;
    }

    /// Disarm the panel.
    pub async fn disarm(&self) {
        self.command(AlarmCommand::Disarm).await;
    }

    /// Cancel a running alarm. The panel treats this as a disarm of the
    /// sounding siren, so the state switches to `Disarmed`.
    pub async fn cancel_alarm(&self) {
        self.command(AlarmCommand::CancelAlarm).await;
    }

    async fn command(&self, command: AlarmCommand) {
        if *self.shutdown_tx.borrow() {
            warn!("Ignoring {} after shutdown", command.name());
            return;
        }
        debug!("Sending {} to panel", command.name());
        let update_tx = self.update_tx.clone();
        let result = run_blocking_session(&self.client, move |c| {
            c.set_alarm_status(command.code())?;
            let (ack_tx, ack_rx) = oneshot::channel();
            update_tx
                .send(Update::SetState {
                    state: command.expected_state(),
                    ack: Some(ack_tx),
                })
                .map_err(|_| CoreError::ChannelClosed)?;
            // Wait for the owner to publish before logging out, so a
            // status() call right after the command sees the new state.
            ack_rx.blocking_recv().map_err(|_| CoreError::ChannelClosed)
        })
        .await;
        if let Err(e) = result {
            warn!("{} failed: {}", command.name(), e);
            let _ = self.event_tx.send(CoreEvent::CommandFailed {
                operation: command.name(),
                error: e.to_string(),
            });
        }
    }

    // --- Sensor polling ---

    /// Run one sensor poll cycle now.
    ///
    /// No-op unless sensor polling is enabled. Failures are logged and
    /// reported as [`CoreEvent::CommandFailed`]; the table keeps its
    /// previous values.
    pub async fn poll_once(&self) {
        poll_cycle(
            &self.client,
            &self.update_tx,
            &self.event_tx,
            &self.polling_enabled,
        )
        .await;
    }

    /// Start the periodic sensor poller.
    ///
    /// Idempotent: a second call while the poller is running does nothing.
    /// Not started at all when sensor polling is disabled.
    pub fn start_polling(&mut self) {
        if self.poller_handle.is_some() {
            return;
        }
        if !self.polling_enabled.load(Ordering::SeqCst) {
            debug!("Sensor polling disabled, poller not started");
            return;
        }
        let client = Arc::clone(&self.client);
        let update_tx = self.update_tx.clone();
        let event_tx = self.event_tx.clone();
        let polling_enabled = Arc::clone(&self.polling_enabled);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let handle = tokio::spawn(async move {
            debug!("Sensor poller started");
            loop {
                tokio::select! {
                    _ = sleep(interval) => {
                        if !polling_enabled.load(Ordering::SeqCst) {
                            break;
                        }
                        poll_cycle(&client, &update_tx, &event_tx, &polling_enabled).await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Sensor poller stopped");
        });
        self.poller_handle = Some(handle);
    }

    // --- Lifecycle ---

    /// Re-read the MAC address from the panel in a fresh session.
    pub async fn read_mac(&self) -> Result<String> {
        if *self.shutdown_tx.borrow() {
            return Err(CoreError::NotReady {
                reason: "panel is shut down".to_string(),
            });
        }
        let info = run_blocking_session(&self.client, |c| c.get_network_info()).await?;
        if info.mac.is_empty() {
            return Err(CoreError::Connectivity {
                reason: "panel returned an empty MAC address".to_string(),
            });
        }
        Ok(info.mac)
    }

    /// Stop the background tasks and wait for them to finish.
    ///
    /// Accessors keep answering from the last published snapshots
    /// afterwards; commands are ignored.
    pub async fn shutdown(&mut self) {
        info!("Shutting down panel");
        self.polling_enabled.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
        if let Some(h) = self.listener_handle.take() {
            let _ = h.await;
        }
        if let Some(h) = self.poller_handle.take() {
            let _ = h.await;
        }
        if let Some(h) = self.owner_handle.take() {
            let _ = h.await;
        }
    }
}

impl Drop for AlarmPanel {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(h) = self.listener_handle.take() {
            h.abort();
        }
        if let Some(h) = self.poller_handle.take() {
            h.abort();
        }
        if let Some(h) = self.owner_handle.take() {
            h.abort();
        }
    }
}

/// Run one login/operation/logout session on the blocking pool.
///
/// The client mutex is held across the whole session, so sessions from
/// different callers never interleave on the wire.
async fn run_blocking_session<T, F>(client: &Arc<Mutex<Box<dyn PanelClient>>>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn PanelClient) -> Result<T> + Send + 'static,
{
    let client = Arc::clone(client);
    tokio::task::spawn_blocking(move || {
        let mut guard = client.blocking_lock();
        run_session(&mut **guard, op)
    })
    .await
    .map_err(|e| CoreError::Connectivity {
        reason: format!("session worker failed: {e}"),
    })?
}

/// One sensor poll: read the bulk status list in its own session and hand
/// the snapshot to the state owner.
async fn poll_cycle(
    client: &Arc<Mutex<Box<dyn PanelClient>>>,
    update_tx: &mpsc::UnboundedSender<Update>,
    event_tx: &EventSender,
    polling_enabled: &AtomicBool,
) {
    if !polling_enabled.load(Ordering::SeqCst) {
        debug!("Sensor polling disabled, poll skipped");
        return;
    }
    let result = async {
        let states = run_blocking_session(client, |c| c.get_by_way()).await?;
        let (ack_tx, ack_rx) = oneshot::channel();
        update_tx
            .send(Update::ApplyBulk {
                states,
                ack: Some(ack_tx),
            })
            .map_err(|_| CoreError::ChannelClosed)?;
        ack_rx.await.map_err(|_| CoreError::ChannelClosed)
    }
    .await;
    if let Err(e) = result {
        warn!("Sensor poll failed: {}", e);
        let _ = event_tx.send(CoreEvent::CommandFailed {
            operation: "poll_once",
            error: e.to_string(),
        });
    }
}

/// Spawn the task that owns the panel state and the sensor table.
fn spawn_state_owner(
    mut update_rx: mpsc::UnboundedReceiver<Update>,
    state_tx: watch::Sender<PanelState>,
    sensors_tx: watch::Sender<HashMap<String, Sensor>>,
    polling_enabled: Arc<AtomicBool>,
    event_tx: EventSender,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = update_rx.recv() => match update {
                    Some(update) => handle_update(
                        update,
                        &state_tx,
                        &sensors_tx,
                        &polling_enabled,
                        &event_tx,
                    ),
                    None => break,
                },
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("State owner stopped");
    })
}

/// Apply one update and publish the result.
fn handle_update(
    update: Update,
    state_tx: &watch::Sender<PanelState>,
    sensors_tx: &watch::Sender<HashMap<String, Sensor>>,
    polling_enabled: &AtomicBool,
    event_tx: &EventSender,
) {
    match update {
        Update::SetState { state, ack } => {
            debug!("Panel state set to {}", state);
            let _ = state_tx.send(state);
            let _ = event_tx.send(CoreEvent::StateChanged(state));
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        }
        Update::PushEvent { cid } => {
            let state = match PanelState::from_event_code(cid) {
                Some(state) => {
                    debug!("Event code {} maps to {}", cid, state);
                    let _ = state_tx.send(state);
                    state
                }
                None => {
                    debug!("Event code {} has no state mapping", cid);
                    *state_tx.borrow()
                }
            };
            // Every decoded push is reported, mapped or not, so hosts can
            // refresh on any panel activity.
            let _ = event_tx.send(CoreEvent::StateChanged(state));
        }
        Update::ApplyBulk { states, ack } => {
            if polling_enabled.load(Ordering::SeqCst) {
                let mut table = sensors_tx.borrow().clone();
                match sensor::apply_bulk(&mut table, &states) {
                    Ok(()) => {
                        let _ = sensors_tx.send(table);
                        let _ = event_tx.send(CoreEvent::SensorsUpdated);
                    }
                    Err(e) => warn!("Discarding sensor snapshot: {}", e),
                }
            } else {
                debug!("Sensor polling disabled, snapshot discarded");
            }
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        }
    }
}
