// Test doubles and helpers shared by the integration tests.
//
// MockPanelClient fakes the blocking vendor protocol client and records
// every call through a cloneable handle. FakePushEndpoint is a real TCP
// listener standing in for the panel's push notification port.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ialarm_mk_core::{
    CoreConfig, CoreError, CoreEvent, EventDecoder, EventReceiver, EventRecord, NetworkInfo,
    PanelClient, Result, ZoneInfo,
};

/// Call recorder, cloneable so tests keep a handle after the client moves
/// into the panel.
#[derive(Clone, Default)]
pub struct MockCalls {
    logins: Arc<AtomicUsize>,
    logouts: Arc<AtomicUsize>,
    by_way_calls: Arc<AtomicUsize>,
    set_status: Arc<Mutex<Vec<u8>>>,
}

impl MockCalls {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn by_way_calls(&self) -> usize {
        self.by_way_calls.load(Ordering::SeqCst)
    }

    /// Status codes passed to `set_alarm_status`, in call order.
    pub fn set_status_codes(&self) -> Vec<u8> {
        self.set_status.lock().unwrap().clone()
    }
}

/// Scriptable in-memory panel client.
pub struct MockPanelClient {
    pub mac: String,
    pub alarm_status: u8,
    pub sensor_ids: Vec<String>,
    pub zones: Vec<ZoneInfo>,
    /// Reply served by `get_by_way` when the script is exhausted
    pub by_way: Vec<u8>,
    /// Replies served by `get_by_way` in order, ahead of the default
    pub by_way_script: VecDeque<Vec<u8>>,
    pub fail_login: bool,
    pub fail_alarm_status: bool,
    pub fail_zones: bool,
    pub fail_set_status: bool,
    /// Fail the n-th logout (1-based) to simulate a dropped session close
    pub fail_nth_logout: Option<usize>,
    /// Blocking delay inside `login`, to simulate a hung panel
    pub login_delay: Duration,
    calls: MockCalls,
}

pub fn zone(name: &str) -> ZoneInfo {
    ZoneInfo { name: name.into() }
}

impl MockPanelClient {
    pub fn new() -> Self {
        Self {
            mac: "00:11:22:33:44:55".to_string(),
            alarm_status: 1,
            sensor_ids: vec!["A".into(), "B".into(), "C".into()],
            zones: vec![zone("Front door"), zone("Kitchen window"), zone("Garage")],
            by_way: vec![0, 0, 0],
            by_way_script: VecDeque::new(),
            fail_login: false,
            fail_alarm_status: false,
            fail_zones: false,
            fail_set_status: false,
            fail_nth_logout: None,
            login_delay: Duration::ZERO,
            calls: MockCalls::default(),
        }
    }

    /// Handle for asserting on recorded calls after the client is boxed.
    pub fn calls(&self) -> MockCalls {
        self.calls.clone()
    }
}

impl PanelClient for MockPanelClient {
    fn login(&mut self) -> Result<()> {
        if !self.login_delay.is_zero() {
            std::thread::sleep(self.login_delay);
        }
        if self.fail_login {
            return Err(CoreError::Connectivity {
                reason: "login refused".into(),
            });
        }
        self.calls.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let nth = self.calls.logouts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_nth_logout == Some(nth) {
            return Err(CoreError::Connectivity {
                reason: "logout refused".into(),
            });
        }
        Ok(())
    }

    fn get_alarm_status(&mut self) -> Result<u8> {
        if self.fail_alarm_status {
            return Err(CoreError::Protocol {
                details: "bad status reply".into(),
            });
        }
        Ok(self.alarm_status)
    }

    fn get_sensor_ids(&mut self) -> Result<Vec<String>> {
        Ok(self.sensor_ids.clone())
    }

    fn get_zones(&mut self) -> Result<Vec<ZoneInfo>> {
        if self.fail_zones {
            return Err(CoreError::Protocol {
                details: "bad zone reply".into(),
            });
        }
        Ok(self.zones.clone())
    }

    fn get_by_way(&mut self) -> Result<Vec<u8>> {
        self.calls.by_way_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .by_way_script
            .pop_front()
            .unwrap_or_else(|| self.by_way.clone()))
    }

    fn set_alarm_status(&mut self, code: u8) -> Result<()> {
        if self.fail_set_status {
            return Err(CoreError::Connectivity {
                reason: "command refused".into(),
            });
        }
        self.calls.set_status.lock().unwrap().push(code);
        Ok(())
    }

    fn get_network_info(&mut self) -> Result<NetworkInfo> {
        Ok(NetworkInfo {
            mac: self.mac.clone(),
        })
    }
}

/// Decoder for the fake endpoint's framing: one JSON object per line.
#[derive(Default)]
pub struct JsonLinesDecoder {
    buf: Vec<u8>,
}

impl EventDecoder for JsonLinesDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<EventRecord> {
        self.buf.extend_from_slice(bytes);
        let mut records = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Ok(record) = serde_json::from_slice(&line[..line.len() - 1]) {
                records.push(record);
            }
        }
        records
    }
}

/// A TCP listener standing in for the panel's push notification port.
///
/// Accepts connections, tracks how many were accepted and how many are
/// live at once, and lets tests push event lines to the most recent
/// connection or drop it.
pub struct FakePushEndpoint {
    port: u16,
    accepted: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    writer: Arc<tokio::sync::Mutex<Option<OwnedWriteHalf>>>,
    accept_handle: JoinHandle<()>,
}

impl FakePushEndpoint {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));
        let max_live = Arc::new(AtomicUsize::new(0));
        let writer: Arc<tokio::sync::Mutex<Option<OwnedWriteHalf>>> =
            Arc::new(tokio::sync::Mutex::new(None));

        let accept_handle = {
            let accepted = accepted.clone();
            let live = live.clone();
            let max_live = max_live.clone();
            let writer = writer.clone();
            tokio::spawn(async move {
                loop {
                    let (stream, _) = match listener.accept().await {
                        Ok(conn) => conn,
                        Err(_) => break,
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let now_live = live.fetch_add(1, Ordering::SeqCst) + 1;
                    max_live.fetch_max(now_live, Ordering::SeqCst);

                    let (mut read_half, write_half) = stream.into_split();
                    *writer.lock().await = Some(write_half);

                    // Drain the read side so the peer's close is noticed
                    let live = live.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 256];
                        loop {
                            match read_half.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(_) => {}
                            }
                        }
                        live.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            })
        };

        Self {
            port,
            accepted,
            live,
            max_live,
            writer,
            accept_handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Total connections accepted since start.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Most connections ever open at the same time.
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// Push one event line to the most recent connection.
    pub async fn send_event(&self, cid: u32) {
        if let Some(w) = self.writer.lock().await.as_mut() {
            let line = format!("{{\"Cid\":{}}}\n", cid);
            let _ = w.write_all(line.as_bytes()).await;
        }
    }

    /// Drop the server side of the most recent connection.
    pub async fn close_current(&self) {
        *self.writer.lock().await = None;
    }
}

impl Drop for FakePushEndpoint {
    fn drop(&mut self) {
        self.accept_handle.abort();
    }
}

/// Config pointing at a local fake endpoint, with short test timings.
pub fn panel_config(port: u16) -> CoreConfig {
    CoreConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .uid("0000000000")
        .password("1234")
        .enable_sensor_polling(true)
        .connect_timeout_ms(2_000)
        .push_lifetime_ms(60_000)
        .reconnect_delay_ms(50)
        .poll_interval_ms(50)
        .build()
}

/// Receive events until one matches, or panic after two seconds.
pub async fn expect_event(
    rx: &mut EventReceiver,
    mut pred: impl FnMut(&CoreEvent) -> bool,
) -> CoreEvent {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(2) {
        match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
            Ok(Ok(event)) => {
                if pred(&event) {
                    return event;
                }
            }
            Ok(Err(e)) => panic!("event channel closed: {e}"),
            Err(_) => {}
        }
    }
    panic!("timed out waiting for a matching event");
}

/// Poll a condition every 10ms until it holds or the deadline passes.
pub async fn wait_until(deadline: Duration, mut probe: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if probe() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    probe()
}
