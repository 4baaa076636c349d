// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Core configuration

use serde::{Deserialize, Serialize};

/// Vendor P2P relay address used when the panel is not reachable on the LAN.
pub const DEFAULT_HOST: &str = "47.91.74.102";

/// Vendor P2P relay port.
pub const DEFAULT_PORT: u16 = 18034;

/// Arm mode for arm commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmMode {
    /// Full/away arm
    Away,
    /// Partial/stay/home arm
    Home,
}

/// Configuration for connecting to an iAlarm-MK panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Panel or P2P relay host
    pub host: String,
    /// Panel or P2P relay port
    pub port: u16,
    /// Panel unit id (printed on the device label)
    pub uid: String,
    /// Account password
    pub password: String,
    /// Whether to enumerate sensors at connect and allow bulk polling
    pub enable_sensor_polling: bool,
    /// Deadline for resolving panel identity during connect, in milliseconds
    pub connect_timeout_ms: u64,
    /// How long each push connection is held open before being recycled,
    /// in milliseconds. The panel sends no keepalive, so a stale connection
    /// is indistinguishable from a quiet one until this window elapses.
    pub push_lifetime_ms: u64,
    /// Delay before the push listener reconnects, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Interval between cycles of the optional background poller,
    /// in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            uid: String::new(),
            password: String::new(),
            enable_sensor_polling: false,
            connect_timeout_ms: 10_000,
            push_lifetime_ms: 300_000,
            reconnect_delay_ms: 1_000,
            poll_interval_ms: 5_000,
        }
    }
}

impl CoreConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for CoreConfig.
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.config.uid = uid.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn enable_sensor_polling(mut self, enable: bool) -> Self {
        self.config.enable_sensor_polling = enable;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn push_lifetime_ms(mut self, ms: u64) -> Self {
        self.config.push_lifetime_ms = ms;
        self
    }

    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.config.reconnect_delay_ms = ms;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn build(self) -> CoreConfig {
        self.config
    }
}
