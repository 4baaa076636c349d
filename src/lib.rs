// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Device-communication core for iAlarm-MK alarm panels
//
//! # ialarm-mk-core
//!
//! Communication core for iAlarm-MK (Meian / Antifurto365) alarm control
//! panels: state tracking, arm/disarm/cancel commands, sensor polling and
//! a persistent push-notification subscription.
//!
//! The byte-level panel protocol is pluggable. Callers hand in a
//! [`PanelClient`] (blocking request/response protocol driver) and an
//! [`EventDecoder`] (push frame decoder); the core owns sessions, state
//! and the background tasks. No heavy dependencies beyond tokio,
//! thiserror, tracing, bitflags, and serde.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ialarm_mk_core::{AlarmPanel, ArmMode, CoreConfig};
//! # use ialarm_mk_core::{EventDecoder, EventRecord, NetworkInfo, PanelClient, Result, ZoneInfo};
//! # struct VendorClient;
//! # impl PanelClient for VendorClient {
//! #     fn login(&mut self) -> Result<()> { Ok(()) }
//! #     fn logout(&mut self) -> Result<()> { Ok(()) }
//! #     fn get_alarm_status(&mut self) -> Result<u8> { Ok(1) }
//! #     fn get_sensor_ids(&mut self) -> Result<Vec<String>> { Ok(Vec::new()) }
//! #     fn get_zones(&mut self) -> Result<Vec<ZoneInfo>> { Ok(Vec::new()) }
//! #     fn get_by_way(&mut self) -> Result<Vec<u8>> { Ok(Vec::new()) }
//! #     fn set_alarm_status(&mut self, _code: u8) -> Result<()> { Ok(()) }
//! #     fn get_network_info(&mut self) -> Result<NetworkInfo> {
//! #         Ok(NetworkInfo { mac: "00:11:22:33:44:55".into() })
//! #     }
//! # }
//! # struct VendorDecoder;
//! # impl EventDecoder for VendorDecoder {
//! #     fn feed(&mut self, _bytes: &[u8]) -> Vec<EventRecord> { Vec::new() }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CoreConfig::builder()
//!         .host("192.168.1.81")
//!         .uid("1234567890")
//!         .password("0000")
//!         .enable_sensor_polling(true)
//!         .build();
//!
//!     let mut panel =
//!         AlarmPanel::connect(config, Box::new(VendorClient), Box::new(VendorDecoder)).await?;
//!
//!     let mut events = panel.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     panel.arm(ArmMode::Away).await;
//!     println!("Panel {} is {}", panel.mac(), panel.status());
//!
//!     tokio::signal::ctrl_c().await?;
//!     panel.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod panel;
pub mod push;
pub mod sensor;
pub mod status;

// Re-exports for convenience
pub use client::{NetworkInfo, PanelClient, ZoneInfo};
pub use config::{ArmMode, CoreConfig, CoreConfigBuilder};
pub use error::{CoreError, Result};
pub use event::{CoreEvent, EventReceiver};
pub use panel::AlarmPanel;
pub use push::{EventDecoder, EventRecord};
pub use sensor::{Sensor, SensorFlags};
pub use status::{AlarmCommand, PanelState};
