// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Protocol client boundary

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Zone metadata returned by the zone list query.
///
/// Index-aligned with [`PanelClient::get_sensor_ids`]. The vendor reply
/// carries more fields; only the zone name is needed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInfo {
    #[serde(rename = "Name")]
    pub name: String,
}

/// Network identity reported by the panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Panel MAC address. May come back blank when the panel glitches;
    /// the core treats a blank MAC as a connectivity failure.
    #[serde(rename = "Mac")]
    pub mac: String,
}

/// Blocking request/response client for the vendor panel protocol.
///
/// Implementations own the byte-level protocol: login handshake, request
/// framing, reply parsing. The core never touches bytes on this path; it
/// drives sessions (`login` → operations → `logout`) and translates the
/// returned codes.
///
/// Every method may block on network I/O. The core invokes them on the
/// blocking worker pool and serializes sessions so that no two are ever
/// open concurrently against one panel; implementations do not need
/// their own locking for that invariant.
pub trait PanelClient: Send {
    /// Open an authenticated session.
    fn login(&mut self) -> Result<()>;

    /// Close the session. Attempted on every exit path once login succeeded.
    fn logout(&mut self) -> Result<()>;

    /// Current device status code, vendor numbering
    /// (see [`PanelState::from_device_status`](crate::PanelState::from_device_status)).
    fn get_alarm_status(&mut self) -> Result<u8>;

    /// Vendor-assigned sensor ids in panel slot order. Unbound slots are
    /// empty strings and keep their position.
    fn get_sensor_ids(&mut self) -> Result<Vec<String>>;

    /// Zone metadata, index-aligned with `get_sensor_ids`.
    fn get_zones(&mut self) -> Result<Vec<ZoneInfo>>;

    /// Bulk sensor status codes, index-aligned with `get_sensor_ids`.
    /// "ByWay" is the vendor's name for this query.
    fn get_by_way(&mut self) -> Result<Vec<u8>>;

    /// Issue an arm/disarm/cancel command
    /// (see [`AlarmCommand::code`](crate::AlarmCommand::code)).
    fn set_alarm_status(&mut self, code: u8) -> Result<()>;

    /// Network identity query.
    fn get_network_info(&mut self) -> Result<NetworkInfo>;
}

/// Run one login → operation → logout session.
///
/// Logout is attempted whenever login succeeded, even if the operation
/// failed; the operation's error wins over a logout error.
pub(crate) fn run_session<T>(
    client: &mut dyn PanelClient,
    op: impl FnOnce(&mut dyn PanelClient) -> Result<T>,
) -> Result<T> {
    client.login()?;
    let result = op(client);
    let logout = client.logout();
    let value = result?;
    logout?;
    Ok(value)
}
