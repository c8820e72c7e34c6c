//! Types that mirror the panel's JSON schema and the wings socket envelope.

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

const GIB: f64 = (1u64 << 30) as f64;

/// One-time socket address + token issued by the panel for a server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub socket: String,
    pub token: String,
}

// { "data": { "socket": ..., "token": ... } }
#[derive(Debug, Deserialize)]
pub struct CredentialResponse {
    pub data: Credential,
}

/// Every socket frame, in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Envelope {
    pub fn new(event: &str, args: Vec<String>) -> Self {
        Self {
            event: event.to_string(),
            args,
        }
    }

    pub fn auth(token: &str) -> Self {
        Self::new("auth", vec![token.to_string()])
    }

    pub fn set_state(cmd: Command) -> Self {
        Self::new("set state", vec![cmd.as_str().to_string()])
    }

    pub fn to_json(&self) -> String {
        // Two plain string fields: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Power command accepted by wings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
        }
    }
}

/// Lifecycle state reported by wings, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    Running,
    Starting,
    Stopping,
    Stopped,
    Restarting,
    Offline,
    Other(String),
}

impl PowerState {
    pub fn as_str(&self) -> &str {
        match self {
            PowerState::Running => "running",
            PowerState::Starting => "starting",
            PowerState::Stopping => "stopping",
            PowerState::Stopped => "stopped",
            PowerState::Restarting => "restarting",
            PowerState::Offline => "offline",
            PowerState::Other(s) => s,
        }
    }
}

impl From<String> for PowerState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "running" => PowerState::Running,
            "starting" => PowerState::Starting,
            "stopping" => PowerState::Stopping,
            "stopped" => PowerState::Stopped,
            "restarting" => PowerState::Restarting,
            "offline" => PowerState::Offline,
            _ => PowerState::Other(s),
        }
    }
}

impl<'de> Deserialize<'de> for PowerState {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        String::deserialize(d).map(PowerState::from)
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawNetwork {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// The `stats` payload as wings encodes it inside `args[0]`.
#[derive(Debug, Deserialize, Clone)]
pub struct RawStats {
    pub cpu_absolute: f64,
    pub disk_bytes: u64,
    pub memory_bytes: u64,
    pub memory_limit_bytes: u64,
    pub network: RawNetwork,
    pub state: PowerState,
    // milliseconds
    pub uptime: u64,
}

/// Normalized, most recent resource usage of a server.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub cpu: f64,
    pub disk_gib: f64,
    pub memory_gib: f64,
    pub memory_limit_gib: f64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub state: PowerState,
    pub uptime_secs: f64,
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

impl From<RawStats> for Snapshot {
    fn from(raw: RawStats) -> Self {
        Self {
            cpu: round_to(raw.cpu_absolute, 1),
            disk_gib: round_to(raw.disk_bytes as f64 / GIB, 2),
            memory_gib: round_to(raw.memory_bytes as f64 / GIB, 2),
            memory_limit_gib: round_to(raw.memory_limit_bytes as f64 / GIB, 2),
            rx_bytes: raw.network.rx_bytes,
            tx_bytes: raw.network.tx_bytes,
            state: raw.state,
            uptime_secs: round_to(raw.uptime as f64 / 1000.0, 2),
        }
    }
}

impl Snapshot {
    /// Decode the JSON string carried in a `stats` frame.
    pub fn from_stats_json(s: &str) -> Result<Self, ChannelError> {
        let raw: RawStats = serde_json::from_str(s)?;
        Ok(raw.into())
    }

    /// Uptime split into whole days, hours and minutes.
    pub fn uptime_dhm(&self) -> (u64, u64, u64) {
        let secs = self.uptime_secs.max(0.0) as u64;
        (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60)
    }

    pub fn memory_ratio(&self) -> f64 {
        if self.memory_limit_gib > 0.0 {
            (self.memory_gib / self.memory_limit_gib).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Inbound frames the channel understands; everything else is `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Stats(Snapshot),
    ConsoleOutput(String),
    TokenExpiring,
    Other(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        let env: Envelope = serde_json::from_str(text)?;
        let first = |name: &str| {
            env.args
                .first()
                .cloned()
                .ok_or_else(|| ChannelError::Malformed(format!("`{name}` without args")))
        };
        match env.event.as_str() {
            "stats" => Ok(Inbound::Stats(Snapshot::from_stats_json(&first("stats")?)?)),
            "console output" => Ok(Inbound::ConsoleOutput(first("console output")?)),
            "token expiring" => Ok(Inbound::TokenExpiring),
            _ => Ok(Inbound::Other(env.event)),
        }
    }
}

// ---------- Admin (application) API ----------

#[derive(Debug, Deserialize, Clone)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Meta {
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Item<T> {
    pub attributes: T,
}

/// One page of `{ "object": "list", "data": [...], "meta": {...} }`.
#[derive(Debug, Deserialize, Clone)]
pub struct ListPage<T> {
    pub data: Vec<Item<T>>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Limits {
    pub memory: u64,
    pub disk: u64,
    pub cpu: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerInfo {
    pub id: u64,
    pub identifier: String,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub node: u64,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub root_admin: bool,
}
