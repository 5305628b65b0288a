pub mod config;
pub mod connection;
pub mod payload;
pub mod reconcile;
pub mod sync;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One monitored line as reported by the server.
///
/// `id` is the only key used for matching across snapshots. `line_en` is the
/// ordering key for items that appear for the first time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "WireStatusItem")]
pub struct StatusItem {
    pub id: String,
    pub line: String,
    pub line_en: String,
    pub status_en: String,
    pub reason: String,
    pub severe: bool,
}

impl StatusItem {
    pub fn new(id: impl Into<String>, line_en: impl Into<String>, status_en: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            line: String::new(),
            line_en: line_en.into(),
            status_en: status_en.into(),
            reason: String::new(),
            severe: false,
        }
    }

    pub fn severity(&self) -> Severity {
        if self.severe {
            Severity::Severe
        } else {
            Severity::Normal
        }
    }
}

// Older servers send the detail text as `more`; newer ones send both.
#[derive(Deserialize)]
struct WireStatusItem {
    id: String,
    #[serde(default)]
    line: String,
    line_en: String,
    status_en: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    more: Option<String>,
    #[serde(default)]
    severe: bool,
}

impl From<WireStatusItem> for StatusItem {
    fn from(wire: WireStatusItem) -> Self {
        Self {
            id: wire.id,
            line: wire.line,
            line_en: wire.line_en,
            status_en: wire.status_en,
            reason: wire.reason.or(wire.more).unwrap_or_default(),
            severe: wire.severe,
        }
    }
}

/// Visual tier selected by the `severe` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Normal,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Severe => "severe",
        }
    }
}

/// A point-in-time report of every monitored line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub lines: Vec<StatusItem>,
    pub updated: String,
    pub live: bool,
}

/// The two mutually exclusive advisory banners, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Banner {
    #[default]
    Hidden,
    /// Server is connected to the monitored systems and has nothing to report.
    AllClear,
    /// Server lost its own connection to the monitored systems.
    Disconnected,
}

impl Banner {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Banner::Hidden => None,
            Banner::AllClear => Some("All lines running normally"),
            Banner::Disconnected => Some("Server is disconnected from the monitored systems"),
        }
    }
}

/// Last-sync label shown by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncLabel {
    #[default]
    Pending,
    Updated(String),
    Reconnecting,
}

impl fmt::Display for SyncLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncLabel::Pending => f.write_str("Waiting for first update…"),
            SyncLabel::Updated(updated) => f.write_str(updated),
            SyncLabel::Reconnecting => f.write_str("Reconnecting…"),
        }
    }
}
