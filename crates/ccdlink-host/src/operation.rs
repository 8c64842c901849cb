use serde::{Deserialize, Serialize};

/// One completed CCD acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcdOperation {
    /// Id reserved from the store before the request was sent.
    pub id: u32,
    /// Arrival time, unix seconds.
    pub timestamp: i64,
    /// Exposure time in microseconds.
    pub exposure: u32,
    pub iterations: u32,
    /// Accumulated value per pixel, in sensor order.
    pub samples: Vec<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub note: String,
}

/// Device link status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    ConnectionError,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::ConnectionError => "connection_error",
        }
    }
}

/// Notifications for the presentation layer, drained with
/// [`Host::take_events`](crate::host::Host::take_events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum HostEvent {
    /// The window title should change.
    TitleChanged(String),
    /// A CCD result was decoded and appended to the operation list.
    ResultReceived(u32),
}
