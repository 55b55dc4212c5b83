use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Register bus transaction failure. Recovered locally by the caller; the
/// last known good state persists and nothing is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device 0x{addr:02x} did not acknowledge")]
    Nack { addr: u8 },
    #[error("bus transaction timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

/// A telemetry or state message delivered by the broker. Owned by the event
/// bridge from publish until the presentation task drains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub topic: String,
    pub payload: String,
}

impl InboundEvent {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayKind {
    Ac,
    Fan,
    Tv,
    Bulb,
}

impl RelayKind {
    pub const ALL: [RelayKind; 4] = [Self::Ac, Self::Fan, Self::Tv, Self::Bulb];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Fan => "fan",
            Self::Tv => "tv",
            Self::Bulb => "bulb",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Ac => 0,
            Self::Fan => 1,
            Self::Tv => 2,
            Self::Bulb => 3,
        }
    }
}

/// Side effects requested by the control logic, executed by the runtime in
/// order. `Delay` entries pace multi-step actuator sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    BuzzerOn,
    BuzzerOff,
    /// Backlight duty command byte: 0 is full brightness, 245 is off.
    SetBacklight(u8),
    ShowWakePanel,
    HideWakePanel,
    Delay(u64),
}

/// Relay and automation state payloads: exactly "ON" means on, anything
/// else is treated as off.
pub fn parse_on_off(payload: &str) -> bool {
    payload == "ON"
}

pub fn on_off_str(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}
