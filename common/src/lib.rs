pub mod alarm;
pub mod backlight;
pub mod clock;
pub mod config;
pub mod panel;
pub mod topics;
pub mod types;

pub use alarm::AlarmMonitor;
pub use backlight::{BacklightController, BacklightState};
pub use clock::{CalendarTime, RegisterImage};
pub use config::{AlarmConfig, BacklightConfig, BusConfig, NetworkConfig, PanelConfig, SyncConfig};
pub use panel::PanelModel;
pub use topics::*;
pub use types::{DeviceError, InboundEvent, PanelAction, RelayKind};
