use crate::{
    alarm::AlarmMonitor,
    config::PanelConfig,
    topics::{
        relay_cmd_topic, relay_for_state_topic, TOPIC_AUTO_CMD, TOPIC_AUTO_STATE,
        TOPIC_SENSOR_HUMIDITY, TOPIC_SENSOR_LIGHT, TOPIC_SENSOR_TEMP,
    },
    types::{on_off_str, parse_on_off, InboundEvent, PanelAction, RelayKind},
};

/// UI-visible room state, owned by the presentation task. Inbound broker
/// events mutate it here; widget bindings read it back out. Only one driver
/// may feed it, so no internal locking.
#[derive(Debug, Clone)]
pub struct PanelModel {
    temperature_c: Option<f32>,
    humidity_pct: Option<f32>,
    light_pct: Option<u8>,
    relay_on: [bool; 4],
    automation_enabled: bool,
    muted: bool,
    alarm: AlarmMonitor,
}

impl PanelModel {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            temperature_c: None,
            humidity_pct: None,
            light_pct: None,
            relay_on: [false; 4],
            automation_enabled: true,
            muted: false,
            alarm: AlarmMonitor::new(config.alarm),
        }
    }

    pub fn temperature_c(&self) -> Option<f32> {
        self.temperature_c
    }

    pub fn humidity_pct(&self) -> Option<f32> {
        self.humidity_pct
    }

    pub fn light_pct(&self) -> Option<u8> {
        self.light_pct
    }

    pub fn relay_is_on(&self, relay: RelayKind) -> bool {
        self.relay_on[relay.index()]
    }

    pub fn automation_enabled(&self) -> bool {
        self.automation_enabled
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_alarm_armed(&self) -> bool {
        self.alarm.is_armed()
    }

    /// Apply one drained event. Unparseable numeric payloads and unknown
    /// topics leave the model untouched; the last known good value persists.
    pub fn handle_event(&mut self, event: &InboundEvent, now_ms: u64) -> Vec<PanelAction> {
        match event.topic.as_str() {
            TOPIC_SENSOR_TEMP => {
                let Some(temp) = parse_reading(&event.payload, -40.0, 125.0) else {
                    return Vec::new();
                };
                self.temperature_c = Some(temp);
                self.alarm.observe(temp, now_ms, self.muted)
            }
            TOPIC_SENSOR_HUMIDITY => {
                if let Some(humidity) = parse_reading(&event.payload, 0.0, 100.0) {
                    self.humidity_pct = Some(humidity);
                }
                Vec::new()
            }
            TOPIC_SENSOR_LIGHT => {
                if let Ok(light) = event.payload.parse::<f32>() {
                    if light.is_finite() {
                        self.light_pct = Some(light.clamp(0.0, 100.0) as u8);
                    }
                }
                Vec::new()
            }
            TOPIC_AUTO_STATE => {
                self.automation_enabled = parse_on_off(&event.payload);
                Vec::new()
            }
            topic => {
                if let Some(relay) = relay_for_state_topic(topic) {
                    self.relay_on[relay.index()] = parse_on_off(&event.payload);
                }
                Vec::new()
            }
        }
    }

    /// A relay tap on the panel: request the opposite of the last state
    /// the hub reported. Local state is not flipped here; it follows the
    /// hub's /state echo.
    pub fn request_relay_toggle(&self, relay: RelayKind) -> (&'static str, &'static str) {
        (
            relay_cmd_topic(relay),
            on_off_str(!self.relay_is_on(relay)),
        )
    }

    /// Automation toggle; same request/echo contract as the relays.
    pub fn request_automation_toggle(&self) -> (&'static str, &'static str) {
        (TOPIC_AUTO_CMD, on_off_str(!self.automation_enabled))
    }

    /// Muting kills any buzzer pulse that may be sounding; unmuting lets
    /// the next observed sample re-trigger through the normal cooldown.
    pub fn set_muted(&mut self, muted: bool) -> Vec<PanelAction> {
        self.muted = muted;
        if muted {
            vec![PanelAction::BuzzerOff]
        } else {
            Vec::new()
        }
    }
}

fn parse_reading(payload: &str, min: f32, max: f32) -> Option<f32> {
    let value = payload.trim().parse::<f32>().ok()?;
    (value.is_finite() && (min..=max).contains(&value)).then_some(value)
}
