use crate::types::RelayKind;

pub const TOPIC_SENSOR_TEMP: &str = "home/roomhub/sensor/temperature";
pub const TOPIC_SENSOR_HUMIDITY: &str = "home/roomhub/sensor/humidity";
pub const TOPIC_SENSOR_LIGHT: &str = "home/roomhub/sensor/light";

pub const TOPIC_RELAY_AC_STATE: &str = "home/roomhub/relay/ac/state";
pub const TOPIC_RELAY_FAN_STATE: &str = "home/roomhub/relay/fan/state";
pub const TOPIC_RELAY_TV_STATE: &str = "home/roomhub/relay/tv/state";
pub const TOPIC_RELAY_BULB_STATE: &str = "home/roomhub/relay/bulb/state";

pub const TOPIC_RELAY_AC_CMD: &str = "home/roomhub/relay/ac/cmd";
pub const TOPIC_RELAY_FAN_CMD: &str = "home/roomhub/relay/fan/cmd";
pub const TOPIC_RELAY_TV_CMD: &str = "home/roomhub/relay/tv/cmd";
pub const TOPIC_RELAY_BULB_CMD: &str = "home/roomhub/relay/bulb/cmd";

pub const TOPIC_AUTO_STATE: &str = "home/roomhub/auto/all/state";
pub const TOPIC_AUTO_CMD: &str = "home/roomhub/auto/all/cmd";

/// Every topic the panel subscribes to.
pub const SUBSCRIBE_TOPICS: [&str; 8] = [
    TOPIC_SENSOR_TEMP,
    TOPIC_SENSOR_HUMIDITY,
    TOPIC_SENSOR_LIGHT,
    TOPIC_RELAY_AC_STATE,
    TOPIC_RELAY_FAN_STATE,
    TOPIC_RELAY_TV_STATE,
    TOPIC_RELAY_BULB_STATE,
    TOPIC_AUTO_STATE,
];

pub fn relay_state_topic(relay: RelayKind) -> &'static str {
    match relay {
        RelayKind::Ac => TOPIC_RELAY_AC_STATE,
        RelayKind::Fan => TOPIC_RELAY_FAN_STATE,
        RelayKind::Tv => TOPIC_RELAY_TV_STATE,
        RelayKind::Bulb => TOPIC_RELAY_BULB_STATE,
    }
}

pub fn relay_cmd_topic(relay: RelayKind) -> &'static str {
    match relay {
        RelayKind::Ac => TOPIC_RELAY_AC_CMD,
        RelayKind::Fan => TOPIC_RELAY_FAN_CMD,
        RelayKind::Tv => TOPIC_RELAY_TV_CMD,
        RelayKind::Bulb => TOPIC_RELAY_BULB_CMD,
    }
}

pub fn relay_for_state_topic(topic: &str) -> Option<RelayKind> {
    RelayKind::ALL
        .into_iter()
        .find(|relay| relay_state_topic(*relay) == topic)
}
