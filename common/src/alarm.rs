use crate::{config::AlarmConfig, types::PanelAction};

/// Over-temperature monitor: a two-threshold comparator so readings
/// hovering at the boundary do not flap the alarm, plus a cooldown gate so
/// a persistent condition chirps at most once per interval.
#[derive(Debug, Clone)]
pub struct AlarmMonitor {
    config: AlarmConfig,
    armed: bool,
    last_alert_ms: Option<u64>,
}

impl AlarmMonitor {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            config,
            armed: false,
            last_alert_ms: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Feed one temperature sample. Returns the buzzer sequence to execute,
    /// empty when no alert is due. Actuator failures are not reported back;
    /// a missed chirp is non-fatal.
    pub fn observe(&mut self, value: f32, now_ms: u64, muted: bool) -> Vec<PanelAction> {
        if value >= self.config.high_threshold_c {
            self.armed = true;
        } else if value < self.config.low_threshold_c {
            self.armed = false;
        }

        if self.armed && !muted && self.cooldown_elapsed(now_ms) {
            self.last_alert_ms = Some(now_ms);
            return Self::chirp_sequence();
        }

        Vec::new()
    }

    fn cooldown_elapsed(&self, now_ms: u64) -> bool {
        self.last_alert_ms
            .map(|last| now_ms.saturating_sub(last) >= self.config.cooldown_ms)
            .unwrap_or(true)
    }

    /// Two short buzzer pulses, paced like the panel's buzzer controller
    /// expects.
    fn chirp_sequence() -> Vec<PanelAction> {
        vec![
            PanelAction::BuzzerOn,
            PanelAction::Delay(100),
            PanelAction::BuzzerOff,
            PanelAction::Delay(150),
            PanelAction::BuzzerOn,
            PanelAction::Delay(100),
            PanelAction::BuzzerOff,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> AlarmMonitor {
        AlarmMonitor::new(AlarmConfig::default())
    }

    #[test]
    fn arms_at_high_threshold() {
        let mut alarm = monitor();
        assert!(alarm.observe(26.9, 0, false).is_empty());
        assert!(!alarm.is_armed());

        let actions = alarm.observe(27.0, 1_000, false);
        assert!(alarm.is_armed());
        assert_eq!(actions.first(), Some(&PanelAction::BuzzerOn));
        assert_eq!(actions.last(), Some(&PanelAction::BuzzerOff));
    }

    #[test]
    fn disarms_only_below_low_threshold() {
        let mut alarm = monitor();
        alarm.observe(28.0, 0, false);
        assert!(alarm.is_armed());

        // Inside the hysteresis band: stays armed.
        alarm.observe(26.5, 70_000, false);
        assert!(alarm.is_armed());

        alarm.observe(25.9, 140_000, false);
        assert!(!alarm.is_armed());
    }

    #[test]
    fn band_never_arms_from_cold() {
        let mut alarm = monitor();
        for now in [0u64, 70_000, 140_000] {
            assert!(alarm.observe(26.5, now, false).is_empty());
            assert!(!alarm.is_armed());
        }
    }

    #[test]
    fn cooldown_limits_alerts() {
        let mut alarm = monitor();
        assert!(!alarm.observe(28.0, 10_000, false).is_empty());
        // 59.9s later: still inside the cooldown window.
        assert!(alarm.observe(28.0, 69_900, false).is_empty());
        assert!(!alarm.observe(28.0, 70_000, false).is_empty());
    }

    #[test]
    fn muted_suppresses_chirp_but_keeps_armed() {
        let mut alarm = monitor();
        assert!(alarm.observe(28.0, 0, true).is_empty());
        assert!(alarm.is_armed());

        // Unmuting later fires immediately; the cooldown never started.
        assert!(!alarm.observe(28.0, 500, false).is_empty());
    }

    #[test]
    fn chirp_is_double_pulse() {
        let mut alarm = monitor();
        let actions = alarm.observe(30.0, 0, false);
        assert_eq!(
            actions,
            vec![
                PanelAction::BuzzerOn,
                PanelAction::Delay(100),
                PanelAction::BuzzerOff,
                PanelAction::Delay(150),
                PanelAction::BuzzerOn,
                PanelAction::Delay(100),
                PanelAction::BuzzerOff,
            ]
        );
    }
}
