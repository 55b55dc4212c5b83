use crate::{config::BacklightConfig, types::PanelAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklightState {
    Bright,
    Dimmed,
    Off,
}

impl BacklightState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bright => "BRIGHT",
            Self::Dimmed => "DIMMED",
            Self::Off => "OFF",
        }
    }
}

/// Display power controller driven by touch idle time on a fixed cadence.
/// Stages down Bright -> Dimmed -> Off as idle time grows and snaps back to
/// Bright with a visible fade the moment the user returns.
#[derive(Debug, Clone)]
pub struct BacklightController {
    config: BacklightConfig,
    state: BacklightState,
}

impl BacklightController {
    pub fn new(config: BacklightConfig) -> Self {
        Self {
            config,
            state: BacklightState::Bright,
        }
    }

    pub fn state(&self) -> BacklightState {
        self.state
    }

    /// One scheduler tick. Returns the actuator sequence for any state
    /// change, empty when the target state is already active.
    pub fn tick(&mut self, idle_ms: u64) -> Vec<PanelAction> {
        let target = self.target_for(idle_ms);
        if target == self.state {
            return Vec::new();
        }

        let actions = match target {
            BacklightState::Off => vec![
                PanelAction::SetBacklight(self.config.off_level),
                PanelAction::ShowWakePanel,
            ],
            BacklightState::Dimmed => vec![
                PanelAction::SetBacklight(self.config.dim_level),
                PanelAction::ShowWakePanel,
            ],
            BacklightState::Bright => self.fade_in_sequence(),
        };

        self.state = target;
        actions
    }

    fn target_for(&self, idle_ms: u64) -> BacklightState {
        if idle_ms > self.config.off_timeout_ms {
            BacklightState::Off
        } else if idle_ms > self.config.dim_timeout_ms {
            BacklightState::Dimmed
        } else {
            BacklightState::Bright
        }
    }

    /// Step the duty from the dimmed level down to full brightness. The
    /// executor sleeps on each Delay, so the caller blocks for the fade's
    /// duration; that is intentional, the ramp is visually synchronous.
    fn fade_in_sequence(&self) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        let mut level = self.config.dim_level as i16;
        while level >= self.config.full_level as i16 {
            actions.push(PanelAction::SetBacklight(level as u8));
            actions.push(PanelAction::Delay(self.config.fade_delay_ms));
            level -= self.config.fade_step as i16;
        }
        actions.push(PanelAction::HideWakePanel);
        actions
    }
}
