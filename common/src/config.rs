use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Arm at or above this temperature (Celsius).
    pub high_threshold_c: f32,
    /// Disarm below this temperature; the gap forms the hysteresis band.
    pub low_threshold_c: f32,
    /// Minimum spacing between audible alerts.
    pub cooldown_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            high_threshold_c: 27.0,
            low_threshold_c: 26.0,
            cooldown_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BacklightConfig {
    /// Duty command bytes; lower is brighter on this controller.
    pub full_level: u8,
    pub dim_level: u8,
    pub off_level: u8,
    pub dim_timeout_ms: u64,
    pub off_timeout_ms: u64,
    pub fade_step: u8,
    pub fade_delay_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            full_level: 0,
            dim_level: 200,
            off_level: 245,
            dim_timeout_ms: 60_000,
            off_timeout_ms: 300_000,
            fade_step: 5,
            fade_delay_ms: 10,
            tick_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "192.168.0.154".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusConfig {
    pub rtc_addr: u8,
    pub backlight_addr: u8,
    pub transaction_timeout_ms: u64,
    pub clock_poll_interval_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            rtc_addr: 0x51,
            backlight_addr: 0x30,
            transaction_timeout_ms: 200,
            clock_poll_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub backlight: BacklightConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub bus: BusConfig,
}

impl PanelConfig {
    pub fn sanitize(&mut self) {
        self.alarm.sanitize();
        self.backlight.sanitize();
        self.sync.sanitize();
    }
}

impl AlarmConfig {
    pub fn sanitize(&mut self) {
        if !self.high_threshold_c.is_finite() || !self.low_threshold_c.is_finite() {
            *self = Self::default();
            return;
        }
        // A collapsed band would chatter at the boundary.
        if self.low_threshold_c >= self.high_threshold_c {
            self.low_threshold_c = self.high_threshold_c - 1.0;
        }
        self.cooldown_ms = self.cooldown_ms.max(1_000);
    }
}

impl BacklightConfig {
    pub fn sanitize(&mut self) {
        if self.off_timeout_ms <= self.dim_timeout_ms {
            self.off_timeout_ms = self.dim_timeout_ms + 60_000;
        }
        if self.fade_step == 0 {
            self.fade_step = 5;
        }
        if self.dim_level <= self.full_level {
            self.dim_level = self.full_level.saturating_add(1);
        }
        if self.off_level < self.dim_level {
            self.off_level = self.dim_level;
        }
        self.tick_interval_ms = self.tick_interval_ms.clamp(100, 5_000);
    }
}

impl SyncConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.clamp(100, 5_000);
        self.timeout_ms = self.timeout_ms.max(self.poll_interval_ms);
    }
}
