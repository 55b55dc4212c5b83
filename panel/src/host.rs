use std::{
    io::{BufRead, ErrorKind},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex, OnceLock,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use roomhub_common::{
    BacklightController, InboundEvent, PanelAction, PanelConfig, PanelModel, RelayKind,
    SUBSCRIBE_TOPICS,
};

use crate::{
    bridge::EventBridge,
    bus::{RegisterBus, SimBus, CMD_BUZZER_OFF, CMD_BUZZER_ON},
    rtc::HardwareClock,
    sync::{TimeSyncController, WallClockSource},
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;

struct Runtime {
    config: PanelConfig,
    bus: Arc<Mutex<SimBus>>,
    clock: HardwareClock<SimBus>,
    sync: Arc<TimeSyncController<SimBus, WallClockSource>>,
    mqtt: AsyncClient,
    model: Arc<Mutex<PanelModel>>,
    backlight: Arc<Mutex<BacklightController>>,
    idle: Arc<IdleTracker>,
    bridge: Arc<EventBridge<InboundEvent>>,
    time_synced: Arc<AtomicBool>,
}

impl Clone for Runtime {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            bus: Arc::clone(&self.bus),
            clock: self.clock.clone(),
            sync: Arc::clone(&self.sync),
            mqtt: self.mqtt.clone(),
            model: Arc::clone(&self.model),
            backlight: Arc::clone(&self.backlight),
            idle: Arc::clone(&self.idle),
            bridge: Arc::clone(&self.bridge),
            time_synced: Arc::clone(&self.time_synced),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new();
    let mut config = store.load().await.unwrap_or_else(|err| {
        warn!("failed to load panel config from store: {err:#}");
        PanelConfig::default()
    });
    config.sanitize();

    let bus = Arc::new(Mutex::new(SimBus::new(
        config.bus.rtc_addr,
        config.bus.backlight_addr,
    )));
    let clock = HardwareClock::new(
        Arc::clone(&bus),
        config.bus.rtc_addr,
        config.bus.transaction_timeout_ms,
    );
    match clock.initialize().await {
        Ok(()) => info!("rtc initialized"),
        Err(err) => warn!("rtc init failed, clock display degraded: {err}"),
    }

    // Backlight to full on boot, before any dimming logic runs.
    {
        let mut bus = bus.lock().await;
        if let Err(err) = bus.write(config.bus.backlight_addr, &[config.backlight.full_level]) {
            warn!("backlight boot write failed: {err}");
        }
    }

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(config.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(config.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new("roomhub-panel", mqtt_host, mqtt_port);
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(config.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(config.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let runtime = Runtime {
        sync: Arc::new(TimeSyncController::new(
            clock.clone(),
            WallClockSource,
            config.sync,
        )),
        model: Arc::new(Mutex::new(PanelModel::new(&config))),
        backlight: Arc::new(Mutex::new(BacklightController::new(config.backlight))),
        idle: Arc::new(IdleTracker::new()),
        bridge: Arc::new(EventBridge::new()),
        time_synced: Arc::new(AtomicBool::new(false)),
        clock,
        mqtt,
        bus,
        config,
    };

    subscribe_topics(&runtime.mqtt).await?;
    spawn_mqtt_loop(runtime.clone(), eventloop);
    spawn_presentation_loop(runtime.clone());
    spawn_backlight_loop(runtime.clone());
    spawn_clock_display_loop(runtime.clone());
    spawn_console_input(runtime.clone());

    info!("panel running, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    for topic in SUBSCRIBE_TOPICS {
        mqtt.subscribe(topic, QoS::AtLeastOnce)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;
    }
    Ok(())
}

/// Network producer side: every broker publish lands in the bridge's
/// mailbox; the presentation task picks it up on its own context.
fn spawn_mqtt_loop(runtime: Runtime, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if message.payload.len() > MAX_MQTT_PAYLOAD_BYTES {
                        warn!(
                            "dropping oversized payload on {} ({} bytes)",
                            message.topic,
                            message.payload.len()
                        );
                        continue;
                    }
                    match String::from_utf8(message.payload.to_vec()) {
                        Ok(payload) => runtime
                            .bridge
                            .publish(InboundEvent::new(message.topic, payload)),
                        Err(_) => warn!("non utf8 payload on {}", message.topic),
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    trigger_time_sync(&runtime);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

/// One sync attempt per connectivity event, and none after the first
/// success. The controller is shared, so its re-entry latch covers
/// overlapping connect events too.
fn trigger_time_sync(runtime: &Runtime) {
    if runtime.time_synced.load(Ordering::Relaxed) {
        return;
    }

    let sync = Arc::clone(&runtime.sync);
    let timeout = Duration::from_millis(runtime.config.sync.timeout_ms);
    let time_synced = Arc::clone(&runtime.time_synced);
    tokio::spawn(async move {
        if sync.sync_once(timeout).await {
            time_synced.store(true, Ordering::Relaxed);
        }
    });
}

/// The single-threaded presentation context: drains the bridge, updates the
/// panel model, and executes whatever actuator work the model requested.
fn spawn_presentation_loop(runtime: Runtime) {
    tokio::spawn(async move {
        loop {
            runtime.bridge.notified().await;
            while let Some(event) = runtime.bridge.drain() {
                let actions = {
                    let mut model = runtime.model.lock().await;
                    model.handle_event(&event, monotonic_ms())
                };
                debug!("event on {}: {}", event.topic, event.payload);
                execute_panel_actions(&runtime, actions).await;
            }
        }
    });
}

fn spawn_backlight_loop(runtime: Runtime) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(runtime.config.backlight.tick_interval_ms));
        loop {
            interval.tick().await;
            let actions = {
                let mut backlight = runtime.backlight.lock().await;
                backlight.tick(runtime.idle.idle_ms())
            };
            execute_panel_actions(&runtime, actions).await;
        }
    });
}

/// Dedicated polling task for the blocking clock reads; the presentation
/// context never waits on the bus timeout.
fn spawn_clock_display_loop(runtime: Runtime) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(
            runtime.config.bus.clock_poll_interval_ms,
        ));
        loop {
            interval.tick().await;
            match runtime.clock.read().await {
                Ok(time) => debug!(
                    "clock {} {} {}",
                    time.time_string(),
                    time.weekday_name(),
                    time.date_string()
                ),
                Err(err) => warn!("rtc read failed, keeping last displayed time: {err}"),
            }
        }
    });
}

/// What a line on stdin stands in for on the real panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelInput {
    Touch,
    Relay(RelayKind),
    Automation,
    Mute,
}

fn parse_panel_input(line: &str) -> PanelInput {
    match line.trim().to_ascii_lowercase().as_str() {
        "ac" => PanelInput::Relay(RelayKind::Ac),
        "fan" => PanelInput::Relay(RelayKind::Fan),
        "tv" => PanelInput::Relay(RelayKind::Tv),
        "bulb" => PanelInput::Relay(RelayKind::Bulb),
        "auto" => PanelInput::Automation,
        "mute" => PanelInput::Mute,
        _ => PanelInput::Touch,
    }
}

/// Host stand-in for the touch controller: stdin lines become panel taps.
/// `ac`/`fan`/`tv`/`bulb` toggle a relay, `auto` toggles automation, `mute`
/// toggles the alarm mute; anything else is a bare screen touch. The
/// blocking reader thread hands lines to an async consumer over a channel.
fn spawn_console_input(runtime: Runtime) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(parse_panel_input(&line)).is_err() {
                break;
            }
        }
    });
    tokio::spawn(async move {
        while let Some(input) = rx.recv().await {
            handle_panel_input(&runtime, input).await;
        }
    });
}

/// Every input wakes the screen; switch taps additionally publish the
/// desired state to the hub's command topic and wait for the `/state` echo
/// to move the model, mute taps act locally.
async fn handle_panel_input(runtime: &Runtime, input: PanelInput) {
    runtime.idle.touch();
    match input {
        PanelInput::Touch => {}
        PanelInput::Relay(relay) => {
            let (topic, payload) = runtime.model.lock().await.request_relay_toggle(relay);
            publish_command(runtime, topic, payload).await;
        }
        PanelInput::Automation => {
            let (topic, payload) = runtime.model.lock().await.request_automation_toggle();
            publish_command(runtime, topic, payload).await;
        }
        PanelInput::Mute => {
            let actions = {
                let mut model = runtime.model.lock().await;
                let muted = !model.is_muted();
                info!("alarm mute {}", if muted { "on" } else { "off" });
                model.set_muted(muted)
            };
            execute_panel_actions(runtime, actions).await;
        }
    }
}

async fn publish_command(runtime: &Runtime, topic: &str, payload: &str) {
    if let Err(err) = runtime
        .mqtt
        .publish(topic, QoS::AtLeastOnce, false, payload)
        .await
    {
        warn!("command publish to {topic} failed: {err}");
    }
}

/// Runs an action sequence in order. Delays pace the sequence; everything
/// else is one command byte to the backlight controller, with failures
/// logged and dropped (a missed pulse or duty step is non-fatal).
async fn execute_panel_actions(runtime: &Runtime, actions: Vec<PanelAction>) {
    let addr = runtime.config.bus.backlight_addr;
    for action in actions {
        let command = match action {
            PanelAction::Delay(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                continue;
            }
            PanelAction::ShowWakePanel => {
                info!("wake panel shown");
                continue;
            }
            PanelAction::HideWakePanel => {
                info!("wake panel hidden");
                continue;
            }
            PanelAction::BuzzerOn => CMD_BUZZER_ON,
            PanelAction::BuzzerOff => CMD_BUZZER_OFF,
            PanelAction::SetBacklight(level) => level,
        };

        let mut bus = runtime.bus.lock().await;
        if let Err(err) = bus.write(addr, &[command]) {
            warn!("actuator write failed: {err}");
        }
    }
}

/// Tracks time since the last user interaction.
pub struct IdleTracker {
    last_touch: StdMutex<Instant>,
}

impl IdleTracker {
    pub fn new() -> Self {
        Self {
            last_touch: StdMutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        let mut last = self
            .last_touch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Instant::now();
    }

    pub fn idle_ms(&self) -> u64 {
        let last = self
            .last_touch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
    }
}

struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    fn new() -> Self {
        let data_dir = std::env::var("ROOMHUB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.roomhub"));
        Self {
            path: data_dir.join("config.json"),
        }
    }

    async fn load(&self) -> anyhow::Result<PanelConfig> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => Ok(serde_json::from_slice::<PanelConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(PanelConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

pub fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
