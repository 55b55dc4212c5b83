use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use roomhub_common::{CalendarTime, SyncConfig};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{bus::RegisterBus, rtc::HardwareClock};

/// Years at or below this read as "the clock was never set".
const UNSET_EPOCH_YEAR: u16 = 2000;

/// Wall-clock collaborator. Returns nothing until a plausible time is
/// available (e.g. NTP has not converged yet).
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Option<CalendarTime>;
}

/// Host time source: the OS clock, available immediately.
pub struct WallClockSource;

impl TimeSource for WallClockSource {
    fn now(&self) -> Option<CalendarTime> {
        Some(CalendarTime::from_chrono(&chrono::Local::now()))
    }
}

/// One-shot network-time-to-RTC synchronizer, run once per connectivity
/// event. Polls the time source until it produces a plausible value, then
/// persists it to the hardware clock exactly once.
pub struct TimeSyncController<B, S> {
    clock: HardwareClock<B>,
    source: S,
    config: SyncConfig,
    running: AtomicBool,
}

impl<B: RegisterBus, S: TimeSource> TimeSyncController<B, S> {
    pub fn new(clock: HardwareClock<B>, source: S, config: SyncConfig) -> Self {
        Self {
            clock,
            source,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Returns true once network time was obtained (even if the RTC write
    /// failed; startup must not block on the hardware), false on timeout,
    /// leaving the existing clock state untouched. Concurrent re-entry is
    /// refused.
    pub async fn sync_once(&self, timeout: Duration) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("time sync already in progress, skipping");
            return false;
        }
        let synced = self.poll_until_plausible(timeout).await;
        self.running.store(false, Ordering::SeqCst);
        synced
    }

    async fn poll_until_plausible(&self, timeout: Duration) -> bool {
        let start = Instant::now();

        while start.elapsed() < timeout {
            if let Some(time) = self.source.now() {
                if time.year > UNSET_EPOCH_YEAR {
                    match self.clock.write(&time).await {
                        Ok(()) => info!("rtc set from network time: {}", time.date_string()),
                        Err(err) => warn!("rtc write after time sync failed: {err}"),
                    }
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        info!("time sync timed out, keeping existing rtc time");
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex as StdMutex,
    };

    use tokio::sync::Mutex;

    use super::*;
    use crate::bus::SimBus;

    /// Returns None for the first `ready_after` calls, then a fixed time.
    struct StepSource {
        calls: AtomicU32,
        ready_after: u32,
        time: CalendarTime,
    }

    impl TimeSource for StepSource {
        fn now(&self) -> Option<CalendarTime> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (call >= self.ready_after).then_some(self.time)
        }
    }

    struct NeverSource;

    impl TimeSource for NeverSource {
        fn now(&self) -> Option<CalendarTime> {
            None
        }
    }

    fn midnight_2025() -> CalendarTime {
        CalendarTime {
            year: 2025,
            month: 1,
            day: 1,
            weekday: 3,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    fn clock_on(bus: &Arc<Mutex<SimBus>>) -> HardwareClock<SimBus> {
        HardwareClock::new(Arc::clone(bus), 0x51, 200)
    }

    #[tokio::test(start_paused = true)]
    async fn late_time_source_still_syncs_within_budget() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        // Time appears just before the 30 s budget expires (poll ~59 of 60).
        let source = StepSource {
            calls: AtomicU32::new(0),
            ready_after: 59,
            time: midnight_2025(),
        };
        let sync = TimeSyncController::new(clock_on(&bus), source, SyncConfig::default());

        assert!(sync.sync_once(Duration::from_secs(30)).await);
        assert_eq!(clock_on(&bus).read().await.unwrap(), midnight_2025());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_leaves_clock_untouched() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        let clock = clock_on(&bus);
        let before = CalendarTime {
            year: 2024,
            month: 6,
            day: 15,
            weekday: 6,
            hour: 12,
            minute: 30,
            second: 0,
        };
        clock.write(&before).await.unwrap();

        let sync = TimeSyncController::new(clock_on(&bus), NeverSource, SyncConfig::default());
        assert!(!sync.sync_once(Duration::from_secs(30)).await);
        assert_eq!(clock.read().await.unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn implausible_epoch_time_is_not_persisted() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        let source = StepSource {
            calls: AtomicU32::new(0),
            ready_after: 0,
            time: CalendarTime {
                year: 2000,
                month: 1,
                day: 1,
                weekday: 6,
                hour: 0,
                minute: 0,
                second: 0,
            },
        };
        let sync = TimeSyncController::new(clock_on(&bus), source, SyncConfig::default());

        assert!(!sync.sync_once(Duration::from_secs(30)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_rtc_write_still_reports_success() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        // Clock pointed at an address that will NACK.
        let clock = HardwareClock::new(Arc::clone(&bus), 0x52, 200);
        let source = StepSource {
            calls: AtomicU32::new(0),
            ready_after: 0,
            time: midnight_2025(),
        };
        let sync = TimeSyncController::new(clock, source, SyncConfig::default());

        assert!(sync.sync_once(Duration::from_secs(30)).await);
    }

    /// Time source whose polls park until released, to hold a sync mid-run.
    struct GatedSource {
        release: Arc<StdMutex<bool>>,
        time: CalendarTime,
    }

    impl TimeSource for GatedSource {
        fn now(&self) -> Option<CalendarTime> {
            let released = *self.release.lock().unwrap();
            released.then_some(self.time)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sync_is_refused() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        let release = Arc::new(StdMutex::new(false));
        let source = GatedSource {
            release: Arc::clone(&release),
            time: midnight_2025(),
        };
        let sync = Arc::new(TimeSyncController::new(
            clock_on(&bus),
            source,
            SyncConfig::default(),
        ));

        let first = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.sync_once(Duration::from_secs(30)).await })
        };
        // Let the first run claim the latch before contending.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!sync.sync_once(Duration::from_secs(30)).await);

        *release.lock().unwrap() = true;
        assert!(first.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_connect_events_sync_at_most_once() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        let release = Arc::new(StdMutex::new(false));
        let source = GatedSource {
            release: Arc::clone(&release),
            time: midnight_2025(),
        };
        // One controller shared by both "connect" events, as the runtime
        // holds it.
        let sync = Arc::new(TimeSyncController::new(
            clock_on(&bus),
            source,
            SyncConfig::default(),
        ));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let sync = Arc::clone(&sync);
                tokio::spawn(async move { sync.sync_once(Duration::from_secs(30)).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(100)).await;
        *release.lock().unwrap() = true;

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 1, "overlapping syncs must collapse to one");

        // Exactly one RTC write landed.
        assert_eq!(clock_on(&bus).read().await.unwrap(), midnight_2025());
    }
}
