use std::sync::Arc;
use std::time::Duration;

use roomhub_common::{CalendarTime, DeviceError, RegisterImage};
use tokio::sync::Mutex;

use crate::bus::RegisterBus;

const REG_CTRL1: u8 = 0x00;
const REG_CTRL2: u8 = 0x01;
const REG_SECONDS: u8 = 0x02;

/// The panel's hardware clock, addressed over the shared register bus.
/// Every operation is one or two bus transactions under the bus lock,
/// bounded by the configured transaction timeout; the lock is released on
/// every exit path. Callers run these from a dedicated polling task, never
/// from the presentation task.
pub struct HardwareClock<B> {
    bus: Arc<Mutex<B>>,
    addr: u8,
    timeout: Duration,
}

impl<B> Clone for HardwareClock<B> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            addr: self.addr,
            timeout: self.timeout,
        }
    }
}

impl<B: RegisterBus> HardwareClock<B> {
    pub fn new(bus: Arc<Mutex<B>>, addr: u8, timeout_ms: u64) -> Self {
        Self {
            bus,
            addr,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Clears both control registers, leaving the oscillator free-running
    /// with alarms and clock-out disabled.
    pub async fn initialize(&self) -> Result<(), DeviceError> {
        let addr = self.addr;
        self.transaction(|bus| {
            bus.write(addr, &[REG_CTRL1, 0x00])?;
            bus.write(addr, &[REG_CTRL2, 0x00])
        })
        .await
    }

    /// Burst-reads the time registers and decodes them.
    pub async fn read(&self) -> Result<CalendarTime, DeviceError> {
        let addr = self.addr;
        let mut image: RegisterImage = [0; 7];
        self.transaction(|bus| bus.read(addr, REG_SECONDS, &mut image))
            .await?;
        Ok(CalendarTime::decode(&image))
    }

    /// Encodes and burst-writes the time registers in one transaction.
    pub async fn write(&self, time: &CalendarTime) -> Result<(), DeviceError> {
        let image = time.encode();
        let mut frame = [0u8; 8];
        frame[0] = REG_SECONDS;
        frame[1..].copy_from_slice(&image);

        let addr = self.addr;
        self.transaction(|bus| bus.write(addr, &frame)).await
    }

    /// One bounded bus transaction. A bus held past the timeout reads as a
    /// device that stopped acknowledging.
    async fn transaction<T>(
        &self,
        op: impl FnOnce(&mut B) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        match tokio::time::timeout(self.timeout, self.bus.lock()).await {
            Ok(mut bus) => op(&mut bus),
            Err(_) => Err(DeviceError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimBus;

    fn clock() -> HardwareClock<SimBus> {
        HardwareClock::new(Arc::new(Mutex::new(SimBus::new(0x51, 0x30))), 0x51, 200)
    }

    fn sample() -> CalendarTime {
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

    #[tokio::test]
    async fn written_time_reads_back() {
        let clock = clock();
        clock.initialize().await.unwrap();
        clock.write(&sample()).await.unwrap();

        assert_eq!(clock.read().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn initialize_quiesces_control_registers() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        {
            let mut bus = bus.lock().await;
            bus.write(0x51, &[REG_CTRL1, 0xFF, 0xFF]).unwrap();
        }

        let clock = HardwareClock::new(Arc::clone(&bus), 0x51, 200);
        clock.initialize().await.unwrap();

        let bus = bus.lock().await;
        assert_eq!(&bus.rtc_registers()[..2], &[0x00, 0x00]);
    }

    #[tokio::test]
    async fn wrong_address_surfaces_device_error() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        let clock = HardwareClock::new(bus, 0x52, 200);

        assert!(clock.read().await.is_err());
        assert!(clock.write(&sample()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn busy_bus_times_out_within_bound() {
        let bus = Arc::new(Mutex::new(SimBus::new(0x51, 0x30)));
        let clock = HardwareClock::new(Arc::clone(&bus), 0x51, 200);

        // Another task sits on the bus well past the transaction bound.
        let hog = Arc::clone(&bus);
        tokio::spawn(async move {
            let _guard = hog.lock().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        tokio::task::yield_now().await;

        let err = clock.read().await.unwrap_err();
        assert_eq!(err, DeviceError::Timeout { timeout_ms: 200 });
    }
}
