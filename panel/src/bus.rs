use roomhub_common::DeviceError;
use tracing::debug;

/// Buzzer command bytes understood by the backlight controller MCU. Any
/// other single byte is a backlight duty level.
pub const CMD_BUZZER_ON: u8 = 0xF6;
pub const CMD_BUZZER_OFF: u8 = 0xF7;

/// Byte-level register bus shared by the RTC and the backlight controller.
/// Transactions are not nestable, so callers hold one bus lock for the full
/// duration of a call and release it unconditionally.
pub trait RegisterBus: Send {
    /// One write transaction: address the device, send `bytes`, stop.
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), DeviceError>;

    /// One combined write/read transaction: address the device, send the
    /// register pointer, repeated-start, read `buf.len()` bytes.
    fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), DeviceError>;
}

/// Host stand-in for the panel's I2C master: a register file for the RTC
/// and a logged command history for the backlight controller. Lets the full
/// control loop run and be tested off-target.
pub struct SimBus {
    rtc_addr: u8,
    backlight_addr: u8,
    rtc_regs: [u8; 16],
    backlight_cmds: Vec<u8>,
}

impl SimBus {
    pub fn new(rtc_addr: u8, backlight_addr: u8) -> Self {
        Self {
            rtc_addr,
            backlight_addr,
            rtc_regs: [0; 16],
            backlight_cmds: Vec::new(),
        }
    }

    /// Commands the backlight controller has received, in order.
    pub fn backlight_history(&self) -> &[u8] {
        &self.backlight_cmds
    }

    pub fn rtc_registers(&self) -> &[u8] {
        &self.rtc_regs
    }
}

impl RegisterBus for SimBus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), DeviceError> {
        if addr == self.rtc_addr {
            let Some((&reg, data)) = bytes.split_first() else {
                return Err(DeviceError::Nack { addr });
            };
            for (offset, &byte) in data.iter().enumerate() {
                let index = reg as usize + offset;
                if index >= self.rtc_regs.len() {
                    return Err(DeviceError::Nack { addr });
                }
                self.rtc_regs[index] = byte;
            }
            return Ok(());
        }

        if addr == self.backlight_addr {
            for &command in bytes {
                match command {
                    CMD_BUZZER_ON => debug!("sim bus: buzzer on"),
                    CMD_BUZZER_OFF => debug!("sim bus: buzzer off"),
                    level => debug!("sim bus: backlight duty {level}"),
                }
                self.backlight_cmds.push(command);
            }
            return Ok(());
        }

        Err(DeviceError::Nack { addr })
    }

    fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), DeviceError> {
        if addr != self.rtc_addr {
            return Err(DeviceError::Nack { addr });
        }
        let start = reg as usize;
        let end = start + buf.len();
        if end > self.rtc_regs.len() {
            return Err(DeviceError::Nack { addr });
        }
        buf.copy_from_slice(&self.rtc_regs[start..end]);
        Ok(())
    }
}
