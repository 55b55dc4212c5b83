use chrono::{Datelike, Timelike};

/// Calendar time as held by the panel RTC (PCF8563-style register layout).
///
/// Fields mirror the narrow register widths of the clock chip; values are
/// expected to come from the codec or a trusted time source, not arbitrary
/// user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    /// Full year, 2000-2099.
    pub year: u16,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31.
    pub day: u8,
    /// Day of week, 0 = Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Raw 7-byte register image starting at the seconds register.
pub type RegisterImage = [u8; 7];

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}

fn bcd_to_dec(bcd: u8) -> u8 {
    ((bcd >> 4) * 10) + (bcd & 0x0F)
}

impl CalendarTime {
    /// Packs into the register image. High bits beyond each register's
    /// width are masked off; out-of-range input is silently truncated the
    /// same way the hardware would store it.
    pub fn encode(&self) -> RegisterImage {
        [
            dec_to_bcd(self.second) & 0x7F,
            dec_to_bcd(self.minute) & 0x7F,
            dec_to_bcd(self.hour) & 0x3F,
            dec_to_bcd(self.day) & 0x3F,
            self.weekday & 0x07,
            dec_to_bcd(self.month) & 0x1F,
            dec_to_bcd((self.year % 100) as u8),
        ]
    }

    /// Unpacks a register image. The century is not stored on the chip, so
    /// the year is reconstructed into the 2000-2099 window.
    pub fn decode(image: &RegisterImage) -> Self {
        Self {
            second: bcd_to_dec(image[0] & 0x7F),
            minute: bcd_to_dec(image[1] & 0x7F),
            hour: bcd_to_dec(image[2] & 0x3F),
            day: bcd_to_dec(image[3] & 0x3F),
            weekday: image[4] & 0x07,
            month: bcd_to_dec(image[5] & 0x1F),
            year: 2000 + bcd_to_dec(image[6]) as u16,
        }
    }

    pub fn from_chrono<Tz: chrono::TimeZone>(now: &chrono::DateTime<Tz>) -> Self {
        Self {
            year: now.year().clamp(2000, 2099) as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            weekday: now.weekday().num_days_from_sunday() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }

    /// "HH:MM:SS" for the clock label.
    pub fn time_string(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }

    /// "YYYY-MM-DD" for the date label.
    pub fn date_string(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// Full weekday name for the day label.
    pub fn weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES[(self.weekday % 7) as usize]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> CalendarTime {
        CalendarTime {
            year: 2025,
            month: 12,
            day: 24,
            weekday: 3,
            hour: 18,
            minute: 45,
            second: 59,
        }
    }

    #[test]
    fn decode_recovers_encoded_time() {
        let t = sample();
        assert_eq!(CalendarTime::decode(&t.encode()), t);
    }

    #[test]
    fn decode_recovers_all_field_extremes() {
        let cases = [
            CalendarTime {
                year: 2000,
                month: 1,
                day: 1,
                weekday: 0,
                hour: 0,
                minute: 0,
                second: 0,
            },
            CalendarTime {
                year: 2099,
                month: 12,
                day: 31,
                weekday: 6,
                hour: 23,
                minute: 59,
                second: 59,
            },
        ];

        for t in cases {
            assert_eq!(CalendarTime::decode(&t.encode()), t);
        }
    }

    #[test]
    fn decode_masks_status_bits() {
        // The seconds register carries a voltage-low flag in bit 7; it must
        // not leak into the decoded value.
        let mut image = sample().encode();
        image[0] |= 0x80;
        assert_eq!(CalendarTime::decode(&image).second, 59);
    }

    #[test]
    fn encode_is_lossy_for_out_of_range_images() {
        // encode(decode(x)) == x does not hold once masked bits are set.
        let mut image = sample().encode();
        image[2] |= 0xC0;
        let reencoded = CalendarTime::decode(&image).encode();
        assert_ne!(reencoded, image);
        assert_eq!(reencoded[2], image[2] & 0x3F);
    }

    #[test]
    fn display_strings_are_zero_padded() {
        let t = CalendarTime {
            year: 2026,
            month: 3,
            day: 7,
            weekday: 6,
            hour: 9,
            minute: 5,
            second: 2,
        };
        assert_eq!(t.time_string(), "09:05:02");
        assert_eq!(t.date_string(), "2026-03-07");
        assert_eq!(t.weekday_name(), "Saturday");
    }
}
