//! Compact bit-packed storage of one station telegram

use crate::models::{ChannelValues, ReadingValue};

bitflags::bitflags! {
    /// Per-channel validity bits carried in the low five bits of a telegram
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PackedFlags: u8 {
        const WIND_SPEED = 0b0_0001;
        const WIND_DIRECTION = 0b0_0010;
        const PRESSURE = 0b0_0100;
        const HUMIDITY = 0b0_1000;
        /// Temperature comes from the anemometer's sensor instead of the main probe
        const ANEM_TEMPERATURE_SOURCE = 0b1_0000;
        const ALL_DATA = Self::WIND_SPEED.bits()
            | Self::WIND_DIRECTION.bits()
            | Self::PRESSURE.bits()
            | Self::HUMIDITY.bits()
            | Self::ANEM_TEMPERATURE_SOURCE.bits();
    }
}

// Raw field widths
pub(crate) const FLAGS_MASK: u16 = 0x1f;
pub(crate) const TEMPERATURE_MASK: u16 = 0x7ff;
pub(crate) const HUMIDITY_MASK: u16 = 0x3ff;
pub(crate) const WIND_DIRECTION_MASK: u16 = 0x1ff;
pub(crate) const WIND_SPEED_MASK: u16 = 0x1fff;

// Physical scaling: physical = raw / SCALE (- offset)
pub(crate) const TEMPERATURE_OFFSET: f64 = 40.0;
pub(crate) const TEMPERATURE_SCALE: f64 = 10.0;
pub(crate) const PRESSURE_STEP: f64 = 2.0;
pub(crate) const HUMIDITY_SCALE: f64 = 1000.0;
pub(crate) const WIND_SPEED_SCALE: f64 = 100.0;

/// One sensor sample in 8 bytes of storage.
///
/// Field layout:
/// - `pressure`: 16-bit raw pressure
/// - `temperature_and_flags`: 11-bit raw temperature << 5 | 5 flag bits
/// - `humidity_direction_speed`: 10-bit humidity << 22 | 9-bit direction << 13 | 13-bit speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedReading {
    pressure: u16,
    temperature_and_flags: u16,
    humidity_direction_speed: u32,
}

impl PackedReading {
    /// All fields zero: no flags set, no channel valid
    pub const INVALID: PackedReading = PackedReading {
        pressure: 0,
        temperature_and_flags: 0,
        humidity_direction_speed: 0,
    };

    /// Pack raw field values. Values wider than their field are masked.
    pub fn from_raw(
        pressure: u16,
        temperature: u16,
        flags: PackedFlags,
        humidity: u16,
        wind_direction: u16,
        wind_speed: u16,
    ) -> Self {
        let temperature_and_flags =
            ((temperature & TEMPERATURE_MASK) << 5) | (u16::from(flags.bits()) & FLAGS_MASK);
        let humidity_direction_speed = (u32::from(humidity & HUMIDITY_MASK) << 22)
            | (u32::from(wind_direction & WIND_DIRECTION_MASK) << 13)
            | u32::from(wind_speed & WIND_SPEED_MASK);

        Self {
            pressure,
            temperature_and_flags,
            humidity_direction_speed,
        }
    }

    /// The three storage words `(pressure, temperature_and_flags, humidity_direction_speed)`
    pub fn fields(&self) -> (u16, u16, u32) {
        (
            self.pressure,
            self.temperature_and_flags,
            self.humidity_direction_speed,
        )
    }

    pub fn raw_pressure(&self) -> u16 {
        self.pressure
    }

    pub fn raw_temperature(&self) -> u16 {
        self.temperature_and_flags >> 5
    }

    pub fn raw_humidity(&self) -> u16 {
        (self.humidity_direction_speed >> 22) as u16
    }

    pub fn raw_wind_direction(&self) -> u16 {
        ((self.humidity_direction_speed >> 13) as u16) & WIND_DIRECTION_MASK
    }

    pub fn raw_wind_speed(&self) -> u16 {
        (self.humidity_direction_speed as u16) & WIND_SPEED_MASK
    }

    pub fn raw_flags(&self) -> PackedFlags {
        PackedFlags::from_bits_truncate((self.temperature_and_flags & FLAGS_MASK) as u8)
    }

    fn has(&self, flag: PackedFlags) -> bool {
        self.raw_flags().intersects(flag)
    }
}

impl ChannelValues for PackedReading {
    fn temperature(&self) -> f64 {
        if self.is_temperature_valid() {
            f64::from(self.raw_temperature()) / TEMPERATURE_SCALE - TEMPERATURE_OFFSET
        } else {
            f64::NAN
        }
    }

    fn pressure(&self) -> f64 {
        if self.is_pressure_valid() {
            f64::from(self.raw_pressure()) * PRESSURE_STEP
        } else {
            f64::NAN
        }
    }

    fn humidity(&self) -> f64 {
        if self.is_humidity_valid() {
            f64::from(self.raw_humidity()) / HUMIDITY_SCALE
        } else {
            f64::NAN
        }
    }

    fn wind_direction(&self) -> f64 {
        if self.is_wind_direction_valid() {
            f64::from(self.raw_wind_direction())
        } else {
            f64::NAN
        }
    }

    fn wind_speed(&self) -> f64 {
        if self.is_wind_speed_valid() {
            f64::from(self.raw_wind_speed()) / WIND_SPEED_SCALE
        } else {
            f64::NAN
        }
    }

    // Temperature has no flag of its own: a nonzero raw value or the
    // alternate-source bit marks it valid.
    fn is_temperature_valid(&self) -> bool {
        self.has(PackedFlags::ANEM_TEMPERATURE_SOURCE) || self.raw_temperature() != 0
    }

    fn is_pressure_valid(&self) -> bool {
        self.has(PackedFlags::PRESSURE)
    }

    fn is_humidity_valid(&self) -> bool {
        self.has(PackedFlags::HUMIDITY)
    }

    fn is_wind_direction_valid(&self) -> bool {
        self.has(PackedFlags::WIND_DIRECTION)
    }

    fn is_wind_speed_valid(&self) -> bool {
        self.has(PackedFlags::WIND_SPEED)
    }

    /// Telegram-level validity: any data flag set
    fn is_valid(&self) -> bool {
        self.has(PackedFlags::ALL_DATA)
    }
}

impl From<PackedReading> for ReadingValue {
    fn from(packed: PackedReading) -> Self {
        packed.to_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_is_all_zero() {
        assert_eq!(PackedReading::INVALID.fields(), (0, 0, 0));
        assert_eq!(PackedReading::INVALID, PackedReading::default());
        assert!(!PackedReading::INVALID.is_valid());
        assert!(!ReadingValue::from(PackedReading::INVALID).is_valid());
    }

    #[test]
    fn raw_fields_survive_packing() {
        let packed = PackedReading::from_raw(
            50_000,
            2047,
            PackedFlags::PRESSURE | PackedFlags::WIND_SPEED,
            1023,
            511,
            8191,
        );
        assert_eq!(packed.raw_pressure(), 50_000);
        assert_eq!(packed.raw_temperature(), 2047);
        assert_eq!(packed.raw_humidity(), 1023);
        assert_eq!(packed.raw_wind_direction(), 511);
        assert_eq!(packed.raw_wind_speed(), 8191);
        assert_eq!(
            packed.raw_flags(),
            PackedFlags::PRESSURE | PackedFlags::WIND_SPEED
        );
    }

    #[test]
    fn oversized_raw_values_are_masked() {
        let packed =
            PackedReading::from_raw(0, 0x0801, PackedFlags::empty(), 0x0402, 0x0203, 0x2004);
        assert_eq!(packed.raw_temperature(), 1);
        assert_eq!(packed.raw_humidity(), 2);
        assert_eq!(packed.raw_wind_direction(), 3);
        assert_eq!(packed.raw_wind_speed(), 4);
    }

    #[test]
    fn physical_values_follow_flags() {
        let packed = PackedReading::from_raw(
            50_660,
            612,
            PackedFlags::PRESSURE | PackedFlags::HUMIDITY,
            455,
            270,
            1234,
        );
        assert_eq!(packed.pressure(), 101_320.0);
        assert!((packed.temperature() - 21.2).abs() < 1e-9);
        assert!((packed.humidity() - 0.455).abs() < 1e-12);
        assert!(packed.wind_direction().is_nan());
        assert!(packed.wind_speed().is_nan());
        assert!(packed.is_valid());
    }

    #[test]
    fn zero_temperature_needs_the_alternate_source_flag() {
        let plain = PackedReading::from_raw(0, 0, PackedFlags::PRESSURE, 0, 0, 0);
        assert!(plain.temperature().is_nan());

        let anem = PackedReading::from_raw(0, 0, PackedFlags::ANEM_TEMPERATURE_SOURCE, 0, 0, 0);
        assert_eq!(anem.temperature(), -40.0);
        assert!(anem.is_valid());
    }

    #[test]
    fn nonzero_temperature_is_valid_without_flags() {
        let packed = PackedReading::from_raw(0, 3, PackedFlags::empty(), 0, 0, 0);
        assert!(packed.is_temperature_valid());
        // no data flag, so the telegram itself is not valid
        assert!(!packed.is_valid());
        // while the decoded value is
        assert!(ReadingValue::from(packed).is_valid());
    }
}
