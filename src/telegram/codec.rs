/// Telegram wire format decoding and encoding
///
/// A telegram is an 8-byte big-endian bit stream:
/// - 13 bits: wind speed (0.01 m/s)
/// - 9 bits: wind direction (degrees)
/// - 11 bits: temperature (0.1 °C, offset -40 °C)
/// - 10 bits: humidity (0.001)
/// - 16 bits: pressure (2 Pa)
/// - 5 bits: validity flags
use log::trace;

use crate::error::{DecodeResult, FormatError};
use crate::models::ChannelValues;
use crate::telegram::packed::{
    PackedFlags, PackedReading, HUMIDITY_MASK, HUMIDITY_SCALE, PRESSURE_STEP,
    TEMPERATURE_OFFSET, TEMPERATURE_SCALE, WIND_DIRECTION_MASK, WIND_SPEED_MASK,
    WIND_SPEED_SCALE,
};

/// Bytes per telegram
pub const TELEGRAM_LEN: usize = 8;

// Encode clamps temperature to 10 bits even though the field holds 11.
const TEMPERATURE_ENCODE_MAX: u16 = 1023;

/// Decode one telegram starting at `offset`.
///
/// # Arguments
/// * `buffer` - Transport buffer holding one or more telegrams
/// * `offset` - Index of the telegram's first byte
///
/// # Returns
/// The packed reading, or `FormatError::Truncated` when fewer than 8 bytes
/// are available from `offset`
pub fn decode(buffer: &[u8], offset: usize) -> DecodeResult<PackedReading> {
    let end = offset
        .checked_add(TELEGRAM_LEN)
        .filter(|&end| end <= buffer.len())
        .ok_or(FormatError::Truncated {
            offset,
            len: buffer.len(),
            required: TELEGRAM_LEN,
        })?;
    let b = &buffer[offset..end];

    let wind_speed = (u16::from(b[0]) << 5) | (u16::from(b[1]) >> 3);
    let wind_direction = (u16::from(b[1] & 0x07) << 6) | (u16::from(b[2]) >> 2);
    let temperature =
        (u16::from(b[2] & 0x03) << 9) | (u16::from(b[3]) << 1) | (u16::from(b[4]) >> 7);
    let humidity = (u16::from(b[4] & 0x7f) << 3) | (u16::from(b[5]) >> 5);
    let pressure =
        (u16::from(b[5] & 0x1f) << 11) | (u16::from(b[6]) << 3) | (u16::from(b[7]) >> 5);
    let flags = PackedFlags::from_bits_truncate(b[7] & 0x1f);

    trace!(
        "Decoded telegram at {}: speed={} dir={} temp={} hum={} press={} flags={:?}",
        offset,
        wind_speed,
        wind_direction,
        temperature,
        humidity,
        pressure,
        flags
    );

    Ok(PackedReading::from_raw(
        pressure,
        temperature,
        flags,
        humidity,
        wind_direction,
        wind_speed,
    ))
}

/// Decode every consecutive telegram in `buffer`. A trailing partial record
/// yields a `Truncated` error as its last item.
pub fn decode_all(buffer: &[u8]) -> impl Iterator<Item = DecodeResult<PackedReading>> + '_ {
    (0..buffer.len())
        .step_by(TELEGRAM_LEN)
        .map(move |offset| decode(buffer, offset))
}

/// Decode a telegram written as 16 hex digits, e.g. `"00280401804000E0"`
pub fn decode_hex(record: &str) -> DecodeResult<PackedReading> {
    let bytes = hex::decode(record.trim())?;
    if bytes.len() != TELEGRAM_LEN {
        return Err(FormatError::WrongLength {
            expected: TELEGRAM_LEN,
            actual: bytes.len(),
        });
    }
    decode(&bytes, 0)
}

// Round and clamp into [0, max]; NaN saturates to zero in the cast.
fn quantize(value: f64, max: u16) -> u16 {
    value.round().clamp(0.0, f64::from(max)) as u16
}

/// Pack physical values into a telegram.
///
/// Out-of-range values are clamped to the representable raw domain, not
/// rejected. Pressure, humidity and wind speed are always flagged valid and
/// temperature carries the alternate-source bit. Wind direction is flagged only
/// for inputs in [0, 360] although storage accepts raw values up to 511.
pub fn encode<V: ChannelValues + ?Sized>(values: &V) -> PackedReading {
    let mut flags = PackedFlags::WIND_SPEED
        | PackedFlags::HUMIDITY
        | PackedFlags::PRESSURE
        | PackedFlags::ANEM_TEMPERATURE_SOURCE;

    let wind_direction = values.wind_direction();
    if (0.0..=360.0).contains(&wind_direction) {
        flags |= PackedFlags::WIND_DIRECTION;
    }

    PackedReading::from_raw(
        quantize(values.pressure() / PRESSURE_STEP, u16::MAX),
        quantize(
            (values.temperature() + TEMPERATURE_OFFSET) * TEMPERATURE_SCALE,
            TEMPERATURE_ENCODE_MAX,
        ),
        flags,
        quantize(values.humidity() * HUMIDITY_SCALE, HUMIDITY_MASK),
        quantize(wind_direction, WIND_DIRECTION_MASK),
        quantize(values.wind_speed() * WIND_SPEED_SCALE, WIND_SPEED_MASK),
    )
}

/// Write a packed reading back out in wire layout
pub fn encode_bytes(reading: &PackedReading) -> [u8; TELEGRAM_LEN] {
    let speed = reading.raw_wind_speed();
    let direction = reading.raw_wind_direction();
    let temperature = reading.raw_temperature();
    let humidity = reading.raw_humidity();
    let pressure = reading.raw_pressure();
    let flags = reading.raw_flags().bits();

    [
        (speed >> 5) as u8,
        (((speed & 0x1f) << 3) | (direction >> 6)) as u8,
        (((direction & 0x3f) << 2) | (temperature >> 9)) as u8,
        ((temperature >> 1) & 0xff) as u8,
        (((temperature & 0x01) << 7) | (humidity >> 3)) as u8,
        (((humidity & 0x07) << 5) | (pressure >> 11)) as u8,
        ((pressure >> 3) & 0xff) as u8,
        ((((pressure & 0x07) << 5) as u8) | flags),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingValue;
    use proptest::prelude::*;

    const WORKED_EXAMPLE: [u8; 8] = [0x00, 0x28, 0x04, 0x01, 0x80, 0x40, 0x00, 0xE0];

    #[test]
    fn worked_example_decodes_raw_fields() {
        let packed = decode(&WORKED_EXAMPLE, 0).unwrap();
        assert_eq!(packed.raw_wind_speed(), 5);
        assert_eq!(packed.raw_wind_direction(), 1);
        assert_eq!(packed.raw_temperature(), 3);
        assert_eq!(packed.raw_humidity(), 2);
        assert_eq!(packed.raw_pressure(), 7);
        assert_eq!(packed.raw_flags(), PackedFlags::empty());
    }

    #[test]
    fn worked_example_only_temperature_is_valid() {
        let value = ReadingValue::from(decode(&WORKED_EXAMPLE, 0).unwrap());
        assert!((value.temperature - -39.7).abs() < 1e-9);
        assert!(value.pressure.is_nan());
        assert!(value.humidity.is_nan());
        assert!(value.wind_speed.is_nan());
        assert!(value.wind_direction.is_nan());
        assert!(value.is_valid());
    }

    #[test]
    fn decode_honours_offset() {
        let mut buffer = vec![0xFF, 0xFF, 0xFF];
        buffer.extend_from_slice(&WORKED_EXAMPLE);
        assert_eq!(
            decode(&buffer, 3).unwrap(),
            decode(&WORKED_EXAMPLE, 0).unwrap()
        );
    }

    #[test]
    fn short_buffer_is_a_format_error() {
        assert_eq!(
            decode(&WORKED_EXAMPLE[..7], 0),
            Err(FormatError::Truncated {
                offset: 0,
                len: 7,
                required: 8
            })
        );
        assert!(decode(&WORKED_EXAMPLE, 1).is_err());
        assert!(decode(&WORKED_EXAMPLE, 100).is_err());
        assert!(decode(&WORKED_EXAMPLE, usize::MAX).is_err());
    }

    #[test]
    fn decode_all_reports_trailing_fragment() {
        let mut buffer = WORKED_EXAMPLE.repeat(2);
        buffer.extend_from_slice(&[0x01, 0x02]);

        let results: Vec<_> = decode_all(&buffer).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(
            results[2],
            Err(FormatError::Truncated { offset: 16, .. })
        ));
    }

    #[test]
    fn hex_records() {
        assert_eq!(
            decode_hex("00280401804000E0\n").unwrap(),
            decode(&WORKED_EXAMPLE, 0).unwrap()
        );
        assert!(matches!(
            decode_hex("0028"),
            Err(FormatError::WrongLength { expected: 8, actual: 2 })
        ));
        assert!(matches!(
            decode_hex("zz280401804000E0"),
            Err(FormatError::InvalidHex(_))
        ));
    }

    #[test]
    fn encode_bytes_inverts_decode() {
        let packed = decode(&WORKED_EXAMPLE, 0).unwrap();
        assert_eq!(encode_bytes(&packed), WORKED_EXAMPLE);

        let busy = [0xA5, 0x5A, 0xC3, 0x3C, 0x96, 0x69, 0xF0, 0x0F];
        assert_eq!(encode_bytes(&decode(&busy, 0).unwrap()), busy);
    }

    #[test]
    fn encode_clamps_out_of_range_values() {
        let packed = encode(&ReadingValue::new(200.0, -5.0, 3.0, 359.6, 120.0));
        assert_eq!(packed.raw_temperature(), 1023);
        assert_eq!(packed.raw_pressure(), 0);
        assert_eq!(packed.raw_humidity(), 1023);
        assert_eq!(packed.raw_wind_direction(), 360);
        assert_eq!(packed.raw_wind_speed(), 8191);

        let cold = encode(&ReadingValue::new(-80.0, 250_000.0, -0.1, 0.0, -2.0));
        assert_eq!(cold.raw_temperature(), 0);
        assert_eq!(cold.raw_pressure(), u16::MAX);
        assert_eq!(cold.raw_humidity(), 0);
        assert_eq!(cold.raw_wind_speed(), 0);
        // alternate-source flag keeps the clamped -40 °C valid
        assert_eq!(cold.temperature(), -40.0);
    }

    #[test]
    fn direction_storage_and_validity_ceilings_differ() {
        // Known asymmetry: validity is gated at 360 but storage clamps at 511.
        let beyond_gate = encode(&ReadingValue::new(10.0, 100_000.0, 0.5, 400.0, 2.0));
        assert_eq!(beyond_gate.raw_wind_direction(), 400);
        assert!(!beyond_gate.is_wind_direction_valid());
        assert!(beyond_gate.wind_direction().is_nan());

        let beyond_storage = encode(&ReadingValue::new(10.0, 100_000.0, 0.5, 600.0, 2.0));
        assert_eq!(beyond_storage.raw_wind_direction(), 511);

        let on_gate = encode(&ReadingValue::new(10.0, 100_000.0, 0.5, 360.0, 2.0));
        assert_eq!(on_gate.wind_direction(), 360.0);

        let negative = encode(&ReadingValue::new(10.0, 100_000.0, 0.5, -1.0, 2.0));
        assert_eq!(negative.raw_wind_direction(), 0);
        assert!(!negative.is_wind_direction_valid());
    }

    #[test]
    fn nan_channels_quantize_to_zero() {
        let packed = encode(&ReadingValue::invalid());
        assert_eq!(packed.raw_pressure(), 0);
        assert_eq!(packed.raw_wind_speed(), 0);
        assert!(!packed.is_wind_direction_valid());
    }

    proptest! {
        #[test]
        fn encode_then_decode_stays_within_quantization(
            temperature in -40.0f64..62.3,
            pressure in 0.0f64..131_070.0,
            humidity in 0.0f64..1.023,
            direction in 0.0f64..=360.0,
            speed in 0.0f64..81.91,
        ) {
            let original = ReadingValue::new(temperature, pressure, humidity, direction, speed);
            let wire = encode_bytes(&encode(&original));
            let decoded = ReadingValue::from(decode(&wire, 0).unwrap());

            prop_assert!((decoded.temperature - temperature).abs() <= 0.05 + 1e-9);
            prop_assert!((decoded.pressure - pressure).abs() <= 1.0 + 1e-9);
            prop_assert!((decoded.humidity - humidity).abs() <= 0.0005 + 1e-9);
            prop_assert!((decoded.wind_speed - speed).abs() <= 0.005 + 1e-9);
            prop_assert!((decoded.wind_direction - direction).abs() <= 1.0);
        }

        #[test]
        fn decode_never_panics(
            bytes in proptest::collection::vec(any::<u8>(), 0..24),
            offset in 0usize..32,
        ) {
            let _ = decode(&bytes, offset);
        }
    }
}
