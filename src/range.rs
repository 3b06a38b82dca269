/// Interval primitives over instants, numbers and whole readings
use std::sync::OnceLock;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::models::{Channel, ChannelValues, ReadingValue};

/// Ordered pair of doubles, `low <= high`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    low: f64,
    high: f64,
}

impl NumericRange {
    /// Create a range from two bounds in either order
    pub fn new(a: f64, b: f64) -> Self {
        if b < a {
            Self { low: b, high: a }
        } else {
            Self { low: a, high: b }
        }
    }

    /// Zero-width range holding a single value
    pub fn point(value: f64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn size(&self) -> f64 {
        self.high - self.low
    }

    pub fn mid(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// Shift both bounds so the range is centred on `target`, keeping its size
    pub fn recenter(self, target: f64) -> Self {
        let shift = target - self.mid();
        Self {
            low: self.low + shift,
            high: self.high + shift,
        }
    }

    /// Smallest range covering `self` and `value`
    pub fn encompass(self, value: f64) -> Self {
        Self {
            low: self.low.min(value),
            high: self.high.max(value),
        }
    }

    /// Widen a range narrower than `min_size` to exactly `min_size`, centred on
    /// the original mid. Non-positive minimums leave the range as it is.
    pub fn with_minimum_size(self, min_size: f64) -> Self {
        if min_size > 0.0 && self.size() < min_size {
            Self::new(0.0, min_size).recenter(self.mid())
        } else {
            self
        }
    }
}

/// Ordered pair of instants, `low <= high`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    low: OffsetDateTime,
    high: OffsetDateTime,
}

impl TimeRange {
    pub fn new(a: OffsetDateTime, b: OffsetDateTime) -> Self {
        if b < a {
            Self { low: b, high: a }
        } else {
            Self { low: a, high: b }
        }
    }

    pub fn instant(stamp: OffsetDateTime) -> Self {
        Self {
            low: stamp,
            high: stamp,
        }
    }

    /// The widest range the time library can represent
    pub fn widest() -> Self {
        Self {
            low: PrimitiveDateTime::MIN.assume_utc(),
            high: PrimitiveDateTime::MAX.assume_utc(),
        }
    }

    pub fn low(&self) -> OffsetDateTime {
        self.low
    }

    pub fn high(&self) -> OffsetDateTime {
        self.high
    }

    pub fn span(&self) -> Duration {
        self.high - self.low
    }

    pub fn contains(&self, stamp: OffsetDateTime) -> bool {
        stamp >= self.low && stamp <= self.high
    }

    pub fn encompass(self, stamp: OffsetDateTime) -> Self {
        Self {
            low: self.low.min(stamp),
            high: self.high.max(stamp),
        }
    }
}

/// One optional range per channel. An absent channel never saw a valid sample.
///
/// `min()` and `max()` are built on first access and cached; the ranges
/// themselves never change after construction.
#[derive(Debug, Clone, Default)]
pub struct ReadingValueRange {
    temperature: Option<NumericRange>,
    pressure: Option<NumericRange>,
    humidity: Option<NumericRange>,
    wind_direction: Option<NumericRange>,
    wind_speed: Option<NumericRange>,
    min: OnceLock<ReadingValue>,
    max: OnceLock<ReadingValue>,
}

impl ReadingValueRange {
    pub fn new(
        temperature: Option<NumericRange>,
        pressure: Option<NumericRange>,
        humidity: Option<NumericRange>,
        wind_direction: Option<NumericRange>,
        wind_speed: Option<NumericRange>,
    ) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            wind_direction,
            wind_speed,
            min: OnceLock::new(),
            max: OnceLock::new(),
        }
    }

    /// Every channel absent
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_fn(mut f: impl FnMut(Channel) -> Option<NumericRange>) -> Self {
        Self::new(
            f(Channel::Temperature),
            f(Channel::Pressure),
            f(Channel::Humidity),
            f(Channel::WindDirection),
            f(Channel::WindSpeed),
        )
    }

    pub fn get(&self, channel: Channel) -> Option<NumericRange> {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Pressure => self.pressure,
            Channel::Humidity => self.humidity,
            Channel::WindDirection => self.wind_direction,
            Channel::WindSpeed => self.wind_speed,
        }
    }

    pub fn temperature(&self) -> Option<NumericRange> {
        self.temperature
    }

    pub fn pressure(&self) -> Option<NumericRange> {
        self.pressure
    }

    pub fn humidity(&self) -> Option<NumericRange> {
        self.humidity
    }

    pub fn wind_direction(&self) -> Option<NumericRange> {
        self.wind_direction
    }

    pub fn wind_speed(&self) -> Option<NumericRange> {
        self.wind_speed
    }

    /// Low bound of every channel; absent channels are NaN
    pub fn min(&self) -> &ReadingValue {
        self.min.get_or_init(|| self.bounds(NumericRange::low))
    }

    /// High bound of every channel; absent channels are NaN
    pub fn max(&self) -> &ReadingValue {
        self.max.get_or_init(|| self.bounds(NumericRange::high))
    }

    fn bounds(&self, bound: fn(&NumericRange) -> f64) -> ReadingValue {
        ReadingValue::from_fn(|c| self.get(c).map_or(f64::NAN, |r| bound(&r)))
    }

    /// Widen each channel to its minimum display size (see
    /// [`NumericRange::with_minimum_size`]). Absent channels stay absent.
    pub fn with_minimum_sizes(&self, min_sizes: &ReadingValue) -> Self {
        Self::from_fn(|c| {
            let min_size = min_sizes.channel(c);
            self.get(c).map(|range| range.with_minimum_size(min_size))
        })
    }
}

impl PartialEq for ReadingValueRange {
    fn eq(&self, other: &Self) -> bool {
        Channel::ALL.iter().all(|&c| self.get(c) == other.get(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn numeric_range_orders_bounds() {
        let range = NumericRange::new(5.0, -1.0);
        assert_eq!(range.low(), -1.0);
        assert_eq!(range.high(), 5.0);
        assert_eq!(range.size(), 6.0);
        assert_eq!(range.mid(), 2.0);
    }

    #[test]
    fn recenter_keeps_size() {
        let range = NumericRange::new(0.0, 3.0).recenter(10.0);
        assert_eq!(range.low(), 8.5);
        assert_eq!(range.high(), 11.5);
        assert_eq!(range.size(), 3.0);
        assert_eq!(range.mid(), 10.0);
    }

    #[test]
    fn encompass_grows_in_both_directions() {
        let range = NumericRange::point(2.0).encompass(-3.0).encompass(7.5);
        assert_eq!(range, NumericRange::new(-3.0, 7.5));
        assert!(range.contains(0.0));
        assert!(!range.contains(8.0));
    }

    #[test]
    fn minimum_size_widens_narrow_ranges_only() {
        let narrow = NumericRange::new(20.0, 22.0).with_minimum_size(10.0);
        assert_eq!(narrow, NumericRange::new(16.0, 26.0));

        let wide = NumericRange::new(0.0, 30.0).with_minimum_size(10.0);
        assert_eq!(wide, NumericRange::new(0.0, 30.0));

        let unconstrained = NumericRange::point(4.0).with_minimum_size(0.0);
        assert_eq!(unconstrained, NumericRange::point(4.0));
    }

    #[test]
    fn time_range_span() {
        let a = datetime!(2024-03-01 12:00 UTC);
        let b = datetime!(2024-03-01 12:15 UTC);
        let range = TimeRange::new(b, a);
        assert_eq!(range.low(), a);
        assert_eq!(range.high(), b);
        assert_eq!(range.span(), Duration::minutes(15));
        assert!(range.contains(datetime!(2024-03-01 12:10 UTC)));

        let grown = range.encompass(datetime!(2024-03-01 11:00 UTC));
        assert_eq!(grown.span(), Duration::minutes(75));
    }

    #[test]
    fn widest_range_is_ordered() {
        let range = TimeRange::widest();
        assert!(range.low() < range.high());
        assert!(range.contains(OffsetDateTime::UNIX_EPOCH));
    }

    #[test]
    fn min_max_pair_channel_bounds() {
        let range = ReadingValueRange::new(
            Some(NumericRange::new(-5.0, 12.0)),
            Some(NumericRange::new(99_000.0, 101_000.0)),
            None,
            Some(NumericRange::new(10.0, 350.0)),
            Some(NumericRange::new(0.0, 14.2)),
        );

        let min = range.min();
        assert_eq!(min.temperature, -5.0);
        assert_eq!(min.pressure, 99_000.0);
        assert!(!min.is_humidity_valid());
        assert_eq!(min.wind_speed, 0.0);

        let max = range.max();
        assert_eq!(max.wind_direction, 350.0);
        assert!(max.humidity.is_nan());

        // cached
        assert!(std::ptr::eq(range.min(), min));
    }

    #[test]
    fn minimum_sizes_apply_per_channel() {
        let range = ReadingValueRange::new(
            Some(NumericRange::new(20.0, 21.0)),
            Some(NumericRange::new(100_000.0, 100_002.0)),
            None,
            Some(NumericRange::new(90.0, 91.0)),
            None,
        );
        let sizes = ReadingValue::new(10.0, 5.0, 0.2, 0.0, 0.0);
        let widened = range.with_minimum_sizes(&sizes);

        assert_eq!(widened.temperature(), Some(NumericRange::new(15.5, 25.5)));
        assert_eq!(
            widened.pressure(),
            Some(NumericRange::new(99_998.5, 100_003.5))
        );
        assert_eq!(widened.humidity(), None);
        assert_eq!(
            widened.wind_direction(),
            Some(NumericRange::new(90.0, 91.0))
        );
    }
}
