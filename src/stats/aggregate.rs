//! Time-windowed summaries of reading sequences.
//!
//! The [`Aggregator`] folds readings one at a time and closes into immutable
//! [`ReadingAggregate`] / [`ReadingRangeAggregate`] values.

use std::sync::OnceLock;

use log::debug;
use time::{Duration, OffsetDateTime};

use crate::models::{Channel, ChannelValues, Reading, ReadingValue};
use crate::range::{NumericRange, ReadingValueRange, TimeRange};

/// A representative value for a window, with its sample count and time span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadingAggregate {
    values: ReadingValue,
    time_range: TimeRange,
    count: usize,
}

impl ReadingAggregate {
    pub fn new(time_range: TimeRange, values: ReadingValue, count: usize) -> Self {
        Self {
            values,
            time_range,
            count,
        }
    }

    /// No samples: count 0, the widest time range and all channels invalid
    pub fn invalid() -> Self {
        Self::new(TimeRange::widest(), ReadingValue::invalid(), 0)
    }

    pub fn values(&self) -> &ReadingValue {
        &self.values
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Stamp used when plotting the aggregate: the start of its window
    pub fn stamp(&self) -> OffsetDateTime {
        self.time_range.low()
    }

    pub fn begin_stamp(&self) -> OffsetDateTime {
        self.time_range.low()
    }

    pub fn end_stamp(&self) -> OffsetDateTime {
        self.time_range.high()
    }

    pub fn time_span(&self) -> Duration {
        self.time_range.span()
    }
}

impl ChannelValues for ReadingAggregate {
    fn temperature(&self) -> f64 {
        self.values.temperature
    }

    fn pressure(&self) -> f64 {
        self.values.pressure
    }

    fn humidity(&self) -> f64 {
        self.values.humidity
    }

    fn wind_direction(&self) -> f64 {
        self.values.wind_direction
    }

    fn wind_speed(&self) -> f64 {
        self.values.wind_speed
    }
}

/// Per-channel minimum and maximum over a window
#[derive(Debug, Clone)]
pub struct ReadingRangeAggregate {
    ranges: ReadingValueRange,
    time_range: TimeRange,
    min: OnceLock<Reading>,
    max: OnceLock<Reading>,
}

impl ReadingRangeAggregate {
    pub fn new(time_range: TimeRange, ranges: ReadingValueRange) -> Self {
        Self {
            ranges,
            time_range,
            min: OnceLock::new(),
            max: OnceLock::new(),
        }
    }

    pub fn ranges(&self) -> &ReadingValueRange {
        &self.ranges
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn get(&self, channel: Channel) -> Option<NumericRange> {
        self.ranges.get(channel)
    }

    /// Channel minimums stamped at the start of the window
    pub fn min(&self) -> &Reading {
        self.min
            .get_or_init(|| Reading::new(self.time_range.low(), *self.ranges.min()))
    }

    /// Channel maximums stamped at the end of the window
    pub fn max(&self) -> &Reading {
        self.max
            .get_or_init(|| Reading::new(self.time_range.high(), *self.ranges.max()))
    }
}

impl PartialEq for ReadingRangeAggregate {
    fn eq(&self, other: &Self) -> bool {
        self.time_range == other.time_range && self.ranges == other.ranges
    }
}

/// How a closed window picks its representative value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representative {
    /// The most recently folded sample
    #[default]
    Last,
    /// Per-channel mean of the valid samples (circular mean for wind direction)
    Mean,
}

/// Streaming fold of readings over one window
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    count: usize,
    time_range: Option<TimeRange>,
    ranges: [Option<NumericRange>; 5],
    sums: [f64; 5],
    valid: [usize; 5],
    direction_sin: f64,
    direction_cos: f64,
    last: Option<ReadingValue>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample taken at `stamp`.
    ///
    /// The count and time span always grow. Each channel's range only grows
    /// when that channel is valid in the sample.
    pub fn fold<V: ChannelValues + ?Sized>(&mut self, stamp: OffsetDateTime, value: &V) {
        self.count += 1;
        self.time_range = Some(match self.time_range {
            Some(range) => range.encompass(stamp),
            None => TimeRange::instant(stamp),
        });

        for channel in Channel::ALL {
            let v = value.channel(channel);
            if v.is_nan() {
                continue;
            }
            let slot = channel as usize;
            self.ranges[slot] = Some(match self.ranges[slot] {
                Some(range) => range.encompass(v),
                None => NumericRange::point(v),
            });
            self.sums[slot] += v;
            self.valid[slot] += 1;
            if channel == Channel::WindDirection {
                let radians = v.to_radians();
                self.direction_sin += radians.sin();
                self.direction_cos += radians.cos();
            }
        }

        self.last = Some(value.to_values());
    }

    pub fn push(&mut self, reading: &Reading) {
        self.fold(reading.stamp, &reading.values);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Span of every folded stamp, valid samples or not
    pub fn time_range(&self) -> Option<TimeRange> {
        self.time_range
    }

    /// The most recently folded value, invalid before the first fold
    pub fn last(&self) -> ReadingValue {
        ReadingValue::from_source(self.last.as_ref())
    }

    /// Per-channel mean over valid samples; channels without any are NaN
    pub fn mean(&self) -> ReadingValue {
        ReadingValue::from_fn(|channel| {
            let slot = channel as usize;
            if self.valid[slot] == 0 {
                return f64::NAN;
            }
            if channel == Channel::WindDirection {
                let degrees = self.direction_sin.atan2(self.direction_cos).to_degrees();
                return degrees.rem_euclid(360.0);
            }
            self.sums[slot] / self.valid[slot] as f64
        })
    }

    /// Close the window with a caller-supplied representative value.
    /// An empty window yields [`ReadingAggregate::invalid`].
    pub fn aggregate(&self, representative: &ReadingValue) -> ReadingAggregate {
        match self.time_range {
            Some(range) => ReadingAggregate::new(range, *representative, self.count),
            None => ReadingAggregate::invalid(),
        }
    }

    pub fn aggregate_by(&self, representative: Representative) -> ReadingAggregate {
        let value = match representative {
            Representative::Last => self.last(),
            Representative::Mean => self.mean(),
        };
        self.aggregate(&value)
    }

    /// Per-channel ranges; channels that never saw a valid sample are absent
    pub fn range_aggregate(&self) -> ReadingRangeAggregate {
        let ranges = ReadingValueRange::from_fn(|channel| self.ranges[channel as usize]);
        ReadingRangeAggregate::new(self.time_range.unwrap_or_else(TimeRange::widest), ranges)
    }

    /// Close the window into both summaries and start a fresh one
    pub fn close(
        &mut self,
        representative: Representative,
    ) -> (ReadingAggregate, ReadingRangeAggregate) {
        let summary = (self.aggregate_by(representative), self.range_aggregate());
        debug!(
            "Closed window with {} samples ({} valid temperatures)",
            self.count,
            self.valid[Channel::Temperature as usize]
        );
        *self = Self::default();
        summary
    }
}

impl Extend<Reading> for Aggregator {
    fn extend<I: IntoIterator<Item = Reading>>(&mut self, iter: I) {
        for reading in iter {
            self.push(&reading);
        }
    }
}

impl<'a> Extend<&'a Reading> for Aggregator {
    fn extend<I: IntoIterator<Item = &'a Reading>>(&mut self, iter: I) {
        for reading in iter {
            self.push(reading);
        }
    }
}

impl FromIterator<Reading> for Aggregator {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        let mut aggregator = Self::new();
        aggregator.extend(iter);
        aggregator
    }
}
