/// Reading value types shared by the codec and the statistics engine
use std::fmt;
use std::hash::{Hash, Hasher};
use time::OffsetDateTime;

/// One of the five measured quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Pressure,
    Humidity,
    WindDirection,
    WindSpeed,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Temperature,
        Channel::Pressure,
        Channel::Humidity,
        Channel::WindDirection,
        Channel::WindSpeed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Pressure => "pressure",
            Channel::Humidity => "humidity",
            Channel::WindDirection => "wind direction",
            Channel::WindSpeed => "wind speed",
        }
    }
}

/// Read access to the five channels of a sample.
///
/// Units: temperature in °C, pressure in Pa, humidity as a fraction (0..1),
/// wind direction in degrees and wind speed in m/s. A channel that carries no
/// trustworthy value reads as NaN.
pub trait ChannelValues {
    fn temperature(&self) -> f64;
    fn pressure(&self) -> f64;
    fn humidity(&self) -> f64;
    fn wind_direction(&self) -> f64;
    fn wind_speed(&self) -> f64;

    fn is_temperature_valid(&self) -> bool {
        !self.temperature().is_nan()
    }

    fn is_pressure_valid(&self) -> bool {
        !self.pressure().is_nan()
    }

    fn is_humidity_valid(&self) -> bool {
        !self.humidity().is_nan()
    }

    fn is_wind_direction_valid(&self) -> bool {
        !self.wind_direction().is_nan()
    }

    fn is_wind_speed_valid(&self) -> bool {
        !self.wind_speed().is_nan()
    }

    /// True when at least one channel is valid. A station with a single
    /// working sensor still produces valid readings.
    fn is_valid(&self) -> bool {
        self.is_temperature_valid()
            || self.is_pressure_valid()
            || self.is_humidity_valid()
            || self.is_wind_direction_valid()
            || self.is_wind_speed_valid()
    }

    fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature(),
            Channel::Pressure => self.pressure(),
            Channel::Humidity => self.humidity(),
            Channel::WindDirection => self.wind_direction(),
            Channel::WindSpeed => self.wind_speed(),
        }
    }

    fn to_values(&self) -> ReadingValue {
        ReadingValue::new(
            self.temperature(),
            self.pressure(),
            self.humidity(),
            self.wind_direction(),
            self.wind_speed(),
        )
    }
}

/// Canonical five-channel reading. NaN marks an invalid channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingValue {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_direction: f64,
    pub wind_speed: f64,
}

impl ReadingValue {
    pub fn new(
        temperature: f64,
        pressure: f64,
        humidity: f64,
        wind_direction: f64,
        wind_speed: f64,
    ) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            wind_direction,
            wind_speed,
        }
    }

    /// All channels NaN
    pub fn invalid() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    }

    /// Copy the channels of `source`, or produce an invalid value when there is none
    pub fn from_source<T: ChannelValues + ?Sized>(source: Option<&T>) -> Self {
        match source {
            Some(values) => values.to_values(),
            None => Self::invalid(),
        }
    }

    /// Build a value channel by channel
    pub fn from_fn(mut f: impl FnMut(Channel) -> f64) -> Self {
        Self::new(
            f(Channel::Temperature),
            f(Channel::Pressure),
            f(Channel::Humidity),
            f(Channel::WindDirection),
            f(Channel::WindSpeed),
        )
    }

    pub fn set_channel(&mut self, channel: Channel, value: f64) {
        let slot = match channel {
            Channel::Temperature => &mut self.temperature,
            Channel::Pressure => &mut self.pressure,
            Channel::Humidity => &mut self.humidity,
            Channel::WindDirection => &mut self.wind_direction,
            Channel::WindSpeed => &mut self.wind_speed,
        };
        *slot = value;
    }
}

impl ChannelValues for ReadingValue {
    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn pressure(&self) -> f64 {
        self.pressure
    }

    fn humidity(&self) -> f64 {
        self.humidity
    }

    fn wind_direction(&self) -> f64 {
        self.wind_direction
    }

    fn wind_speed(&self) -> f64 {
        self.wind_speed
    }
}

fn channel_eq(a: f64, b: f64) -> bool {
    if a.is_nan() {
        b.is_nan()
    } else {
        a == b
    }
}

// Equal channels must hash alike: every NaN maps to one key and -0.0 to 0.0.
fn channel_key(v: f64) -> u64 {
    if v.is_nan() {
        u64::MAX
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl PartialEq for ReadingValue {
    fn eq(&self, other: &Self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| channel_eq(self.channel(c), other.channel(c)))
    }
}

impl Eq for ReadingValue {}

impl Hash for ReadingValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for channel in Channel::ALL {
            channel_key(self.channel(channel)).hash(state);
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T:{} P:{} H:{} D:{} S:{}",
            self.temperature, self.pressure, self.humidity, self.wind_direction, self.wind_speed
        )
    }
}

/// A reading value stamped with the instant it was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reading {
    pub stamp: OffsetDateTime,
    pub values: ReadingValue,
}

impl Reading {
    pub fn new(stamp: OffsetDateTime, values: ReadingValue) -> Self {
        Self { stamp, values }
    }
}

impl ChannelValues for Reading {
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
