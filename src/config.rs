use log::{debug, info};
use std::env;
use std::str::FromStr;
use time::Duration;

use crate::error::ConfigError;
use crate::models::{Channel, ChannelValues, ReadingValue};
use crate::stats::WindStatsConfig;

const DEFAULT_WINDOW_SECS: u32 = 300;
const DEFAULT_MIN_DEW_POINT_RANGE: f64 = 10.0; // °C
const DEFAULT_MIN_AIR_DENSITY_RANGE: f64 = 0.05; // kg/m³

/// Smallest displayed span per channel; zero leaves a channel as measured
const DEFAULT_MIN_RANGE_SIZES: ReadingValue = ReadingValue {
    temperature: 10.0,
    pressure: 5.0,
    humidity: 0.20,
    wind_direction: 0.0,
    wind_speed: 0.0,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub wind: WindStatsConfig,
    /// Length of one aggregation window
    pub window: Duration,
    pub min_range_sizes: ReadingValue,
    pub min_dew_point_range: f64,
    pub min_air_density_range: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            wind: WindStatsConfig::default(),
            window: Duration::seconds(i64::from(DEFAULT_WINDOW_SECS)),
            min_range_sizes: DEFAULT_MIN_RANGE_SIZES,
            min_dew_point_range: DEFAULT_MIN_DEW_POINT_RANGE,
            min_air_density_range: DEFAULT_MIN_AIR_DENSITY_RANGE,
        }
    }
}

impl StationConfig {
    /// Load from `.env` and `STATION_*` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            "Wind domain {}-{} m/s in {} bins, {} sectors, {} s windows",
            config.wind.min_speed,
            config.wind.max_speed,
            config.wind.speed_bins,
            config.wind.direction_sectors,
            config.window.whole_seconds()
        );
        Ok(config)
    }

    /// Build from any key lookup; missing keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let wind = WindStatsConfig {
            min_speed: parse(&lookup, "STATION_MIN_WIND_SPEED", defaults.wind.min_speed)?,
            max_speed: parse(&lookup, "STATION_MAX_WIND_SPEED", defaults.wind.max_speed)?,
            speed_bins: parse(&lookup, "STATION_SPEED_BINS", defaults.wind.speed_bins)?,
            direction_sectors: parse(
                &lookup,
                "STATION_DIRECTION_SECTORS",
                defaults.wind.direction_sectors,
            )?,
        };
        wind.validate()?;

        let window_secs: u32 = parse(&lookup, "STATION_WINDOW_SECS", DEFAULT_WINDOW_SECS)?;
        if window_secs == 0 {
            return Err(ConfigError::ZeroBins {
                key: "STATION_WINDOW_SECS",
            });
        }

        let mut min_range_sizes = defaults.min_range_sizes;
        for channel in Channel::ALL {
            let key = format!(
                "STATION_MIN_RANGE_{}",
                channel.name().replace(' ', "_").to_uppercase()
            );
            let size = parse(&lookup, &key, min_range_sizes.channel(channel))?;
            min_range_sizes.set_channel(channel, size);
        }

        Ok(Self {
            wind,
            window: Duration::seconds(i64::from(window_secs)),
            min_range_sizes,
            min_dew_point_range: parse(
                &lookup,
                "STATION_MIN_RANGE_DEW_POINT",
                defaults.min_dew_point_range,
            )?,
            min_air_density_range: parse(
                &lookup,
                "STATION_MIN_RANGE_AIR_DENSITY",
                defaults.min_air_density_range,
            )?,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => {
            debug!("Found {}: '{}'", key, raw);
            let parsed = raw.trim().parse();
            parsed.map_err(|_| ConfigError::InvalidNumber {
                key: key.to_string(),
                value: raw,
            })
        }
    }
}
