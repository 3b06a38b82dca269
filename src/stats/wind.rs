//! Wind-resource statistics: speed histogram, direction/energy rose and a
//! Weibull fit of the speed distribution.

use log::debug;

use crate::error::ConfigError;
use crate::models::ChannelValues;

const DEFAULT_MAX_SPEED: f64 = 30.0;
const DEFAULT_SPEED_BINS: usize = 30;
const DEFAULT_DIRECTION_SECTORS: usize = 16;

// Shape search interval for the moment fit
const MIN_SHAPE: f64 = 0.1;
const MAX_SHAPE: f64 = 100.0;
const SHAPE_TOLERANCE: f64 = 1e-10;

/// Speed domain and histogram resolution, supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindStatsConfig {
    /// Lowest speed counted, m/s
    pub min_speed: f64,
    /// Highest speed counted (inclusive), m/s
    pub max_speed: f64,
    /// Number of equal-width speed buckets across the domain
    pub speed_bins: usize,
    /// Number of direction sectors; sector 0 is centred on north
    pub direction_sectors: usize,
}

impl Default for WindStatsConfig {
    fn default() -> Self {
        Self {
            min_speed: 0.0,
            max_speed: DEFAULT_MAX_SPEED,
            speed_bins: DEFAULT_SPEED_BINS,
            direction_sectors: DEFAULT_DIRECTION_SECTORS,
        }
    }
}

impl WindStatsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_speed < self.max_speed) {
            return Err(ConfigError::EmptySpeedDomain {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if self.speed_bins == 0 {
            return Err(ConfigError::ZeroBins { key: "speed_bins" });
        }
        if self.direction_sectors == 0 {
            return Err(ConfigError::ZeroBins {
                key: "direction_sectors",
            });
        }
        Ok(())
    }

    fn bin_width(&self) -> f64 {
        (self.max_speed - self.min_speed) / self.speed_bins as f64
    }

    fn sector_width(&self) -> f64 {
        360.0 / self.direction_sectors as f64
    }

    fn contains(&self, speed: f64) -> bool {
        speed >= self.min_speed && speed <= self.max_speed
    }
}

/// Sample count for one speed bucket `[speed_low, speed_high)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindFrequencyBin {
    pub speed_low: f64,
    pub speed_high: f64,
    pub frequency: usize,
}

impl WindFrequencyBin {
    pub fn mid_speed(&self) -> f64 {
        (self.speed_low + self.speed_high) / 2.0
    }
}

/// Sample count and energy proxy (sum of speed cubed) for one direction sector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindDirectionEnergy {
    pub sector: usize,
    /// Sector centre in degrees
    pub direction: f64,
    pub frequency: usize,
    pub power: f64,
}

/// Two-parameter Weibull distribution of wind speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeibullFit {
    /// Shape parameter k
    pub theta: f64,
    /// Scale parameter c, m/s
    pub beta: f64,
}

impl WeibullFit {
    /// Result for a population that cannot be fitted
    pub const UNDEFINED: WeibullFit = WeibullFit {
        theta: f64::NAN,
        beta: f64::NAN,
    };

    /// Method-of-moments fit from the sample mean and standard deviation.
    ///
    /// The shape is found by bisection so that the distribution's coefficient
    /// of variation matches the sample's; the scale then reproduces the mean.
    /// A zero-variance population gets the maximum shape, which puts the
    /// scale within 0.6% of the common speed.
    pub fn from_moments(mean: f64, std_dev: f64) -> Self {
        if !(mean > 0.0) || !std_dev.is_finite() {
            return Self::UNDEFINED;
        }

        let cv = std_dev / mean;
        let theta = if cv <= coefficient_of_variation(MAX_SHAPE) {
            MAX_SHAPE
        } else if cv >= coefficient_of_variation(MIN_SHAPE) {
            MIN_SHAPE
        } else {
            // cv falls as the shape grows
            let (mut low, mut high) = (MIN_SHAPE, MAX_SHAPE);
            while high - low > SHAPE_TOLERANCE * low {
                let mid = (low + high) / 2.0;
                if coefficient_of_variation(mid) > cv {
                    low = mid;
                } else {
                    high = mid;
                }
            }
            (low + high) / 2.0
        };

        Self {
            theta,
            beta: mean / libm::tgamma(1.0 + 1.0 / theta),
        }
    }

    pub fn shape(&self) -> f64 {
        self.theta
    }

    pub fn scale(&self) -> f64 {
        self.beta
    }

    pub fn is_defined(&self) -> bool {
        self.theta.is_finite() && self.beta.is_finite()
    }

    /// Mean of the fitted distribution, `c·Γ(1 + 1/k)`
    pub fn average(&self) -> f64 {
        self.beta * libm::tgamma(1.0 + 1.0 / self.theta)
    }

    /// Probability density at `speed`, for plotting the fitted curve
    pub fn density(&self, speed: f64) -> f64 {
        if !self.is_defined() {
            return f64::NAN;
        }
        if speed < 0.0 {
            return 0.0;
        }
        let k = self.theta;
        let x = speed / self.beta;
        (k / self.beta) * x.powf(k - 1.0) * (-x.powf(k)).exp()
    }
}

fn coefficient_of_variation(shape: f64) -> f64 {
    let g1 = libm::tgamma(1.0 + 1.0 / shape);
    let g2 = libm::tgamma(1.0 + 2.0 / shape);
    (g2 / (g1 * g1) - 1.0).max(0.0).sqrt()
}

/// Finished wind statistics for one batch. Counts and energies are absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct WindStatistics {
    speed_frequencies: Vec<WindFrequencyBin>,
    direction_energy: Vec<WindDirectionEnergy>,
    weibull: WeibullFit,
    sample_count: usize,
    skipped: usize,
    mean_speed: f64,
}

impl WindStatistics {
    pub fn speed_frequencies(&self) -> &[WindFrequencyBin] {
        &self.speed_frequencies
    }

    pub fn direction_energy(&self) -> &[WindDirectionEnergy] {
        &self.direction_energy
    }

    pub fn weibull(&self) -> WeibullFit {
        self.weibull
    }

    pub fn theta(&self) -> f64 {
        self.weibull.theta
    }

    pub fn beta(&self) -> f64 {
        self.weibull.beta
    }

    pub fn weibull_average(&self) -> f64 {
        self.weibull.average()
    }

    /// Readings that landed in a speed bucket
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Readings with an invalid or out-of-domain speed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Mean of the raw speed samples; NaN without samples
    pub fn arithmetic_mean_speed(&self) -> f64 {
        self.mean_speed
    }

    /// Mean speed estimated from bucket midpoints; NaN without samples
    pub fn histogram_mean_speed(&self) -> f64 {
        let (weighted, total) = self
            .speed_frequencies
            .iter()
            .fold((0.0, 0usize), |(weighted, total), bin| {
                (weighted + bin.mid_speed() * bin.frequency as f64, total + bin.frequency)
            });
        if total == 0 {
            f64::NAN
        } else {
            weighted / total as f64
        }
    }
}

/// Streaming calculator for [`WindStatistics`]. Order of processing does not
/// affect the result.
#[derive(Debug, Clone)]
pub struct WindStatisticsCalculator {
    config: WindStatsConfig,
    bins: Vec<usize>,
    sector_frequency: Vec<usize>,
    sector_power: Vec<f64>,
    count: usize,
    sum: f64,
    sum_squares: f64,
    skipped: usize,
}

impl WindStatisticsCalculator {
    pub fn new(config: WindStatsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            bins: vec![0; config.speed_bins],
            sector_frequency: vec![0; config.direction_sectors],
            sector_power: vec![0.0; config.direction_sectors],
            config,
            count: 0,
            sum: 0.0,
            sum_squares: 0.0,
            skipped: 0,
        })
    }

    /// Run a whole batch through a fresh calculator
    pub fn calculate<'a, V, I>(
        config: WindStatsConfig,
        readings: I,
    ) -> Result<WindStatistics, ConfigError>
    where
        V: ChannelValues + 'a,
        I: IntoIterator<Item = &'a V>,
    {
        let mut calculator = Self::new(config)?;
        for reading in readings {
            calculator.process(reading);
        }
        Ok(calculator.finish())
    }

    pub fn config(&self) -> &WindStatsConfig {
        &self.config
    }

    /// Add one reading. Returns false when it was skipped.
    pub fn process<V: ChannelValues + ?Sized>(&mut self, reading: &V) -> bool {
        let speed = reading.wind_speed();
        if speed.is_nan() || !self.config.contains(speed) {
            self.skipped += 1;
            return false;
        }

        let bin = ((speed - self.config.min_speed) / self.config.bin_width()).floor() as usize;
        self.bins[bin.min(self.config.speed_bins - 1)] += 1;

        // Sums are taken relative to the domain floor to keep the variance stable
        let shifted = speed - self.config.min_speed;
        self.count += 1;
        self.sum += shifted;
        self.sum_squares += shifted * shifted;

        let direction = reading.wind_direction();
        if !direction.is_nan() {
            let width = self.config.sector_width();
            let sector = ((direction + width / 2.0).rem_euclid(360.0) / width).floor() as usize
                % self.config.direction_sectors;
            self.sector_frequency[sector] += 1;
            self.sector_power[sector] += speed * speed * speed;
        }

        true
    }

    pub fn finish(self) -> WindStatistics {
        let width = self.config.bin_width();
        let speed_frequencies = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &frequency)| WindFrequencyBin {
                speed_low: self.config.min_speed + width * i as f64,
                speed_high: self.config.min_speed + width * (i + 1) as f64,
                frequency,
            })
            .collect();

        let sector_width = self.config.sector_width();
        let direction_energy = self
            .sector_frequency
            .iter()
            .zip(&self.sector_power)
            .enumerate()
            .map(|(sector, (&frequency, &power))| WindDirectionEnergy {
                sector,
                direction: sector as f64 * sector_width,
                frequency,
                power,
            })
            .collect();

        let (mean_speed, weibull) = if self.count == 0 {
            (f64::NAN, WeibullFit::UNDEFINED)
        } else {
            let n = self.count as f64;
            let shifted_mean = self.sum / n;
            let variance = (self.sum_squares / n - shifted_mean * shifted_mean).max(0.0);
            let mean = shifted_mean + self.config.min_speed;
            (mean, WeibullFit::from_moments(mean, variance.sqrt()))
        };

        debug!(
            "Wind statistics: {} samples, {} skipped, shape {:.2}, scale {:.2}",
            self.count, self.skipped, weibull.theta, weibull.beta
        );

        WindStatistics {
            speed_frequencies,
            direction_energy,
            weibull,
            sample_count: self.count,
            skipped: self.skipped,
            mean_speed,
        }
    }
}
