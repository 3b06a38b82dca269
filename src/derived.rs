/// Quantities calculated from a reading's measured channels
use crate::models::ChannelValues;
use crate::range::NumericRange;

// Magnus coefficients over water
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7; // °C
const SATURATION_PRESSURE_AT_ZERO: f64 = 610.78; // Pa

const GAS_CONSTANT_DRY_AIR: f64 = 287.058; // J/(kg·K)
const GAS_CONSTANT_WATER_VAPOUR: f64 = 461.495; // J/(kg·K)
const ZERO_CELSIUS: f64 = 273.15; // K

fn magnus(temperature: f64) -> f64 {
    MAGNUS_A * temperature / (MAGNUS_B + temperature)
}

/// Saturation vapour pressure over water in Pa
pub fn saturation_vapour_pressure(temperature: f64) -> f64 {
    SATURATION_PRESSURE_AT_ZERO * magnus(temperature).exp()
}

/// Dew point in °C. NaN unless temperature is valid and humidity is valid and
/// positive.
pub fn dew_point<V: ChannelValues + ?Sized>(reading: &V) -> f64 {
    let (temperature, humidity) = (reading.temperature(), reading.humidity());
    if temperature.is_nan() || !(humidity > 0.0) {
        return f64::NAN;
    }
    let gamma = humidity.ln() + magnus(temperature);
    MAGNUS_B * gamma / (MAGNUS_A - gamma)
}

/// Density of moist air in kg/m³, treating dry air and water vapour as ideal
/// gases. NaN unless temperature, pressure and humidity are all valid.
pub fn air_density<V: ChannelValues + ?Sized>(reading: &V) -> f64 {
    let (temperature, pressure, humidity) = (
        reading.temperature(),
        reading.pressure(),
        reading.humidity(),
    );
    if temperature.is_nan() || pressure.is_nan() || humidity.is_nan() {
        return f64::NAN;
    }

    let kelvin = temperature + ZERO_CELSIUS;
    let vapour = humidity.clamp(0.0, 1.0) * saturation_vapour_pressure(temperature);
    let dry = pressure - vapour;
    dry / (GAS_CONSTANT_DRY_AIR * kelvin) + vapour / (GAS_CONSTANT_WATER_VAPOUR * kelvin)
}

fn widen(range: Option<NumericRange>, value: f64) -> Option<NumericRange> {
    if value.is_nan() {
        return range;
    }
    Some(match range {
        Some(range) => range.encompass(value),
        None => NumericRange::point(value),
    })
}

/// Running ranges of dew point and air density over a window. A quantity
/// stays absent until some reading yields it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedRanges {
    dew_point: Option<NumericRange>,
    air_density: Option<NumericRange>,
}

impl DerivedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold<V: ChannelValues + ?Sized>(&mut self, reading: &V) {
        self.dew_point = widen(self.dew_point, dew_point(reading));
        self.air_density = widen(self.air_density, air_density(reading));
    }

    pub fn dew_point(&self) -> Option<NumericRange> {
        self.dew_point
    }

    pub fn air_density(&self) -> Option<NumericRange> {
        self.air_density
    }

    /// Widen each range to its minimum display size
    pub fn with_minimum_sizes(&self, dew_point: f64, air_density: f64) -> Self {
        Self {
            dew_point: self.dew_point.map(|r| r.with_minimum_size(dew_point)),
            air_density: self.air_density.map(|r| r.with_minimum_size(air_density)),
        }
    }
}
