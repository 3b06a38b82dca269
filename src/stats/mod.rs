pub mod aggregate;
pub mod coalescer;
pub mod wind;

pub use aggregate::{Aggregator, ReadingAggregate, ReadingRangeAggregate, Representative};
pub use coalescer::{Completion, RecomputeCoalescer};
pub use wind::{
    WeibullFit, WindDirectionEnergy, WindFrequencyBin, WindStatistics, WindStatisticsCalculator,
    WindStatsConfig,
};
