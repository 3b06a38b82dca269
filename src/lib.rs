//! Weather-station telegram codec and statistics engine.
//!
//! Raw 8-byte telegrams decode into [`PackedReading`]s, which convert to
//! [`ReadingValue`]s for windowed aggregation and wind-resource statistics.

pub mod config;
pub mod derived;
pub mod error;
pub mod models;
pub mod range;
pub mod stats;
pub mod telegram;
pub mod utils;

pub use error::{ConfigError, FormatError, WorkerError};
pub use models::{Channel, ChannelValues, Reading, ReadingValue};
pub use range::{NumericRange, ReadingValueRange, TimeRange};
pub use telegram::{PackedFlags, PackedReading};
