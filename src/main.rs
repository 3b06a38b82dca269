use std::sync::Arc;

use log::{error, info, warn};
use time::OffsetDateTime;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use station_stats::config::StationConfig;
use station_stats::derived::{air_density, dew_point, DerivedRanges};
use station_stats::stats::{
    Aggregator, Completion, RecomputeCoalescer, Representative, WindStatistics,
    WindStatisticsCalculator,
};
use station_stats::telegram::decode_hex;
use station_stats::utils::{duration_to_seconds, format_datetime, from_posix};
use station_stats::{Channel, Reading, ReadingValue};

/// Parse one `<posix-seconds> <16 hex digits>` replay line
fn parse_line(line: &str) -> Result<Reading, Box<dyn std::error::Error>> {
    let mut fields = line.split_whitespace();
    let stamp = fields.next().ok_or("missing timestamp")?.parse::<i32>()?;
    let telegram = decode_hex(fields.next().ok_or("missing telegram")?)?;
    Ok(Reading::new(from_posix(stamp), ReadingValue::from(telegram)))
}

fn log_window(aggregator: &mut Aggregator, derived: DerivedRanges, config: &StationConfig) {
    let (summary, ranges) = aggregator.close(Representative::Mean);
    let display = ranges.ranges().with_minimum_sizes(&config.min_range_sizes);
    let derived =
        derived.with_minimum_sizes(config.min_dew_point_range, config.min_air_density_range);

    info!(
        "Window {} -> {} ({} s): {} samples",
        format_datetime(&summary.begin_stamp()),
        format_datetime(&summary.end_stamp()),
        duration_to_seconds(summary.time_span()),
        summary.count()
    );
    info!("  Mean: {}", summary.values());
    for channel in Channel::ALL {
        match display.get(channel) {
            Some(range) => info!(
                "  {} display range: {:.3} .. {:.3}",
                channel.name(),
                range.low(),
                range.high()
            ),
            None => info!("  {}: no valid samples", channel.name()),
        }
    }
    info!(
        "  Dew point {:.1} °C, air density {:.3} kg/m³",
        dew_point(summary.values()),
        air_density(summary.values())
    );
    if let Some(range) = derived.dew_point() {
        info!(
            "  dew point display range: {:.1} .. {:.1}",
            range.low(),
            range.high()
        );
    }
    if let Some(range) = derived.air_density() {
        info!(
            "  air density display range: {:.3} .. {:.3}",
            range.low(),
            range.high()
        );
    }
}

fn log_wind(statistics: &WindStatistics) {
    info!(
        "Wind statistics: {} samples ({} skipped), mean {:.2} m/s",
        statistics.sample_count(),
        statistics.skipped(),
        statistics.arithmetic_mean_speed()
    );
    info!(
        "  Weibull shape {:.2}, scale {:.2} m/s, fitted mean {:.2} m/s",
        statistics.theta(),
        statistics.beta(),
        statistics.weibull_average()
    );
    if let Some(strongest) = statistics
        .direction_energy()
        .iter()
        .max_by(|a, b| a.power.total_cmp(&b.power))
        .filter(|sector| sector.frequency > 0)
    {
        info!(
            "  Most energetic sector: {:.1}° ({} samples)",
            strongest.direction, strongest.frequency
        );
    }
}

async fn replay(config: StationConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Replaying station telegrams from stdin");

    let wind = config.wind;
    // Closed windows are shared, so each submit copies only the handles
    let (coalescer, mut completions) =
        RecomputeCoalescer::spawn(move |history: Vec<Arc<[Reading]>>| {
            WindStatisticsCalculator::calculate(wind, history.iter().flat_map(|w| w.iter()))
        });

    let reporter = tokio::spawn(async move {
        while let Some(completion) = completions.recv().await {
            match completion {
                Completion::Finished { seq, result } => {
                    info!("Statistics batch {} complete", seq);
                    log_wind(&result);
                }
                Completion::Failed { seq, error } => {
                    error!("Statistics batch {} failed: {}", seq, error)
                }
            }
        }
    });

    let mut lines = BufReader::new(stdin()).lines();
    let mut aggregator = Aggregator::new();
    let mut derived = DerivedRanges::new();
    let mut window_start: Option<OffsetDateTime> = None;
    let mut window: Vec<Reading> = Vec::new();
    let mut history: Vec<Arc<[Reading]>> = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let reading = match parse_line(&line) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Skipping line '{}': {}", line, e);
                continue;
            }
        };

        let start = *window_start.get_or_insert(reading.stamp);
        if reading.stamp - start >= config.window {
            log_window(&mut aggregator, std::mem::take(&mut derived), &config);
            history.push(Arc::from(std::mem::take(&mut window)));
            coalescer.submit(history.clone());
            window_start = Some(reading.stamp);
        }

        aggregator.push(&reading);
        derived.fold(&reading.values);
        window.push(reading);
    }

    if !aggregator.is_empty() {
        log_window(&mut aggregator, derived, &config);
        history.push(Arc::from(window));
        coalescer.submit(history);
    }

    // Runs the last submitted batch before the reporter drains
    coalescer.shutdown().await;
    reporter.await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                // keep the sender alive so replay is not cut short
                let _tx = tx;
                std::future::pending::<()>().await;
            }
        }
    });

    tokio::select! {
        result = replay(config) => {
            match result {
                Ok(_) => info!("Replay completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
