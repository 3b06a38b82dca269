use time::macros::datetime;
use time::Duration;

use station_stats::stats::{
    Aggregator, Completion, RecomputeCoalescer, Representative, WindStatisticsCalculator,
    WindStatsConfig,
};
use station_stats::telegram::{decode_all, encode, encode_bytes};
use station_stats::{ChannelValues, Reading, ReadingValue};

fn transport_buffer(values: &[ReadingValue]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| encode_bytes(&encode(v)))
        .collect()
}

fn sample_values() -> Vec<ReadingValue> {
    (0..12)
        .map(|i| {
            ReadingValue::new(
                10.0 + i as f64 * 0.5,
                100_000.0 + i as f64 * 20.0,
                0.40 + i as f64 * 0.01,
                (i * 30) as f64,
                2.0 + (i % 4) as f64,
            )
        })
        .collect()
}

#[test]
fn bytes_to_window_summaries() {
    let values = sample_values();
    let buffer = transport_buffer(&values);
    let start = datetime!(2024-06-01 12:00 UTC);

    let readings: Vec<Reading> = decode_all(&buffer)
        .enumerate()
        .map(|(i, packed)| {
            let packed = packed.unwrap();
            assert!(packed.is_valid());
            Reading::new(start + Duration::seconds(10 * i as i64), ReadingValue::from(packed))
        })
        .collect();
    assert_eq!(readings.len(), values.len());

    let mut aggregator: Aggregator = readings.iter().copied().collect();
    let (summary, ranges) = aggregator.close(Representative::Mean);

    assert_eq!(summary.count(), 12);
    assert_eq!(summary.begin_stamp(), start);
    assert_eq!(summary.time_span(), Duration::seconds(110));
    assert!((summary.values().temperature - 12.75).abs() < 0.06);

    let temperature = ranges.ranges().temperature().unwrap();
    assert!((temperature.low() - 10.0).abs() < 0.06);
    assert!((temperature.high() - 15.5).abs() < 0.06);
    assert_eq!(ranges.min().stamp, start);
    assert!(aggregator.is_empty());
}

#[test]
fn truncated_transport_reports_the_fragment() {
    let mut buffer = transport_buffer(&sample_values()[..2]);
    buffer.extend_from_slice(&[0x12, 0x34, 0x56]);

    let decoded: Vec<_> = decode_all(&buffer).collect();
    assert_eq!(decoded.len(), 3);
    assert!(decoded[0].is_ok());
    assert!(decoded[1].is_ok());
    assert!(decoded[2].is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn coalesced_wind_statistics() {
    let buffer = transport_buffer(&sample_values());
    let history: Vec<ReadingValue> = decode_all(&buffer)
        .map(|packed| ReadingValue::from(packed.unwrap()))
        .collect();

    let config = WindStatsConfig::default();
    let (coalescer, mut completions) = RecomputeCoalescer::spawn(move |batch: Vec<ReadingValue>| {
        WindStatisticsCalculator::calculate(config, batch.iter())
    });

    let seq = coalescer.submit(history.clone());
    let statistics = match completions.recv().await {
        Some(Completion::Finished { seq: done, result }) => {
            assert_eq!(done, seq);
            result
        }
        other => panic!("unexpected completion {:?}", other),
    };

    assert_eq!(statistics.sample_count(), 12);
    assert_eq!(statistics.skipped(), 0);
    let total: usize = statistics.speed_frequencies().iter().map(|b| b.frequency).sum();
    assert_eq!(total, 12);

    let mean = history.iter().map(|v| v.wind_speed).sum::<f64>() / 12.0;
    assert!((statistics.weibull_average() - mean).abs() / mean < 1e-6);

    coalescer.shutdown().await;
    assert!(completions.recv().await.is_none());
}
