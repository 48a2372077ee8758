use crate::models::{TelemetryFeed, TelemetryReading};

/// Readings kept per sensor view. Older readings stay in the store.
pub const HISTORY_WINDOW: usize = 100;

/// Pulls one sensor's readings out of every batch, stamps each with its
/// entry timestamp, and returns the latest [`HISTORY_WINDOW`] in ascending
/// time order.
///
/// Entries without a timestamp are skipped. Batch ids play no part in the
/// ordering. Ties keep feed order, so the result is stable for a given feed.
pub fn sensor_history(feed: &TelemetryFeed, floor: &str, sensor: &str) -> Vec<TelemetryReading> {
    let mut readings: Vec<TelemetryReading> = feed
        .entries()
        .filter_map(|entry| {
            let timestamp = entry.timestamp?;
            let reading = entry.floors.get(floor)?.get(sensor)?;

            Some(reading.with_timestamp(timestamp))
        })
        .collect();

    readings.sort_by_key(|reading| reading.timestamp);

    let excess = readings.len().saturating_sub(HISTORY_WINDOW);
    readings.drain(..excess);

    readings
}
