//! Periodic producer: reads a station file once, then PUTs the record
//! to the aggregator on a fixed interval with bounded retry.

use std::path::Path;

use reqwest::{Client, StatusCode, Url};
use tokio::time::{sleep, Duration};

use nimbus_core::{
    codec, LamportClock, NimbusError, Record, Result, ID_FIELD, LAMPORT_CLOCK_HEADER,
};

use crate::clock::merge_response_clock;
use crate::retry::{with_retry, MAX_RETRIES, RETRY_DELAY_MS};
use crate::url::weather_url;

pub const UPDATE_INTERVAL_MS: u64 = 10_000;

/// Parses a line-oriented `key: value` station file. Each line splits
/// on the first `:` only, so a value keeps any later colons; lines
/// without a colon are skipped; both sides are trimmed. The file must
/// provide an `id`.
pub fn read_station_file(path: &Path) -> Result<Record> {
    let content = std::fs::read_to_string(path)?;
    let mut record = Record::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            record.insert(key.trim(), value.trim());
        }
    }

    if record.get(ID_FIELD).is_none() {
        return Err(NimbusError::MissingId);
    }
    Ok(record)
}

/// Runs the upload loop. A negative `cycles` runs forever; a positive
/// bound stops after that many cycles. A cycle whose retries are
/// exhausted is abandoned and the loop carries on.
pub async fn run_producer(server_url: &str, file_path: &Path, cycles: i64) -> Result<()> {
    let record = read_station_file(file_path)?;
    let url = weather_url(server_url, None)?;
    let client = Client::builder()
        .user_agent(concat!("nimbus-producer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| NimbusError::Http(error.to_string()))?;
    let clock = LamportClock::new();

    let mut completed = 0i64;
    while cycles < 0 || completed < cycles {
        // Cycle event.
        clock.tick();
        let body = codec::encode(&record);

        let upload = with_retry(
            "weather upload",
            MAX_RETRIES,
            Duration::from_millis(RETRY_DELAY_MS),
            |_| put_record(&client, &url, &body, &clock),
        )
        .await;

        match upload {
            Ok(status) => {
                tracing::info!("weather data uploaded with status {}", status);
            }
            Err(error) => {
                tracing::warn!("abandoning this update cycle: {}", error);
            }
        }

        completed += 1;
        if cycles < 0 || completed < cycles {
            sleep(Duration::from_millis(UPDATE_INTERVAL_MS)).await;
        }
    }

    Ok(())
}

/// One PUT attempt. The clock ticks for the send event on every
/// attempt, and the server's response clock is merged back in.
async fn put_record(
    client: &Client,
    url: &Url,
    body: &str,
    clock: &LamportClock,
) -> Result<StatusCode> {
    let stamp = clock.tick();
    let response = client
        .put(url.clone())
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(LAMPORT_CLOCK_HEADER, stamp.to_string())
        .body(body.to_string())
        .send()
        .await
        .map_err(|error| NimbusError::Http(error.to_string()))?;

    merge_response_clock(&response, clock);

    let status = response.status();
    if status == StatusCode::OK || status == StatusCode::CREATED {
        Ok(status)
    } else {
        Err(NimbusError::Http(format!(
            "server responded with status {}",
            status
        )))
    }
}
