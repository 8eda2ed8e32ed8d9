//! One-shot consumer: fetches a record from the aggregator and
//! pretty-prints it.

use reqwest::{Client, StatusCode};
use tokio::time::Duration;

use nimbus_core::{
    codec, LamportClock, NimbusError, Record, Result, LAMPORT_CLOCK_HEADER, LAMPORT_FIELD,
};

use crate::clock::merge_response_clock;
use crate::retry::{with_retry, MAX_RETRIES, RETRY_DELAY_MS};
use crate::url::weather_url;

/// One aggregator read. `None` means the server has no data for the
/// request (204), which is not an error.
pub async fn fetch_weather(
    client: &Client,
    server_url: &str,
    station: Option<&str>,
    clock: &LamportClock,
) -> Result<Option<String>> {
    let url = weather_url(server_url, station)?;
    let stamp = clock.tick();

    let response = client
        .get(url)
        .header(LAMPORT_CLOCK_HEADER, stamp.to_string())
        .send()
        .await
        .map_err(|error| NimbusError::Http(error.to_string()))?;

    merge_response_clock(&response, clock);

    match response.status() {
        StatusCode::OK => {
            let body = response
                .text()
                .await
                .map_err(|error| NimbusError::Http(error.to_string()))?;
            Ok(Some(body))
        }
        StatusCode::NO_CONTENT => Ok(None),
        status => Err(NimbusError::Http(format!(
            "GET request failed with status {}",
            status
        ))),
    }
}

/// Decodes a response body: a single flat object, or an array of
/// objects when reading a persisted-form payload.
pub fn decode_body(body: &str) -> Result<Vec<Record>> {
    if body.trim_start().starts_with('[') {
        codec::decode_array(body)
    } else {
        codec::decode(body).map(|record| vec![record])
    }
}

/// `  key: value` per field with a blank line after each record. The
/// aggregator-internal `lamportClock` stamp is hidden.
pub fn render_records(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        for (key, value) in record.iter() {
            if key == LAMPORT_FIELD {
                continue;
            }
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub async fn run_consumer(server_url: &str, station: Option<&str>) -> Result<()> {
    let client = Client::builder()
        .user_agent(concat!("nimbus-consumer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| NimbusError::Http(error.to_string()))?;
    let clock = LamportClock::new();

    let body = with_retry(
        "weather fetch",
        MAX_RETRIES,
        Duration::from_millis(RETRY_DELAY_MS),
        |_| fetch_weather(&client, server_url, station, &clock),
    )
    .await?;

    match body {
        None => println!("No weather data available for the specified station."),
        Some(body) => match decode_body(&body) {
            Ok(records) => {
                println!("Weather Data:");
                print!("{}", render_records(&records));
            }
            Err(error) => {
                tracing::warn!("skipping malformed record from server: {}", error);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields.iter().copied().collect()
    }

    #[test]
    fn decode_body_accepts_a_single_object() {
        let records = decode_body("{\"id\": \"A\", \"air_temp\": 13.3}").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("A"));
    }

    #[test]
    fn decode_body_accepts_a_persisted_array() {
        let body = codec::encode_array(&[
            record(&[("id", "A")]),
            record(&[("id", "B")]),
        ]);
        let records = decode_body(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id(), Some("B"));
    }

    #[test]
    fn render_hides_the_lamport_stamp() {
        let records = vec![record(&[
            ("id", "IDS60901"),
            ("air_temp", "13.3"),
            (LAMPORT_FIELD, "17"),
        ])];

        let rendered = render_records(&records);
        assert_eq!(rendered, "  id: IDS60901\n  air_temp: 13.3\n\n");
        assert!(!rendered.contains("lamportClock"));
    }

    #[test]
    fn render_separates_records_with_a_blank_line() {
        let records = vec![record(&[("id", "A")]), record(&[("id", "B")])];
        assert_eq!(render_records(&records), "  id: A\n\n  id: B\n\n");
    }
}
