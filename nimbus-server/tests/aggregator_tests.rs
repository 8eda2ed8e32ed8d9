//! HTTP surface tests driven over a real listener.

use std::sync::Arc;

use nimbus_core::{codec, DataFile, LamportClock, DATA_FILE, LAMPORT_CLOCK_HEADER};
use nimbus_server::{router, AppState};
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    dir: TempDir,
}

async fn spawn_server() -> TestServer {
    spawn_server_in(tempfile::tempdir().unwrap()).await
}

async fn spawn_server_in(dir: TempDir) -> TestServer {
    let state = Arc::new(AppState::new(DataFile::new(dir.path().join(DATA_FILE))));
    state.recover().await.unwrap();

    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        dir,
    }
}

impl TestServer {
    fn endpoint(&self) -> String {
        format!("{}/weather.json", self.base_url)
    }
}

async fn put_record(server: &TestServer, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .put(server.endpoint())
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

fn response_clock(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(LAMPORT_CLOCK_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap()
}

#[tokio::test]
async fn first_put_is_created_then_updated() {
    let server = spawn_server().await;

    let first = put_record(&server, "{\"id\": \"A\", \"temperature\": \"25\"}").await;
    assert_eq!(first.status(), 201);
    assert!(response_clock(&first) >= 1);
    assert_eq!(first.text().await.unwrap(), "Success");

    let second = put_record(&server, "{\"id\": \"A\", \"temperature\": \"26\"}").await;
    assert_eq!(second.status(), 200);
}

#[tokio::test]
async fn get_returns_the_stored_record() {
    let server = spawn_server().await;
    put_record(&server, "{\"id\": \"A\", \"temperature\": 25}").await;

    let response = reqwest::Client::new()
        .get(server.endpoint())
        .query(&[("station", "A")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let record = codec::decode(&response.text().await.unwrap()).unwrap();
    assert_eq!(record.id(), Some("A"));
    assert_eq!(record.get("temperature"), Some("25"));
    // The server-side view carries the ingest stamp.
    assert!(record.get("lamportClock").is_some());
}

#[tokio::test]
async fn get_without_query_returns_the_most_recent_station() {
    let server = spawn_server().await;
    put_record(&server, "{\"id\": \"A\", \"temperature\": 1}").await;
    put_record(&server, "{\"id\": \"B\", \"temperature\": 2}").await;

    let response = reqwest::get(server.endpoint()).await.unwrap();
    assert_eq!(response.status(), 200);
    let record = codec::decode(&response.text().await.unwrap()).unwrap();
    assert_eq!(record.id(), Some("B"));
}

#[tokio::test]
async fn empty_store_is_204() {
    let server = spawn_server().await;
    let response = reqwest::get(server.endpoint()).await.unwrap();
    assert_eq!(response.status(), 204);
    assert!(response.headers().get(LAMPORT_CLOCK_HEADER).is_some());
}

#[tokio::test]
async fn unknown_station_is_204() {
    let server = spawn_server().await;
    put_record(&server, "{\"id\": \"A\"}").await;

    let response = reqwest::Client::new()
        .get(server.endpoint())
        .query(&[("station", "missing")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn trailing_comma_body_is_500() {
    let server = spawn_server().await;
    let response = put_record(&server, "{ \"id\": \"C\", }").await;
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "Internal Server Error");
}

#[tokio::test]
async fn missing_id_is_400() {
    let server = spawn_server().await;
    let response = put_record(&server, "{\"temperature\": \"25\"}").await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Missing 'id' field");
}

#[tokio::test]
async fn unsupported_method_is_400() {
    let server = spawn_server().await;
    let response = reqwest::Client::new()
        .post(server.endpoint())
        .body("{\"id\": \"A\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Bad Request");
}

#[tokio::test]
async fn empty_body_put_is_204() {
    let server = spawn_server().await;
    let response = put_record(&server, "").await;
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn invalid_lamport_header_is_400() {
    let server = spawn_server().await;
    let response = reqwest::Client::new()
        .put(server.endpoint())
        .header(LAMPORT_CLOCK_HEADER, "not-a-clock")
        .body("{\"id\": \"A\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid Lamport Clock");
}

#[tokio::test]
async fn response_clock_dominates_request_clock() {
    let server = spawn_server().await;

    let put = reqwest::Client::new()
        .put(server.endpoint())
        .header(LAMPORT_CLOCK_HEADER, "100")
        .body("{\"id\": \"A\"}")
        .send()
        .await
        .unwrap();
    let put_clock = response_clock(&put);
    assert!(put_clock > 100);

    let get = reqwest::get(server.endpoint()).await.unwrap();
    assert!(response_clock(&get) > put_clock);

    // The stored record was stamped after the merge, so its clock
    // also dominates the peer's.
    let record = codec::decode(&get.text().await.unwrap()).unwrap();
    let stamp: u64 = record.get("lamportClock").unwrap().parse().unwrap();
    assert!(stamp > 100);
}

#[tokio::test]
async fn overflow_evicts_the_earliest_station() {
    let server = spawn_server().await;
    for index in 1..=21 {
        let response =
            put_record(&server, &format!("{{\"id\": \"S{}\", \"n\": {}}}", index, index)).await;
        assert_eq!(response.status(), 201);
    }

    let evicted = reqwest::Client::new()
        .get(server.endpoint())
        .query(&[("station", "S1")])
        .send()
        .await
        .unwrap();
    assert_eq!(evicted.status(), 204);

    let latest = reqwest::get(server.endpoint()).await.unwrap();
    let record = codec::decode(&latest.text().await.unwrap()).unwrap();
    assert_eq!(record.id(), Some("S21"));
}

#[tokio::test]
async fn restart_recovers_the_persisted_store() {
    let first = spawn_server().await;
    put_record(&first, "{\"id\": \"A\", \"temperature\": \"25\"}").await;
    assert!(first.dir.path().join(DATA_FILE).exists());

    // A new aggregator over the same data file sees the station.
    let second = spawn_server_in(first.dir).await;
    let response = reqwest::Client::new()
        .get(second.endpoint())
        .query(&[("station", "A")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let record = codec::decode(&response.text().await.unwrap()).unwrap();
    assert_eq!(record.get("temperature"), Some("25"));
}

#[tokio::test]
async fn producer_and_consumer_round_trip() {
    let server = spawn_server().await;

    let station_file = server.dir.path().join("station.txt");
    std::fs::write(&station_file, "id: IDS60901\nair_temp: 13.3\nwind_dir: S\n").unwrap();

    nimbus_client::producer::run_producer(&server.base_url, &station_file, 1)
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let clock = LamportClock::new();
    let body =
        nimbus_client::consumer::fetch_weather(&client, &server.base_url, Some("IDS60901"), &clock)
            .await
            .unwrap()
            .expect("station should be present");

    let records = nimbus_client::consumer::decode_body(&body).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("air_temp"), Some("13.3"));
    // The consumer merged the server's response clock.
    assert!(clock.current() > 1);
}
