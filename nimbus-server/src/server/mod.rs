use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};

use nimbus_core::{now_millis, DataFile, LamportClock, Result, WeatherStore};

mod weather;

use weather::handle_weather;

pub const DEFAULT_PORT: u16 = 4567;

pub struct AppState {
    pub(crate) store: Mutex<WeatherStore>,
    pub(crate) clock: LamportClock,
    pub(crate) data_file: DataFile,
}

impl AppState {
    pub fn new(data_file: DataFile) -> Self {
        Self {
            store: Mutex::new(WeatherStore::new()),
            clock: LamportClock::new(),
            data_file,
        }
    }

    /// Rehydrates the store from the data file. Returns the number of
    /// stations recovered; a parse failure propagates so the caller
    /// can log it and continue with an empty store.
    pub async fn recover(&self) -> Result<usize> {
        match self.data_file.read().await? {
            Some(records) => {
                let mut store = self.store.lock().await;
                store.load_snapshot(records, &self.clock);
                Ok(store.len())
            }
            None => Ok(0),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/weather.json", any(handle_weather))
        .with_state(state)
}

/// Once per second, drops expired stations and reflushes the data
/// file when anything was removed. The store lock is held across the
/// flush so the file always matches a consistent snapshot.
pub fn spawn_expiry_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let mut store = state.store.lock().await;
            if store.sweep(now_millis()) {
                let snapshot = store.snapshot();
                if let Err(error) = state.data_file.write(&snapshot).await {
                    tracing::error!("failed to persist store after expiry sweep: {}", error);
                }
            }
        }
    })
}

pub async fn run_server(port: u16, data_path: PathBuf) -> Result<()> {
    let state = Arc::new(AppState::new(DataFile::new(data_path)));

    match state.recover().await {
        Ok(0) => {}
        Ok(count) => tracing::info!(
            "recovered {} station(s) from {}",
            count,
            state.data_file.path().display()
        ),
        Err(error) => {
            tracing::warn!("ignoring unreadable data file, starting empty: {}", error)
        }
    }

    spawn_expiry_sweeper(state.clone());

    let app = router(state);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("aggregation server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
