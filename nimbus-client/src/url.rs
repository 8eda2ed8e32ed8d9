use reqwest::Url;

use nimbus_core::{NimbusError, Result};

/// Accepts a bare host or a full URL: a missing scheme gets `http://`
/// prepended, and trailing slashes are dropped so the endpoint path
/// never doubles up.
pub fn normalize_server_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Builds the `/weather.json` URL, URL-encoding the optional station
/// query.
pub fn weather_url(server: &str, station: Option<&str>) -> Result<Url> {
    let base = normalize_server_url(server);
    let mut url = Url::parse(&format!("{}/weather.json", base))
        .map_err(|error| NimbusError::InvalidUrl(format!("{}: {}", server, error)))?;

    if let Some(id) = station {
        url.query_pairs_mut().append_pair("station", id);
    }

    Ok(url)
}
