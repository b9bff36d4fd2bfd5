use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Coordinates, GeocodeError, Geocoder};

pub const DEFAULT_BASE_URL: &str = "https://api-adresse.data.gouv.fr/search/";

/// Client for the French national address API (GeoJSON answers).
pub struct ApiAdresse {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    /// `[long, lat]`
    coordinates: Vec<f64>,
}

impl ApiAdresse {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

/// Whitespace runs collapse to one separator.
fn collapse_whitespace(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_match(body: &[u8]) -> Result<Coordinates, GeocodeError> {
    let collection: FeatureCollection = serde_json::from_slice(body)?;
    let feature = collection.features.into_iter().next().ok_or(GeocodeError::NoMatch)?;
    match feature.geometry.coordinates[..] {
        [longitude, latitude, ..] => Ok(Coordinates::new(longitude, latitude)),
        _ => Err(GeocodeError::NoMatch),
    }
}

#[async_trait]
impl Geocoder for ApiAdresse {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let q = collapse_whitespace(address);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", q.as_str()), ("limit", "1")])
            .send()
            .await
            .inspect_err(|e| warn!("Geocoder request for '{}' failed: {}", q, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Geocoder answered {} for '{}'", status, q);
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let coordinates = first_match(&body)
            .inspect_err(|e| warn!("Geocoder gave no usable match for '{}': {:?}", q, e))?;
        debug!("Resolved '{}' to {:?}", q, coordinates);
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    async fn stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/search/", addr)
    }

    fn client(url: String) -> ApiAdresse {
        ApiAdresse::new(url, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn resolves_first_feature() {
        let app = Router::new().route(
            "/search/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("q").map(String::as_str), Some("1 rue de Rivoli Paris"));
                assert_eq!(params.get("limit").map(String::as_str), Some("1"));
                Json(serde_json::json!({
                    "type": "FeatureCollection",
                    "features": [
                        {"geometry": {"type": "Point", "coordinates": [2.372452, 48.886835]}},
                        {"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
                    ]
                }))
            }),
        );
        let geocoder = client(stub(app).await);

        let found = geocoder.resolve("  1 rue   de Rivoli\tParis ").await.unwrap();
        assert_eq!(found, Coordinates::new(2.372452, 48.886835));
    }

    #[tokio::test]
    async fn every_failure_reads_the_same() {
        let app = Router::new()
            .route(
                "/search/",
                get(|| async { Json(serde_json::json!({"features": []})) }),
            )
            .route("/broken/", get(|| async { StatusCode::BAD_GATEWAY }))
            .route("/garbage/", get(|| async { "not json" }))
            .route(
                "/short/",
                get(|| async {
                    Json(serde_json::json!({"features": [{"geometry": {"coordinates": [2.3]}}]}))
                }),
            );
        let base = stub(app).await;

        for path in ["/search/", "/broken/", "/garbage/", "/short/"] {
            let url = base.replace("/search/", path);
            let err = client(url).resolve("nowhere").await.unwrap_err();
            assert!(
                err.to_string().starts_with("could not resolve address"),
                "{path}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}/search/", addr))
            .resolve("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::Transport(_)));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace(" a \n b\t\tc "), "a b c");
    }
}
