//! Address lookup and distance ranking.

pub mod api_adresse;
pub mod proximity;

use async_trait::async_trait;
use thiserror::Error;

pub use api_adresse::ApiAdresse;
pub use proximity::{Located, nearest, rank};

/// A point in raw degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }
}

/// Why an address could not be turned into coordinates. The display text is
/// the same for every cause; the detail is only meant for logs.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("could not resolve address: request failed")]
    Transport(#[from] reqwest::Error),

    #[error("could not resolve address: upstream answered {0}")]
    Status(u16),

    #[error("could not resolve address: unreadable response")]
    Decode(#[from] serde_json::Error),

    #[error("could not resolve address: no match")]
    NoMatch,
}

/// Resolves a free-text address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}
