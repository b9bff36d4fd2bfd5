use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sports or play facility.
///
/// Drafts are submissions awaiting moderation; published records are the
/// public listing. Field names match the JSON fixture format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playground {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub long: f64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub coating: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub author: String,
    #[serde(default = "Utc::now")]
    pub time_of_submission: DateTime<Utc>,
    /// Newest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub draft: bool,
}

impl Playground {
    /// True once the record carries real coordinates.
    pub fn is_geocoded(&self) -> bool {
        self.long != 0.0 || self.lat != 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub playground_id: i64,
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "Utc::now")]
    pub time_of_submission: DateTime<Utc>,
}

impl Comment {
    pub fn is_author(&self, username: &str) -> bool {
        self.author == username
    }
}
