//! Database row types. These map directly to SQLite rows and are converted
//! into the shared `playground-types` models at the query boundary.

use chrono::{DateTime, Utc};
use tracing::warn;

use playground_types::models::{Comment, Playground};

pub struct PlaygroundRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub department: String,
    pub long: f64,
    pub lat: f64,
    pub coating: String,
    pub kind: String,
    pub open: bool,
    pub author: String,
    pub time_of_submission: String,
    pub draft: bool,
}

pub struct CommentRow {
    pub playground_id: i64,
    pub id: i64,
    pub content: String,
    pub author: String,
    pub time_of_submission: String,
}

impl PlaygroundRow {
    pub fn into_playground(self, comments: Vec<Comment>) -> Playground {
        let time_of_submission = parse_timestamp(&self.time_of_submission, "playground", self.id);
        Playground {
            id: self.id,
            name: self.name,
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            department: self.department,
            long: self.long,
            lat: self.lat,
            coating: self.coating,
            kind: self.kind,
            open: self.open,
            author: self.author,
            time_of_submission,
            comments,
            draft: self.draft,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let time_of_submission = parse_timestamp(&row.time_of_submission, "comment", row.id);
        Comment {
            id: row.id,
            playground_id: row.playground_id,
            content: row.content,
            author: row.author,
            time_of_submission,
        }
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_timestamp(raw: &str, what: &str, id: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt time_of_submission '{}' on {} {}: {}", raw, what, id, e);
            DateTime::default()
        })
}
