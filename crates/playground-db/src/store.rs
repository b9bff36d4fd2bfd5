use chrono::{DateTime, Utc};
use thiserror::Error;

use playground_types::models::{Comment, Playground};

use crate::validation::FieldErrors;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("playground {0} not found")]
    PlaygroundNotFound(i64),

    #[error("comment {comment_id} not found on playground {playground_id}")]
    CommentNotFound { playground_id: i64, comment_id: i64 },

    /// Field-level format problems, every offending field listed.
    #[error("invalid fields ({0})")]
    Invalid(FieldErrors),

    /// Name, address or coordinates collide with an existing record.
    #[error("already exists ({0})")]
    Conflict(FieldErrors),

    #[error("{username} is not the author of this record")]
    Forbidden { username: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A facility proposal, stored as a draft.
#[derive(Debug, Clone)]
pub struct NewPlayground {
    pub name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub department: String,
    pub author: String,
    pub time_of_submission: DateTime<Utc>,
}

impl NewPlayground {
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
            department: self.department.trim().to_string(),
            author: self.author.trim().to_string(),
            time_of_submission: self.time_of_submission,
        }
    }

    pub(crate) fn into_draft(self, id: i64) -> Playground {
        Playground {
            id,
            name: self.name,
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            department: self.department,
            long: 0.0,
            lat: 0.0,
            coating: String::new(),
            kind: String::new(),
            open: false,
            author: self.author,
            time_of_submission: self.time_of_submission,
            comments: Vec::new(),
            draft: true,
        }
    }
}

/// Moderation data applied when a draft is published.
///
/// Name, author and submission time are kept from the draft.
#[derive(Debug, Clone)]
pub struct Promotion {
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub department: String,
    pub long: f64,
    pub lat: f64,
    pub coating: String,
    pub kind: String,
    pub open: bool,
}

impl Promotion {
    pub fn trimmed(self) -> Self {
        Self {
            address: self.address.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
            department: self.department.trim().to_string(),
            coating: self.coating.trim().to_string(),
            kind: self.kind.trim().to_string(),
            ..self
        }
    }

    pub(crate) fn apply(self, draft: Playground) -> Playground {
        Playground {
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            department: self.department,
            long: self.long,
            lat: self.lat,
            coating: self.coating,
            kind: self.kind,
            open: self.open,
            draft: false,
            ..draft
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub author: String,
    pub time_of_submission: DateTime<Utc>,
}

/// Authoritative collection of playgrounds and their comments.
///
/// Every mutating call validates before committing. Implementations are
/// synchronous; async callers run them on the blocking pool.
pub trait PlaygroundStore: Send + Sync {
    /// Published playgrounds sorted by name, case-insensitively.
    fn all_playgrounds(&self) -> StoreResult<Vec<Playground>>;

    fn playground(&self, id: i64) -> StoreResult<Playground>;

    /// Drafts sorted by name, case-insensitively.
    fn all_submitted_playgrounds(&self) -> StoreResult<Vec<Playground>>;

    fn submitted_playground(&self, id: i64) -> StoreResult<Playground>;

    fn submit_playground(&self, new: NewPlayground) -> StoreResult<Playground>;

    /// Publishes draft `id` with the moderator's data. The record keeps its id.
    fn promote_playground(&self, id: i64, promotion: Promotion) -> StoreResult<Playground>;

    /// Deletes a draft. Only its author may do so.
    fn delete_submitted_playground(&self, id: i64, requester: &str) -> StoreResult<()>;

    /// Comments of a published playground, newest first.
    fn comments(&self, playground_id: i64) -> StoreResult<Vec<Comment>>;

    fn comment(&self, playground_id: i64, comment_id: i64) -> StoreResult<Comment>;

    fn add_comment(&self, playground_id: i64, new: NewComment) -> StoreResult<Comment>;

    fn delete_comment(&self, playground_id: i64, comment_id: i64, requester: &str)
    -> StoreResult<()>;

    fn modify_comment(
        &self,
        playground_id: i64,
        comment_id: i64,
        requester: &str,
        content: &str,
    ) -> StoreResult<Comment>;

    /// Loads published fixtures into an empty store. Returns how many were
    /// inserted; a store that already holds records is left untouched.
    fn seed(&self, fixtures: Vec<Playground>) -> StoreResult<usize>;
}

pub(crate) fn sort_by_name(playgrounds: &mut [Playground]) {
    playgrounds.sort_by_cached_key(|p| p.name.to_lowercase());
}

/// Next id inside one playground's comment list.
pub(crate) fn next_comment_id(comments: &[Comment]) -> i64 {
    comments.iter().map(|c| c.id).max().unwrap_or(0) + 1
}
