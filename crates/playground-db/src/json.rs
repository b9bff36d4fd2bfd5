use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use playground_types::models::{Comment, Playground};

use crate::seed;
use crate::store::{
    NewComment, NewPlayground, PlaygroundStore, Promotion, StoreError, StoreResult,
    next_comment_id, sort_by_name,
};
use crate::validation::{check_duplicates, validate_comment, validate_promotion, validate_submission};

/// In-memory state of the store.
#[derive(Debug, Clone, Default, Serialize)]
struct Collection {
    /// Next playground id. Only ever grows, so a deleted draft's id is never
    /// handed out again.
    next_id: i64,
    playgrounds: Vec<Playground>,
}

impl Collection {
    fn from_playgrounds(playgrounds: Vec<Playground>) -> Self {
        let next_id = playgrounds.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Self {
            next_id,
            playgrounds,
        }
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// On-disk layouts. A bare array is the fixture format.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFile {
    Collection {
        next_id: i64,
        playgrounds: Vec<Playground>,
    },
    Bare(Vec<Playground>),
}

impl From<StoredFile> for Collection {
    fn from(file: StoredFile) -> Self {
        match file {
            StoredFile::Collection {
                next_id,
                playgrounds,
            } => {
                let mut collection = Collection::from_playgrounds(playgrounds);
                collection.next_id = collection.next_id.max(next_id);
                collection
            }
            StoredFile::Bare(playgrounds) => Collection::from_playgrounds(playgrounds),
        }
    }
}

/// Whole collection held in memory, optionally mirrored to a JSON file.
///
/// Every mutation works on a copy under the write lock, is persisted, and only
/// then replaces the live collection, so a failed write leaves the store as it was.
pub struct JsonStore {
    path: Option<PathBuf>,
    collection: RwLock<Collection>,
}

impl JsonStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            collection: RwLock::new(Collection::from_playgrounds(Vec::new())),
        }
    }

    /// Opens (or creates) a store file. Plain playground arrays are accepted.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let collection = match std::fs::read(path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => {
                Collection::from_playgrounds(Vec::new())
            }
            Ok(raw) => serde_json::from_slice::<StoredFile>(&raw)
                .with_context(|| format!("Couldn't parse {}", path.display()))?
                .into(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Collection::from_playgrounds(Vec::new())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Couldn't read {}", path.display()));
            }
        };

        let store = Self {
            path: Some(path.to_path_buf()),
            collection: RwLock::new(Collection::default()),
        };
        store.persist(&collection)?;

        info!(
            "JSON store opened at {} ({} records)",
            path.display(),
            collection.playgrounds.len()
        );
        Ok(Self {
            collection: RwLock::new(collection),
            ..store
        })
    }

    fn read<T>(&self, f: impl FnOnce(&[Playground]) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self
            .collection
            .read()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))?;
        f(&guard.playgrounds)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Collection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self
            .collection
            .write()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))?;

        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    /// Writes a synced temp file next to the target, then renames it over.
    fn persist(&self, collection: &Collection) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let body = serde_json::to_vec_pretty(collection)?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Couldn't create a temp file in {}", dir.display()))?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        // Dropping the temp file on any error above removes it
        tmp.persist(path)
            .with_context(|| format!("Couldn't replace {}", path.display()))?;
        Ok(())
    }
}

fn find(playgrounds: &[Playground], id: i64, draft: bool) -> StoreResult<&Playground> {
    playgrounds
        .iter()
        .find(|p| p.id == id && p.draft == draft)
        .ok_or(StoreError::PlaygroundNotFound(id))
}

fn find_mut(playgrounds: &mut [Playground], id: i64, draft: bool) -> StoreResult<&mut Playground> {
    playgrounds
        .iter_mut()
        .find(|p| p.id == id && p.draft == draft)
        .ok_or(StoreError::PlaygroundNotFound(id))
}

fn listed(playgrounds: &[Playground], draft: bool) -> Vec<Playground> {
    let mut out: Vec<Playground> = playgrounds.iter().filter(|p| p.draft == draft).cloned().collect();
    sort_by_name(&mut out);
    out
}

fn comment_position(
    playground: &Playground,
    comment_id: i64,
    requester: &str,
) -> StoreResult<usize> {
    let index = playground
        .comments
        .iter()
        .position(|c| c.id == comment_id)
        .ok_or(StoreError::CommentNotFound {
            playground_id: playground.id,
            comment_id,
        })?;
    if !playground.comments[index].is_author(requester) {
        return Err(StoreError::Forbidden {
            username: requester.to_string(),
        });
    }
    Ok(index)
}

impl PlaygroundStore for JsonStore {
    fn all_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        self.read(|all| Ok(listed(all, false)))
    }

    fn playground(&self, id: i64) -> StoreResult<Playground> {
        self.read(|all| find(all, id, false).cloned())
    }

    fn all_submitted_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        self.read(|all| Ok(listed(all, true)))
    }

    fn submitted_playground(&self, id: i64) -> StoreResult<Playground> {
        self.read(|all| find(all, id, true).cloned())
    }

    fn submit_playground(&self, new: NewPlayground) -> StoreResult<Playground> {
        let new = new.trimmed();
        validate_submission(&new)?;

        self.mutate(|c| {
            check_duplicates(&new.name, &new.address, None, &c.playgrounds, None)?;
            let id = c.allocate_id();
            let draft = new.into_draft(id);
            c.playgrounds.push(draft.clone());

            info!("Playground '{}' submitted by {} as draft {}", draft.name, draft.author, id);
            Ok(draft)
        })
    }

    fn promote_playground(&self, id: i64, promotion: Promotion) -> StoreResult<Playground> {
        let promotion = promotion.trimmed();

        self.mutate(|c| {
            let all = &mut c.playgrounds;
            let draft = find(all, id, true)?.clone();
            validate_promotion(&promotion)?;
            check_duplicates(
                &draft.name,
                &promotion.address,
                Some((promotion.long, promotion.lat)),
                all,
                Some(id),
            )?;

            let published = promotion.apply(draft);
            *find_mut(all, id, true)? = published.clone();

            info!("Playground {} '{}' published", id, published.name);
            Ok(published)
        })
    }

    fn delete_submitted_playground(&self, id: i64, requester: &str) -> StoreResult<()> {
        self.mutate(|c| {
            let all = &mut c.playgrounds;
            let draft = find(all, id, true)?;
            if draft.author != requester {
                return Err(StoreError::Forbidden {
                    username: requester.to_string(),
                });
            }
            all.retain(|p| !(p.id == id && p.draft));

            info!("Draft {} deleted by {}", id, requester);
            Ok(())
        })
    }

    fn comments(&self, playground_id: i64) -> StoreResult<Vec<Comment>> {
        self.read(|all| Ok(find(all, playground_id, false)?.comments.clone()))
    }

    fn comment(&self, playground_id: i64, comment_id: i64) -> StoreResult<Comment> {
        self.read(|all| {
            find(all, playground_id, false)?
                .comments
                .iter()
                .find(|c| c.id == comment_id)
                .cloned()
                .ok_or(StoreError::CommentNotFound {
                    playground_id,
                    comment_id,
                })
        })
    }

    fn add_comment(&self, playground_id: i64, new: NewComment) -> StoreResult<Comment> {
        let content = new.content.trim().to_string();
        let author = new.author.trim().to_string();
        validate_comment(&content, &author)?;

        self.mutate(|c| {
            let playground = find_mut(&mut c.playgrounds, playground_id, false)?;
            let comment = Comment {
                id: next_comment_id(&playground.comments),
                playground_id,
                content,
                author,
                time_of_submission: new.time_of_submission,
            };
            playground.comments.insert(0, comment.clone());
            Ok(comment)
        })
    }

    fn delete_comment(
        &self,
        playground_id: i64,
        comment_id: i64,
        requester: &str,
    ) -> StoreResult<()> {
        self.mutate(|c| {
            let playground = find_mut(&mut c.playgrounds, playground_id, false)?;
            let index = comment_position(playground, comment_id, requester)?;
            playground.comments.remove(index);
            Ok(())
        })
    }

    fn modify_comment(
        &self,
        playground_id: i64,
        comment_id: i64,
        requester: &str,
        content: &str,
    ) -> StoreResult<Comment> {
        let content = content.trim();

        self.mutate(|c| {
            let playground = find_mut(&mut c.playgrounds, playground_id, false)?;
            let index = comment_position(playground, comment_id, requester)?;
            validate_comment(content, requester)?;

            let comment = &mut playground.comments[index];
            comment.content = content.to_string();
            comment.time_of_submission = Utc::now();
            Ok(comment.clone())
        })
    }

    fn seed(&self, fixtures: Vec<Playground>) -> StoreResult<usize> {
        self.mutate(|c| {
            if !c.playgrounds.is_empty() {
                return Ok(0);
            }
            let seeded = seed::prepare(fixtures);
            let next_id = seeded.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            c.next_id = c.next_id.max(next_id);
            c.playgrounds = seeded;

            info!("Seeded {} playgrounds", c.playgrounds.len());
            Ok(c.playgrounds.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, address: &str) -> NewPlayground {
        NewPlayground {
            name: name.into(),
            address: address.into(),
            postal_code: "75019".into(),
            city: "Paris".into(),
            department: "Paris".into(),
            author: "test".into(),
            time_of_submission: Utc::now(),
        }
    }

    #[test]
    fn file_is_created_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playgrounds.json");

        let store = JsonStore::open(&path).unwrap();
        assert!(store.all_submitted_playgrounds().unwrap().is_empty());
        store.submit_playground(submission("TEP", "1 rue")).unwrap();
        drop(store);

        let reopened = JsonStore::open(&path).unwrap();
        let drafts = reopened.all_submitted_playgrounds().unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "TEP");

        // Only the store file is left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn draft_ids_keep_growing_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playgrounds.json");

        let store = JsonStore::open(&path).unwrap();
        store.submit_playground(submission("A", "1 rue")).unwrap();
        let b = store.submit_playground(submission("B", "2 rue")).unwrap();
        store.delete_submitted_playground(b.id, "test").unwrap();
        drop(store);

        let reopened = JsonStore::open(&path).unwrap();
        let c = reopened.submit_playground(submission("C", "3 rue")).unwrap();
        assert!(c.id > b.id);
    }

    #[test]
    fn bare_array_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playgrounds.json");
        std::fs::write(
            &path,
            r#"[{"id": 4, "name": "TEP", "address": "1 rue", "postal_code": "75001"}]"#,
        )
        .unwrap();

        let store = JsonStore::open(&path).unwrap();
        assert_eq!(store.all_playgrounds().unwrap().len(), 1);
        let next = store.submit_playground(submission("Other", "2 rue")).unwrap();
        assert_eq!(next.id, 5);

        // Rewritten in the object layout
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["next_id"], 6);
    }

    #[test]
    fn seed_is_skipped_for_non_empty_store() {
        let store = JsonStore::in_memory();
        store.submit_playground(submission("TEP", "1 rue")).unwrap();
        let fixture: Playground = serde_json::from_value(serde_json::json!({
            "name": "Other", "address": "2 rue", "postal_code": "75001"
        }))
        .unwrap();
        assert_eq!(store.seed(vec![fixture]).unwrap(), 0);
    }
}
