use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use playground_types::models::{Comment, Playground};

use crate::Database;
use crate::models::{CommentRow, PlaygroundRow, format_timestamp};
use crate::seed;
use crate::store::{
    NewComment, NewPlayground, PlaygroundStore, Promotion, StoreError, StoreResult, sort_by_name,
};
use crate::validation::{check_duplicates, validate_comment, validate_promotion, validate_submission};

const PLAYGROUND_COLUMNS: &str = "id, name, address, postal_code, city, department, long, lat, \
                                  coating, kind, open, author, time_of_submission, draft";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.into())
    }
}

impl PlaygroundStore for Database {
    // -- Playgrounds --

    fn all_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        self.with_conn(|conn| query_playgrounds(conn, false))
    }

    fn playground(&self, id: i64) -> StoreResult<Playground> {
        self.with_conn(|conn| {
            query_playground(conn, id, false)?.ok_or(StoreError::PlaygroundNotFound(id))
        })
    }

    fn all_submitted_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        self.with_conn(|conn| query_playgrounds(conn, true))
    }

    fn submitted_playground(&self, id: i64) -> StoreResult<Playground> {
        self.with_conn(|conn| {
            query_playground(conn, id, true)?.ok_or(StoreError::PlaygroundNotFound(id))
        })
    }

    fn submit_playground(&self, new: NewPlayground) -> StoreResult<Playground> {
        let new = new.trimmed();
        validate_submission(&new)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            check_duplicates(&new.name, &new.address, None, &query_records(&tx)?, None)?;

            tx.execute(
                "INSERT INTO playgrounds (name, address, postal_code, city, department, author, time_of_submission, draft)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                params![
                    new.name,
                    new.address,
                    new.postal_code,
                    new.city,
                    new.department,
                    new.author,
                    format_timestamp(&new.time_of_submission),
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            info!("Playground '{}' submitted by {} as draft {}", new.name, new.author, id);
            Ok(new.into_draft(id))
        })
    }

    fn promote_playground(&self, id: i64, promotion: Promotion) -> StoreResult<Playground> {
        let promotion = promotion.trimmed();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let draft = query_playground(&tx, id, true)?.ok_or(StoreError::PlaygroundNotFound(id))?;
            validate_promotion(&promotion)?;
            check_duplicates(
                &draft.name,
                &promotion.address,
                Some((promotion.long, promotion.lat)),
                &query_records(&tx)?,
                Some(id),
            )?;

            let published = promotion.apply(draft);
            tx.execute(
                "UPDATE playgrounds
                 SET address = ?1, postal_code = ?2, city = ?3, department = ?4, long = ?5, lat = ?6,
                     coating = ?7, kind = ?8, open = ?9, draft = 0
                 WHERE id = ?10 AND draft = 1",
                params![
                    published.address,
                    published.postal_code,
                    published.city,
                    published.department,
                    published.long,
                    published.lat,
                    published.coating,
                    published.kind,
                    published.open,
                    id,
                ],
            )?;
            tx.commit()?;

            info!("Playground {} '{}' published", id, published.name);
            Ok(published)
        })
    }

    fn delete_submitted_playground(&self, id: i64, requester: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let draft = query_playground(&tx, id, true)?.ok_or(StoreError::PlaygroundNotFound(id))?;
            if draft.author != requester {
                return Err(StoreError::Forbidden {
                    username: requester.to_string(),
                });
            }
            tx.execute("DELETE FROM playgrounds WHERE id = ?1 AND draft = 1", [id])?;
            tx.commit()?;

            info!("Draft {} deleted by {}", id, requester);
            Ok(())
        })
    }

    // -- Comments --

    fn comments(&self, playground_id: i64) -> StoreResult<Vec<Comment>> {
        self.with_conn(|conn| {
            ensure_published(conn, playground_id)?;
            query_comments(conn, playground_id)
        })
    }

    fn comment(&self, playground_id: i64, comment_id: i64) -> StoreResult<Comment> {
        self.with_conn(|conn| {
            ensure_published(conn, playground_id)?;
            query_comment(conn, playground_id, comment_id)?.ok_or(StoreError::CommentNotFound {
                playground_id,
                comment_id,
            })
        })
    }

    fn add_comment(&self, playground_id: i64, new: NewComment) -> StoreResult<Comment> {
        let content = new.content.trim().to_string();
        let author = new.author.trim().to_string();
        validate_comment(&content, &author)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            ensure_published(&tx, playground_id)?;

            let id: i64 = tx.query_row(
                "SELECT COALESCE(MAX(id), 0) + 1 FROM comments WHERE playground_id = ?1",
                [playground_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO comments (playground_id, id, content, author, time_of_submission)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    playground_id,
                    id,
                    content,
                    author,
                    format_timestamp(&new.time_of_submission),
                ],
            )?;
            tx.commit()?;

            Ok(Comment {
                id,
                playground_id,
                content,
                author,
                time_of_submission: new.time_of_submission,
            })
        })
    }

    fn delete_comment(
        &self,
        playground_id: i64,
        comment_id: i64,
        requester: &str,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let comment = owned_comment(&tx, playground_id, comment_id, requester)?;
            tx.execute(
                "DELETE FROM comments WHERE playground_id = ?1 AND id = ?2",
                params![playground_id, comment.id],
            )?;
            tx.commit()?;
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

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut comment = owned_comment(&tx, playground_id, comment_id, requester)?;
            validate_comment(content, requester)?;

            comment.content = content.to_string();
            comment.time_of_submission = chrono::Utc::now();
            tx.execute(
                "UPDATE comments SET content = ?1, time_of_submission = ?2
                 WHERE playground_id = ?3 AND id = ?4",
                params![
                    comment.content,
                    format_timestamp(&comment.time_of_submission),
                    playground_id,
                    comment_id,
                ],
            )?;
            tx.commit()?;
            Ok(comment)
        })
    }

    fn seed(&self, fixtures: Vec<Playground>) -> StoreResult<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM playgrounds", [], |r| r.get(0))?;
            if existing > 0 {
                return Ok(0);
            }

            let prepared = seed::prepare(fixtures);
            for p in &prepared {
                tx.execute(
                    &format!(
                        "INSERT INTO playgrounds ({PLAYGROUND_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0)"
                    ),
                    params![
                        p.id,
                        p.name,
                        p.address,
                        p.postal_code,
                        p.city,
                        p.department,
                        p.long,
                        p.lat,
                        p.coating,
                        p.kind,
                        p.open,
                        p.author,
                        format_timestamp(&p.time_of_submission),
                    ],
                )?;
                for c in &p.comments {
                    tx.execute(
                        "INSERT INTO comments (playground_id, id, content, author, time_of_submission)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![p.id, c.id, c.content, c.author, format_timestamp(&c.time_of_submission)],
                    )?;
                }
            }
            tx.commit()?;

            info!("Seeded {} playgrounds", prepared.len());
            Ok(prepared.len())
        })
    }
}

fn map_playground_row(row: &Row<'_>) -> rusqlite::Result<PlaygroundRow> {
    Ok(PlaygroundRow {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        postal_code: row.get(3)?,
        city: row.get(4)?,
        department: row.get(5)?,
        long: row.get(6)?,
        lat: row.get(7)?,
        coating: row.get(8)?,
        kind: row.get(9)?,
        open: row.get(10)?,
        author: row.get(11)?,
        time_of_submission: row.get(12)?,
        draft: row.get(13)?,
    })
}

fn map_comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        playground_id: row.get(0)?,
        id: row.get(1)?,
        content: row.get(2)?,
        author: row.get(3)?,
        time_of_submission: row.get(4)?,
    })
}

fn query_playgrounds(conn: &Connection, draft: bool) -> StoreResult<Vec<Playground>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAYGROUND_COLUMNS} FROM playgrounds WHERE draft = ?1"
    ))?;
    let rows = stmt
        .query_map([draft], map_playground_row)?
        .collect::<Result<Vec<_>, _>>()?;

    // One pass over comments instead of a query per playground
    let mut stmt = conn.prepare(
        "SELECT playground_id, id, content, author, time_of_submission
         FROM comments ORDER BY playground_id, id DESC",
    )?;
    let mut comments: HashMap<i64, Vec<Comment>> = HashMap::new();
    for row in stmt.query_map([], map_comment_row)? {
        let row = row?;
        comments.entry(row.playground_id).or_default().push(row.into());
    }

    let mut playgrounds: Vec<Playground> = rows
        .into_iter()
        .map(|row| {
            let own = comments.remove(&row.id).unwrap_or_default();
            row.into_playground(own)
        })
        .collect();
    sort_by_name(&mut playgrounds);
    Ok(playgrounds)
}

fn query_playground(conn: &Connection, id: i64, draft: bool) -> StoreResult<Option<Playground>> {
    let row = conn
        .query_row(
            &format!("SELECT {PLAYGROUND_COLUMNS} FROM playgrounds WHERE id = ?1 AND draft = ?2"),
            params![id, draft],
            map_playground_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let comments = query_comments(conn, id)?;
            Ok(Some(row.into_playground(comments)))
        }
        None => Ok(None),
    }
}

/// Every record, drafts included, without comments. Used for duplicate checks.
fn query_records(conn: &Connection) -> StoreResult<Vec<Playground>> {
    let mut stmt = conn.prepare(&format!("SELECT {PLAYGROUND_COLUMNS} FROM playgrounds"))?;
    let rows = stmt
        .query_map([], map_playground_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|row| row.into_playground(Vec::new())).collect())
}

fn ensure_published(conn: &Connection, id: i64) -> StoreResult<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM playgrounds WHERE id = ?1 AND draft = 0",
            [id],
            |_| Ok(()),
        )
        .optional()?;
    found.ok_or(StoreError::PlaygroundNotFound(id))
}

fn query_comments(conn: &Connection, playground_id: i64) -> StoreResult<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT playground_id, id, content, author, time_of_submission
         FROM comments WHERE playground_id = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([playground_id], map_comment_row)?
        .map(|row| row.map(Comment::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_comment(conn: &Connection, playground_id: i64, comment_id: i64) -> StoreResult<Option<Comment>> {
    let row = conn
        .query_row(
            "SELECT playground_id, id, content, author, time_of_submission
             FROM comments WHERE playground_id = ?1 AND id = ?2",
            params![playground_id, comment_id],
            map_comment_row,
        )
        .optional()?;
    Ok(row.map(Comment::from))
}

/// Loads a comment and checks that `requester` wrote it.
fn owned_comment(
    conn: &Connection,
    playground_id: i64,
    comment_id: i64,
    requester: &str,
) -> StoreResult<Comment> {
    ensure_published(conn, playground_id)?;
    let comment = query_comment(conn, playground_id, comment_id)?.ok_or(
        StoreError::CommentNotFound {
            playground_id,
            comment_id,
        },
    )?;
    if !comment.is_author(requester) {
        return Err(StoreError::Forbidden {
            username: requester.to_string(),
        });
    }
    Ok(comment)
}
