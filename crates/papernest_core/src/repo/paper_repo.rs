//! Paper repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist papers and their per-group `sort_index`.
//! - Keep the ungrouped scope (`group_uuid IS NULL`) ordered like any other.
//!
//! # Invariants
//! - Scope listing is deterministic: `sort_index ASC, created_at ASC, rowid ASC`.
//! - Moves renumber the whole target scope, and the source scope when it differs.
//! - `cached_file_path` is only written through `set_cached_file_path`.

use super::{
    ensure_connection_ready, parse_index, parse_optional_uuid, parse_uuid, place_before,
    RepoError, RepoResult,
};
use crate::model::paper::{
    decode_authors, decode_notes, encode_authors, encode_notes, Paper, PaperId, PaperType,
};
use crate::model::paper_group::GroupId;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const PAPER_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    short_title,
    abstract_text,
    source_url,
    authors_json,
    notes_json,
    paper_type,
    sort_index,
    group_uuid,
    cached_file_path,
    created_at
FROM papers";

/// Repository interface for paper operations.
pub trait PaperRepository {
    /// Stores a new paper at the end of its `group_id` scope.
    ///
    /// The incoming `sort_index` is ignored; the stored copy is returned.
    fn create_paper(&self, paper: &Paper) -> RepoResult<Paper>;
    /// Updates descriptive fields. Group, order and cache path are untouched.
    fn update_paper(&self, paper: &Paper) -> RepoResult<()>;
    /// Loads one paper by id.
    fn get_paper(&self, id: PaperId) -> RepoResult<Option<Paper>>;
    /// Lists one scope in display order.
    fn list_papers(&self, group_id: Option<GroupId>) -> RepoResult<Vec<Paper>>;
    /// Lists every paper in creation order.
    fn list_all_papers(&self) -> RepoResult<Vec<Paper>>;
    /// Moves one paper into `group_id`, before `before` or at the end.
    fn move_paper(
        &self,
        id: PaperId,
        group_id: Option<GroupId>,
        before: Option<PaperId>,
    ) -> RepoResult<()>;
    /// Deletes one paper and closes the gap in its scope.
    fn delete_paper(&self, id: PaperId) -> RepoResult<()>;
    /// Records or clears the machine-local file location.
    fn set_cached_file_path(&self, id: PaperId, path: Option<&str>) -> RepoResult<()>;
}

/// SQLite-backed paper repository.
pub struct SqlitePaperRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePaperRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["papers", "paper_groups"])?;
        Ok(Self { conn })
    }
}

impl PaperRepository for SqlitePaperRepository<'_> {
    fn create_paper(&self, paper: &Paper) -> RepoResult<Paper> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut stored = paper.clone();
        stored.sort_index = next_sort_index(&tx, paper.group_id)?;
        insert_paper_row(&tx, &stored)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_paper(&self, paper: &Paper) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE papers
             SET title = ?2,
                 short_title = ?3,
                 abstract_text = ?4,
                 source_url = ?5,
                 authors_json = ?6,
                 notes_json = ?7,
                 paper_type = ?8
             WHERE uuid = ?1;",
            params![
                paper.id.to_string(),
                paper.title.as_str(),
                paper.short_title.as_str(),
                paper.abstract_text.as_str(),
                paper.source_url.as_str(),
                authors_text(paper)?,
                notes_text(paper)?,
                paper.paper_type.as_db_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(paper.id));
        }
        Ok(())
    }

    fn get_paper(&self, id: PaperId) -> RepoResult<Option<Paper>> {
        load_paper(self.conn, id)
    }

    fn list_papers(&self, group_id: Option<GroupId>) -> RepoResult<Vec<Paper>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAPER_SELECT_SQL}
             WHERE group_uuid IS ?1
             ORDER BY sort_index ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([group_id.map(|value| value.to_string())])?;
        let mut papers = Vec::new();
        while let Some(row) = rows.next()? {
            papers.push(parse_paper_row(row)?);
        }
        Ok(papers)
    }

    fn list_all_papers(&self) -> RepoResult<Vec<Paper>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAPER_SELECT_SQL}
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut papers = Vec::new();
        while let Some(row) = rows.next()? {
            papers.push(parse_paper_row(row)?);
        }
        Ok(papers)
    }

    fn move_paper(
        &self,
        id: PaperId,
        group_id: Option<GroupId>,
        before: Option<PaperId>,
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let paper = load_paper(&tx, id)?.ok_or(RepoError::NotFound(id))?;

        let mut target_ids = list_paper_ids(&tx, group_id)?;
        place_before(&mut target_ids, id, before);
        assign_paper_scope(&tx, group_id, &target_ids)?;

        if paper.group_id != group_id {
            renumber_paper_scope(&tx, paper.group_id)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_paper(&self, id: PaperId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let paper = load_paper(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.execute("DELETE FROM papers WHERE uuid = ?1;", [id.to_string()])?;
        renumber_paper_scope(&tx, paper.group_id)?;
        tx.commit()?;
        Ok(())
    }

    fn set_cached_file_path(&self, id: PaperId, path: Option<&str>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE papers SET cached_file_path = ?2 WHERE uuid = ?1;",
            params![id.to_string(), path],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

/// Inserts a paper row exactly as given (id, index and group included).
pub(crate) fn insert_paper_row(conn: &Connection, paper: &Paper) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO papers (
            uuid,
            title,
            short_title,
            abstract_text,
            source_url,
            authors_json,
            notes_json,
            paper_type,
            sort_index,
            group_uuid,
            cached_file_path,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
        params![
            paper.id.to_string(),
            paper.title.as_str(),
            paper.short_title.as_str(),
            paper.abstract_text.as_str(),
            paper.source_url.as_str(),
            authors_text(paper)?,
            notes_text(paper)?,
            paper.paper_type.as_db_str(),
            paper.sort_index,
            paper.group_id.map(|value| value.to_string()),
            paper.cached_file_path.as_deref(),
            paper.created_at,
        ],
    )?;
    Ok(())
}

/// Points one paper at a new group without touching its index.
pub(crate) fn set_paper_group(
    conn: &Connection,
    id: PaperId,
    group_id: Option<GroupId>,
) -> RepoResult<()> {
    conn.execute(
        "UPDATE papers SET group_uuid = ?2 WHERE uuid = ?1;",
        params![id.to_string(), group_id.map(|value| value.to_string())],
    )?;
    Ok(())
}

/// Ids of one scope in display order.
pub(crate) fn list_paper_ids(
    conn: &Connection,
    group_id: Option<GroupId>,
) -> RepoResult<Vec<PaperId>> {
    let mut stmt = conn.prepare(
        "SELECT uuid
         FROM papers
         WHERE group_uuid IS ?1
         ORDER BY sort_index ASC, created_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([group_id.map(|value| value.to_string())])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "papers.uuid")?);
    }
    Ok(ids)
}

/// Distinct group scopes currently holding at least one paper.
pub(crate) fn list_paper_scopes(conn: &Connection) -> RepoResult<Vec<Option<GroupId>>> {
    let mut stmt = conn.prepare("SELECT DISTINCT group_uuid FROM papers;")?;
    let mut rows = stmt.query([])?;
    let mut scopes = Vec::new();
    while let Some(row) = rows.next()? {
        scopes.push(parse_optional_uuid(row.get(0)?, "papers.group_uuid")?);
    }
    Ok(scopes)
}

/// Places `ids` in `group_id` with `sort_index` equal to list position.
pub(crate) fn assign_paper_scope(
    conn: &Connection,
    group_id: Option<GroupId>,
    ids: &[PaperId],
) -> RepoResult<()> {
    let group = group_id.map(|value| value.to_string());
    let mut stmt = conn.prepare(
        "UPDATE papers
         SET group_uuid = ?2,
             sort_index = ?3
         WHERE uuid = ?1;",
    )?;
    for (index, id) in ids.iter().enumerate() {
        stmt.execute(params![id.to_string(), group, index as i64])?;
    }
    Ok(())
}

/// Rewrites one scope as 0..n-1 keeping its current display order.
pub(crate) fn renumber_paper_scope(conn: &Connection, group_id: Option<GroupId>) -> RepoResult<()> {
    let ids = list_paper_ids(conn, group_id)?;
    assign_paper_scope(conn, group_id, &ids)
}

fn next_sort_index(conn: &Connection, group_id: Option<GroupId>) -> RepoResult<i32> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_index), -1) + 1
         FROM papers
         WHERE group_uuid IS ?1;",
        [group_id.map(|value| value.to_string())],
        |row| row.get(0),
    )?;
    parse_index(next, "papers.sort_index")
}

fn load_paper(conn: &Connection, id: PaperId) -> RepoResult<Option<Paper>> {
    let mut stmt = conn.prepare(&format!("{PAPER_SELECT_SQL} WHERE uuid = ?1;"))?;
    let paper = stmt
        .query_row([id.to_string()], |row| Ok(parse_paper_row(row)))
        .optional()?;
    paper.transpose()
}

fn authors_text(paper: &Paper) -> RepoResult<String> {
    encode_authors(&paper.authors)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode papers.authors_json: {err}")))
}

fn notes_text(paper: &Paper) -> RepoResult<String> {
    encode_notes(&paper.notes)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode papers.notes_json: {err}")))
}

fn parse_paper_row(row: &Row<'_>) -> RepoResult<Paper> {
    let id_text: String = row.get("uuid")?;
    let id = parse_uuid(&id_text, "papers.uuid")?;

    let authors_json: String = row.get("authors_json")?;
    let authors = decode_authors(&authors_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid papers.authors_json for {id}: {err}"))
    })?;
    let notes_json: String = row.get("notes_json")?;
    let notes = decode_notes(&notes_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid papers.notes_json for {id}: {err}"))
    })?;

    let type_text: String = row.get("paper_type")?;
    let paper_type = PaperType::from_db_str(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid paper type `{type_text}` in papers.paper_type"))
    })?;

    Ok(Paper {
        id,
        title: row.get("title")?,
        short_title: row.get("short_title")?,
        abstract_text: row.get("abstract_text")?,
        source_url: row.get("source_url")?,
        authors,
        notes,
        paper_type,
        sort_index: parse_index(row.get("sort_index")?, "papers.sort_index")?,
        group_id: parse_optional_uuid(row.get("group_uuid")?, "papers.group_uuid")?,
        cached_file_path: row.get("cached_file_path")?,
        created_at: row.get("created_at")?,
    })
}
