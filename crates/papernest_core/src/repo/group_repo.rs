//! Paper group repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the two-level group tree and its per-scope `order_index`.
//! - Own the reparenting delete, which touches groups and papers atomically.
//!
//! # Invariants
//! - Listing within a scope is deterministic:
//!   `order_index ASC, created_at ASC, rowid ASC`.
//! - After any mutation here every touched scope is numbered 0..n-1.
//! - Depth rules are validated by the ordering service, not here.

use super::paper_repo::{assign_paper_scope, list_paper_ids};
use super::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_index, parse_optional_uuid,
    parse_uuid, place_before, RepoError, RepoResult,
};
use crate::model::paper_group::{GroupId, PaperGroup};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const GROUP_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    order_index,
    is_collapsed,
    parent_uuid,
    created_at
FROM paper_groups";

/// What a reparenting delete moved around.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDeleteOutcome {
    /// Papers moved into the deleted group's parent scope.
    pub reparented_papers: usize,
    /// Child groups moved into the deleted group's parent scope, in order.
    pub promoted_subgroups: Vec<GroupId>,
}

/// Repository interface for paper group operations.
pub trait GroupRepository {
    /// Creates one group appended at the end of the `parent_id` scope.
    fn create_group(&self, parent_id: Option<GroupId>, name: &str) -> RepoResult<PaperGroup>;
    /// Loads one group by id.
    fn get_group(&self, id: GroupId) -> RepoResult<Option<PaperGroup>>;
    /// Lists one sibling scope in display order.
    fn list_groups(&self, parent_id: Option<GroupId>) -> RepoResult<Vec<PaperGroup>>;
    /// Lists every group in creation order.
    fn list_all_groups(&self) -> RepoResult<Vec<PaperGroup>>;
    /// Renames one group.
    fn rename_group(&self, id: GroupId, name: &str) -> RepoResult<()>;
    /// Sets the collapsed flag of one group.
    fn set_collapsed(&self, id: GroupId, is_collapsed: bool) -> RepoResult<()>;
    /// Reorders one group inside its own sibling scope.
    fn move_group(&self, id: GroupId, before: Option<GroupId>) -> RepoResult<()>;
    /// Deletes one group, moving its papers and child groups to its parent scope.
    fn delete_group_reparent(&self, id: GroupId) -> RepoResult<GroupDeleteOutcome>;
}

/// SQLite-backed paper group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["paper_groups", "papers"])?;
        Ok(Self { conn })
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn create_group(&self, parent_id: Option<GroupId>, name: &str) -> RepoResult<PaperGroup> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut group = PaperGroup::new(name);
        group.parent_id = parent_id;
        group.order_index = next_order_index(&tx, parent_id)?;
        insert_group_row(&tx, &group)?;
        tx.commit()?;
        Ok(group)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<PaperGroup>> {
        load_group(self.conn, id)
    }

    fn list_groups(&self, parent_id: Option<GroupId>) -> RepoResult<Vec<PaperGroup>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             WHERE parent_uuid IS ?1
             ORDER BY order_index ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([parent_id.map(|value| value.to_string())])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn list_all_groups(&self) -> RepoResult<Vec<PaperGroup>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn rename_group(&self, id: GroupId, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE paper_groups SET name = ?2 WHERE uuid = ?1;",
            params![id.to_string(), name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn set_collapsed(&self, id: GroupId, is_collapsed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE paper_groups SET is_collapsed = ?2 WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(is_collapsed)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn move_group(&self, id: GroupId, before: Option<GroupId>) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let group = load_group(&tx, id)?.ok_or(RepoError::NotFound(id))?;

        let mut sibling_ids = list_group_ids(&tx, group.parent_id)?;
        place_before(&mut sibling_ids, id, before);
        assign_group_scope(&tx, group.parent_id, &sibling_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_group_reparent(&self, id: GroupId) -> RepoResult<GroupDeleteOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let group = load_group(&tx, id)?.ok_or(RepoError::NotFound(id))?;

        let member_ids = list_paper_ids(&tx, Some(id))?;
        let mut paper_scope = list_paper_ids(&tx, group.parent_id)?;
        paper_scope.extend(member_ids.iter().copied());
        assign_paper_scope(&tx, group.parent_id, &paper_scope)?;

        let child_ids = list_group_ids(&tx, Some(id))?;
        let mut group_scope = list_group_ids(&tx, group.parent_id)?;
        group_scope.retain(|existing| *existing != id);
        group_scope.extend(child_ids.iter().copied());
        assign_group_scope(&tx, group.parent_id, &group_scope)?;

        tx.execute(
            "DELETE FROM paper_groups WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        tx.commit()?;
        Ok(GroupDeleteOutcome {
            reparented_papers: member_ids.len(),
            promoted_subgroups: child_ids,
        })
    }
}

/// Inserts a group row exactly as given (id, index and parent included).
pub(crate) fn insert_group_row(conn: &Connection, group: &PaperGroup) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO paper_groups (
            uuid,
            name,
            order_index,
            is_collapsed,
            parent_uuid,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            group.id.to_string(),
            group.name.as_str(),
            group.order_index,
            bool_to_int(group.is_collapsed),
            group.parent_id.map(|value| value.to_string()),
            group.created_at,
        ],
    )?;
    Ok(())
}

/// Points one group at a new parent without touching its index.
pub(crate) fn set_group_parent(
    conn: &Connection,
    id: GroupId,
    parent_id: Option<GroupId>,
) -> RepoResult<()> {
    conn.execute(
        "UPDATE paper_groups SET parent_uuid = ?2 WHERE uuid = ?1;",
        params![id.to_string(), parent_id.map(|value| value.to_string())],
    )?;
    Ok(())
}

/// Ids of one sibling scope in display order.
pub(crate) fn list_group_ids(
    conn: &Connection,
    parent_id: Option<GroupId>,
) -> RepoResult<Vec<GroupId>> {
    let mut stmt = conn.prepare(
        "SELECT uuid
         FROM paper_groups
         WHERE parent_uuid IS ?1
         ORDER BY order_index ASC, created_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([parent_id.map(|value| value.to_string())])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "paper_groups.uuid")?);
    }
    Ok(ids)
}

/// Distinct parent scopes currently holding at least one group.
pub(crate) fn list_group_scopes(conn: &Connection) -> RepoResult<Vec<Option<GroupId>>> {
    let mut stmt = conn.prepare("SELECT DISTINCT parent_uuid FROM paper_groups;")?;
    let mut rows = stmt.query([])?;
    let mut scopes = Vec::new();
    while let Some(row) = rows.next()? {
        scopes.push(parse_optional_uuid(row.get(0)?, "paper_groups.parent_uuid")?);
    }
    Ok(scopes)
}

/// Places `ids` under `parent_id` with `order_index` equal to list position.
pub(crate) fn assign_group_scope(
    conn: &Connection,
    parent_id: Option<GroupId>,
    ids: &[GroupId],
) -> RepoResult<()> {
    let parent = parent_id.map(|value| value.to_string());
    let mut stmt = conn.prepare(
        "UPDATE paper_groups
         SET parent_uuid = ?2,
             order_index = ?3
         WHERE uuid = ?1;",
    )?;
    for (index, id) in ids.iter().enumerate() {
        stmt.execute(params![id.to_string(), parent, index as i64])?;
    }
    Ok(())
}

/// Rewrites one scope as 0..n-1 keeping its current display order.
pub(crate) fn renumber_group_scope(conn: &Connection, parent_id: Option<GroupId>) -> RepoResult<()> {
    let ids = list_group_ids(conn, parent_id)?;
    assign_group_scope(conn, parent_id, &ids)
}

fn next_order_index(conn: &Connection, parent_id: Option<GroupId>) -> RepoResult<i32> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(order_index), -1) + 1
         FROM paper_groups
         WHERE parent_uuid IS ?1;",
        [parent_id.map(|value| value.to_string())],
        |row| row.get(0),
    )?;
    parse_index(next, "paper_groups.order_index")
}

fn load_group(conn: &Connection, id: GroupId) -> RepoResult<Option<PaperGroup>> {
    let mut stmt = conn.prepare(&format!("{GROUP_SELECT_SQL} WHERE uuid = ?1;"))?;
    let group = stmt
        .query_row([id.to_string()], |row| Ok(parse_group_row(row)))
        .optional()?;
    group.transpose()
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<PaperGroup> {
    let id_text: String = row.get("uuid")?;
    Ok(PaperGroup {
        id: parse_uuid(&id_text, "paper_groups.uuid")?,
        name: row.get("name")?,
        order_index: parse_index(row.get("order_index")?, "paper_groups.order_index")?,
        is_collapsed: parse_bool(row.get("is_collapsed")?, "paper_groups.is_collapsed")?,
        parent_id: parse_optional_uuid(row.get("parent_uuid")?, "paper_groups.parent_uuid")?,
        created_at: row.get("created_at")?,
    })
}
