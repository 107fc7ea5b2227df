//! Events, todos and definitions repository.
//!
//! Flat records with no cross links; listing is always creation order.

use super::{bool_to_int, ensure_connection_ready, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::model::agenda::{DefinitionItem, Event, TodoItem};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Repository interface for flat project records.
pub trait AgendaRepository {
    /// Inserts one event.
    fn create_event(&self, event: &Event) -> RepoResult<()>;
    /// Overwrites title, details and start of one event.
    fn update_event(&self, event: &Event) -> RepoResult<()>;
    /// Lists events in creation order.
    fn list_events(&self) -> RepoResult<Vec<Event>>;
    /// Inserts one todo.
    fn create_todo(&self, todo: &TodoItem) -> RepoResult<()>;
    /// Overwrites title, completion and due date of one todo.
    fn update_todo(&self, todo: &TodoItem) -> RepoResult<()>;
    /// Lists todos in creation order.
    fn list_todos(&self) -> RepoResult<Vec<TodoItem>>;
    /// Inserts one definition.
    fn create_definition(&self, definition: &DefinitionItem) -> RepoResult<()>;
    /// Overwrites term and text of one definition.
    fn update_definition(&self, definition: &DefinitionItem) -> RepoResult<()>;
    /// Lists definitions in creation order.
    fn list_definitions(&self) -> RepoResult<Vec<DefinitionItem>>;
    /// Deletes one event, todo or definition by id.
    fn delete_record(&self, id: Uuid) -> RepoResult<()>;
}

/// SQLite-backed agenda repository.
pub struct SqliteAgendaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAgendaRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["events", "todos", "definitions"])?;
        Ok(Self { conn })
    }
}

impl AgendaRepository for SqliteAgendaRepository<'_> {
    fn create_event(&self, event: &Event) -> RepoResult<()> {
        insert_event_row(self.conn, event)
    }

    fn update_event(&self, event: &Event) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE events SET title = ?2, details = ?3, starts_at = ?4 WHERE uuid = ?1;",
            params![
                event.id.to_string(),
                event.title.as_str(),
                event.details.as_str(),
                event.starts_at,
            ],
        )?;
        ensure_changed(changed, event.id)
    }

    fn list_events(&self) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title, details, starts_at, created_at
             FROM events
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn create_todo(&self, todo: &TodoItem) -> RepoResult<()> {
        insert_todo_row(self.conn, todo)
    }

    fn update_todo(&self, todo: &TodoItem) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos SET title = ?2, is_completed = ?3, due_at = ?4 WHERE uuid = ?1;",
            params![
                todo.id.to_string(),
                todo.title.as_str(),
                bool_to_int(todo.is_completed),
                todo.due_at,
            ],
        )?;
        ensure_changed(changed, todo.id)
    }

    fn list_todos(&self) -> RepoResult<Vec<TodoItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title, is_completed, due_at, created_at
             FROM todos
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn create_definition(&self, definition: &DefinitionItem) -> RepoResult<()> {
        insert_definition_row(self.conn, definition)
    }

    fn update_definition(&self, definition: &DefinitionItem) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE definitions SET term = ?2, definition = ?3 WHERE uuid = ?1;",
            params![
                definition.id.to_string(),
                definition.term.as_str(),
                definition.definition.as_str(),
            ],
        )?;
        ensure_changed(changed, definition.id)
    }

    fn list_definitions(&self) -> RepoResult<Vec<DefinitionItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, term, definition, created_at
             FROM definitions
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut definitions = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("uuid")?;
            definitions.push(DefinitionItem {
                id: parse_uuid(&id_text, "definitions.uuid")?,
                term: row.get("term")?,
                definition: row.get("definition")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(definitions)
    }

    fn delete_record(&self, id: Uuid) -> RepoResult<()> {
        let mut changed = 0;
        for table in ["events", "todos", "definitions"] {
            changed += self
                .conn
                .execute(&format!("DELETE FROM {table} WHERE uuid = ?1;"), [id.to_string()])?;
        }
        ensure_changed(changed, id)
    }
}

pub(crate) fn insert_event_row(conn: &Connection, event: &Event) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO events (uuid, title, details, starts_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            event.id.to_string(),
            event.title.as_str(),
            event.details.as_str(),
            event.starts_at,
            event.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_todo_row(conn: &Connection, todo: &TodoItem) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO todos (uuid, title, is_completed, due_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            todo.id.to_string(),
            todo.title.as_str(),
            bool_to_int(todo.is_completed),
            todo.due_at,
            todo.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_definition_row(
    conn: &Connection,
    definition: &DefinitionItem,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO definitions (uuid, term, definition, created_at)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            definition.id.to_string(),
            definition.term.as_str(),
            definition.definition.as_str(),
            definition.created_at,
        ],
    )?;
    Ok(())
}

fn ensure_changed(changed: usize, id: Uuid) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let id_text: String = row.get("uuid")?;
    Ok(Event {
        id: parse_uuid(&id_text, "events.uuid")?,
        title: row.get("title")?,
        details: row.get("details")?,
        starts_at: row.get("starts_at")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<TodoItem> {
    let id_text: String = row.get("uuid")?;
    Ok(TodoItem {
        id: parse_uuid(&id_text, "todos.uuid")?,
        title: row.get("title")?,
        is_completed: parse_bool(row.get("is_completed")?, "todos.is_completed")?,
        due_at: row.get("due_at")?,
        created_at: row.get("created_at")?,
    })
}
