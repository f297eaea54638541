// Each mutation runs in one transaction. The unique index on
// (user_id, status, position) turns a racing write into an OrderConflict.

use chrono::{DateTime, Utc};
use sqlx::{
    migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Pool, Sqlite, SqliteConnection,
};
use uuid::Uuid;

use crate::{
    error::{Result, TodoError},
    model::{Status, Todo, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN},
    ordering::{self, Placement},
};

const TODO_COLUMNS: &str =
    "id, user_id, title, description, status, position, created_at, updated_at";

const SCHEMA: [&str; 4] = [
    r#"CREATE TABLE IF NOT EXISTS todos (
        id BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'todo',
        position INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS todos_user_status_position
        ON todos (user_id, status, position);"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY NOT NULL,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
    r#"CREATE INDEX IF NOT EXISTS todos_user ON todos (user_id);"#,
];

pub async fn connect(database_url: &str, max_connections: u32) -> Result<Pool<Sqlite>> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        tracing::info!(url = database_url, "creating database");
        Sqlite::create_database(database_url).await?;
    }

    // An in-memory database lives as long as its connection; never recycle it.
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(database_url)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| TodoError::validation(format!("Invalid {what}")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub order: Option<i64>,
}

#[derive(Clone)]
pub struct TodoStore {
    db: Pool<Sqlite>,
}

impl TodoStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        status: Option<Status>,
    ) -> Result<Todo> {
        let title = validate_title(title.unwrap_or_default())?;
        let description = validate_description(description.unwrap_or_default())?;
        let status = status.unwrap_or_default();

        let mut tx = self.db.begin().await?;
        let board = load_board(&mut tx, user_id).await?;
        let order = ordering::next_order(&board, status);
        let now = Utc::now();

        let todo = sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos ({TODO_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {TODO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(status)
        .bind(order)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(todo = %todo.id, user = %user_id, %status, order, "todo created");
        Ok(todo)
    }

    // Board order: column, then order
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Todo>> {
        let mut conn = self.db.acquire().await?;
        load_board(&mut conn, user_id).await
    }

    // A status change without an order appends to the new column
    pub async fn update(&self, id: Uuid, changes: TodoChanges) -> Result<Todo> {
        let title = changes.title.as_deref().map(validate_title).transpose()?;
        let description = changes
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let order = changes.order.map(validate_order).transpose()?;

        let mut tx = self.db.begin().await?;
        let todo = fetch_todo(&mut tx, id).await?;
        let now = Utc::now();

        if title.is_some() || description.is_some() {
            sqlx::query(
                "UPDATE todos SET title = COALESCE(?, title), description = COALESCE(?, description), updated_at = ? WHERE id = ?",
            )
            .bind(title)
            .bind(description)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let target_status = changes.status.unwrap_or(todo.status);
        let index = match (order, changes.status) {
            (Some(index), _) => Some(index),
            (None, Some(status)) if status != todo.status => Some(usize::MAX),
            _ => None,
        };
        if let Some(index) = index {
            let board = load_board(&mut tx, todo.user_id).await?;
            if let Some(plan) = ordering::plan_move(&board, id, target_status, index)? {
                write_placements(&mut tx, todo.user_id, &plan.changes(&board), now).await?;
            }
        }

        let updated = fetch_todo(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(todo = %id, status = %updated.status, order = updated.order, "todo updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Todo> {
        let mut tx = self.db.begin().await?;
        let todo = fetch_todo(&mut tx, id).await?;
        let board = load_board(&mut tx, todo.user_id).await?;
        let placements = ordering::plan_removal(&board, id)?;
        let changes = ordering::changed_placements(&board, &placements);

        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        write_placements(&mut tx, todo.user_id, &changes, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(todo = %id, renumbered = changes.len(), "todo deleted");
        Ok(todo)
    }

    // `order` is the final index once the card has left its old slot
    pub async fn move_todo(&self, id: Uuid, status: Status, order: i64) -> Result<Todo> {
        let index = validate_order(order)?;

        let mut tx = self.db.begin().await?;
        let todo = fetch_todo(&mut tx, id).await?;
        let board = load_board(&mut tx, todo.user_id).await?;

        let Some(plan) = ordering::plan_move(&board, id, status, index)? else {
            tx.commit().await?;
            tracing::debug!(todo = %id, "move is a no-op");
            return Ok(todo);
        };

        let changes = plan.changes(&board);
        write_placements(&mut tx, todo.user_id, &changes, Utc::now()).await?;
        let moved = fetch_todo(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            todo = %id,
            from = %plan.source,
            to = %status,
            order = moved.order,
            cross_column = plan.crosses_columns(),
            shifted = changes.len().saturating_sub(1),
            "todo moved"
        );
        Ok(moved)
    }
}

async fn fetch_todo(conn: &mut SqliteConnection, id: Uuid) -> Result<Todo> {
    sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| TodoError::todo_not_found(id))
}

async fn load_board(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Vec<Todo>> {
    let mut todos =
        sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ?"))
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    ordering::sort_board(&mut todos);
    Ok(todos)
}

// SQLite checks unique indexes row by row, so positions are first parked at
// distinct negative values and then flipped into place.
async fn write_placements(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    placements: &[Placement],
    now: DateTime<Utc>,
) -> Result<()> {
    if placements.is_empty() {
        return Ok(());
    }

    for placement in placements {
        sqlx::query("UPDATE todos SET status = ?, position = ?, updated_at = ? WHERE id = ?")
            .bind(placement.status)
            .bind(-placement.order - 1)
            .bind(now)
            .bind(placement.id)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("UPDATE todos SET position = -position - 1 WHERE user_id = ? AND position < 0")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TodoError::validation("Title is required"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(TodoError::validation(format!(
            "Title must be at most {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String> {
    let description = description.trim();
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(TodoError::validation(format!(
            "Description must be at most {DESCRIPTION_MAX_LEN} characters"
        )));
    }
    Ok(description.to_string())
}

fn validate_order(order: i64) -> Result<usize> {
    usize::try_from(order).map_err(|_| TodoError::validation("Order must be non-negative"))
}
