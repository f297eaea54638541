use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    error::TodoError,
    model::{Status, UserProfile},
    ordering,
    schema::{CreateTodoSchema, LoginSchema, MoveTodoSchema, RegistrationSchema, UpdateTodoSchema},
    store::{parse_id, TodoChanges},
    AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    const MESSAGE: &str = "Kanban todo board API with Rust, SQLX, SQLite, and Axum";

    let json_response = serde_json::json!({
        "status": "success",
        "message": MESSAGE
    });

    Json(json_response)
}

// Handler for getting all of a user's todos. Columns come back in board
// order (todo, new, doing, done), not sorted by name.
pub async fn get_todos(
    Path(user_id): Path<String>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, TodoError> {
    let user_id = parse_id(&user_id, "userId")?;
    let todos = data.todos.list(user_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Todos fetched successfully",
            "results": todos.len(),
            "todos": todos
        })),
    ))
}

// Handler for creating a new Todo at the bottom of its column
pub async fn create_todo(
    Path(user_id): Path<String>,
    State(data): State<Arc<AppState>>,
    payload: Result<Json<CreateTodoSchema>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let Json(body) = payload?;
    if body.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(TodoError::validation("Title is required"));
    }
    let user_id = parse_id(&user_id, "userId")?;
    let status = parse_status(body.status.as_deref())?;

    let todo = data
        .todos
        .create(
            user_id,
            body.title.as_deref(),
            body.description.as_deref(),
            status,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Todo created successfully", "todo": todo})),
    ))
}

// Handler for a partial update of a Todo
pub async fn update_todo(
    Path(todo_id): Path<String>,
    State(data): State<Arc<AppState>>,
    payload: Result<Json<UpdateTodoSchema>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let Json(body) = payload?;
    let todo_id = parse_id(&todo_id, "todoId")?;
    let changes = TodoChanges {
        status: parse_status(body.status.as_deref())?,
        title: body.title,
        description: body.description,
        order: body.order,
    };

    let todo = data.todos.update(todo_id, changes).await?;

    Ok((
        StatusCode::OK,
        Json(json!({"message": "Todo updated successfully", "todo": todo})),
    ))
}

// Handler for deleting a Todo
pub async fn delete_todo(
    Path(todo_id): Path<String>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, TodoError> {
    let todo_id = parse_id(&todo_id, "todoId")?;
    let todo = data.todos.delete(todo_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({"message": "Todo deleted successfully", "todo": todo})),
    ))
}

// Handler for dragging a Todo to a new column and/or position
pub async fn move_todo(
    Path(todo_id): Path<String>,
    State(data): State<Arc<AppState>>,
    payload: Result<Json<MoveTodoSchema>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let Json(body) = payload?;
    let todo_id = parse_id(&todo_id, "todoId")?;
    let status = body.status.as_deref().map(ordering::parse_column).transpose()?;
    let (Some(status), Some(order)) = (status, body.order) else {
        return Err(TodoError::validation("status and order are required"));
    };

    let todo = data.todos.move_todo(todo_id, status, order).await?;

    Ok((
        StatusCode::OK,
        Json(json!({"message": "Todo moved successfully", "todo": todo})),
    ))
}

pub async fn user_registration(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<RegistrationSchema>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let Json(body) = payload?;
    let user = data
        .users
        .register(
            body.full_name.as_deref(),
            body.email.as_deref(),
            body.password.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "user registration successful",
            "success": true,
            "user": UserProfile::from(&user)
        })),
    ))
}

pub async fn user_login(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<LoginSchema>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let Json(body) = payload?;
    let user = data
        .users
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "user login successful",
            "success": true,
            "user": UserProfile::from(&user)
        })),
    ))
}

// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found - {}", uri.path())
        })),
    )
}

fn parse_status(raw: Option<&str>) -> Result<Option<Status>, TodoError> {
    raw.map(|s| {
        s.trim()
            .parse::<Status>()
            .map_err(|err| TodoError::validation(err.to_string()))
    })
    .transpose()
}
