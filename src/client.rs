//! REST client for the todo API, used as a [`TodoBackend`] by remote boards.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::{
    board::TodoBackend,
    error::{Result, TodoError},
    model::{Status, Todo},
};

#[derive(Debug, serde::Deserialize)]
struct TodoEnvelope {
    todo: Todo,
}

#[derive(Debug, serde::Deserialize)]
struct TodosEnvelope {
    todos: Vec<Todo>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTodoClient {
    http: Client,
    base_url: String,
}

impl HttpTodoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub async fn create_todo(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        status: Option<Status>,
    ) -> Result<Todo> {
        let response = self
            .http
            .post(format!("{}/todo/{user_id}/createTodo", self.base_url))
            .json(&json!({"title": title, "description": description, "status": status}))
            .send()
            .await?;
        let envelope: TodoEnvelope = decode(response).await?;
        Ok(envelope.todo)
    }

    pub async fn delete_todo(&self, todo_id: Uuid) -> Result<Todo> {
        let response = self
            .http
            .delete(format!("{}/todo/{todo_id}/deleteTodo", self.base_url))
            .send()
            .await?;
        let envelope: TodoEnvelope = decode(response).await?;
        Ok(envelope.todo)
    }
}

#[async_trait]
impl TodoBackend for HttpTodoClient {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Todo>> {
        let response = self
            .http
            .get(format!("{}/todo/{user_id}/getTodos", self.base_url))
            .send()
            .await?;
        let envelope: TodosEnvelope = decode(response).await?;
        Ok(envelope.todos)
    }

    async fn move_todo(&self, todo_id: Uuid, status: Status, order: i64) -> Result<Todo> {
        let response = self
            .http
            .put(format!("{}/todo/{todo_id}/moveTodo", self.base_url))
            .json(&json!({"status": status, "order": order}))
            .send()
            .await?;
        let envelope: TodoEnvelope = decode(response).await?;
        Ok(envelope.todo)
    }
}

// Map the API's status codes back onto the error taxonomy
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<ErrorEnvelope>()
        .await
        .unwrap_or_default()
        .message
        .unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::BAD_REQUEST => TodoError::Validation { message },
        StatusCode::NOT_FOUND => TodoError::NotFound {
            resource: "todo",
            id: message.trim_start_matches("todo not found: ").to_string(),
        },
        StatusCode::CONFLICT => TodoError::OrderConflict,
        other => TodoError::Unexpected {
            status: other.as_u16(),
            message,
        },
    })
}
