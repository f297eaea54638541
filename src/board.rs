// Client-side copy of a board. Drops apply locally first; a failed persist
// reloads the whole board from the backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    model::{Status, Todo},
    ordering::{self, DropInstruction, MovePlan},
    store::TodoStore,
};

#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Todo>>;

    async fn move_todo(&self, todo_id: Uuid, status: Status, order: i64) -> Result<Todo>;
}

#[async_trait]
impl TodoBackend for TodoStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Todo>> {
        TodoStore::list(self, user_id).await
    }

    async fn move_todo(&self, todo_id: Uuid, status: Status, order: i64) -> Result<Todo> {
        TodoStore::move_todo(self, todo_id, status, order).await
    }
}

pub struct Board<B> {
    backend: B,
    user_id: Uuid,
    todos: Vec<Todo>,
}

impl<B: TodoBackend> Board<B> {
    pub async fn load(backend: B, user_id: Uuid) -> Result<Self> {
        let todos = backend.list(user_id).await?;
        Ok(Self {
            backend,
            user_id,
            todos,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn column(&self, status: Status) -> Vec<&Todo> {
        self.todos.iter().filter(|t| t.status == status).collect()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.todos = self.backend.list(self.user_id).await?;
        Ok(())
    }

    // Returns the plan still to persist, None when nothing changes
    pub fn apply_drop(&mut self, instruction: &DropInstruction) -> Result<Option<MovePlan>> {
        let plan = ordering::plan_drop(&self.todos, instruction)?;
        if let Some(plan) = &plan {
            plan.apply(&mut self.todos);
        }
        Ok(plan)
    }

    pub async fn persist(&mut self, plan: &MovePlan) -> Result<Todo> {
        let moved = plan.moved;
        match self
            .backend
            .move_todo(moved.id, moved.status, moved.order)
            .await
        {
            Ok(todo) => Ok(todo),
            Err(err) => {
                tracing::warn!(todo = %moved.id, error = %err, "move failed, reloading board");
                if let Err(reload) = self.refresh().await {
                    tracing::warn!(error = %reload, "board reload failed");
                }
                Err(err)
            }
        }
    }

    pub async fn drop_card(&mut self, instruction: &DropInstruction) -> Result<Option<Todo>> {
        match self.apply_drop(instruction)? {
            Some(plan) => self.persist(&plan).await.map(Some),
            None => Ok(None),
        }
    }
}
