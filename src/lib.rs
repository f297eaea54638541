//! Multi-user Kanban todo board: REST API, SQLite store, the ordering engine
//! shared by server and client, and an optimistic client-side board.

pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod ordering;
pub mod password;
pub mod route;
pub mod schema;
pub mod store;
pub mod user;

use sqlx::{Pool, Sqlite};

use crate::{store::TodoStore, user::UserStore};

// Struct representing the application state
pub struct AppState {
    pub todos: TodoStore,
    pub users: UserStore,
}

impl AppState {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self {
            todos: TodoStore::new(db.clone()),
            users: UserStore::new(db),
        }
    }
}
