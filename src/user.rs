use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{
    error::{Result, TodoError},
    model::User,
    password::{hash_password, verify_password},
};

const USER_COLUMNS: &str = "id, full_name, email, password_hash, created_at, updated_at";

#[derive(Clone)]
pub struct UserStore {
    db: Pool<Sqlite>,
}

impl UserStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub async fn register(
        &self,
        full_name: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User> {
        let (Some(full_name), Some(email), Some(password)) = (
            non_blank(full_name),
            non_blank(email),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(TodoError::validation(
                "please enter fullName, email and password",
            ));
        };
        let email = normalize_email(email)?;

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(TodoError::EmailTaken { email });
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|_| TodoError::Hashing)??;
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(&email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|err| match TodoError::from(err) {
            // lost a race with another registration of the same address
            TodoError::OrderConflict => TodoError::EmailTaken {
                email: email.clone(),
            },
            other => other,
        })?;

        tracing::info!(user = %user.id, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: Option<&str>, password: Option<&str>) -> Result<User> {
        let (Some(email), Some(password)) = (non_blank(email), password) else {
            return Err(TodoError::validation("please enter email and password"));
        };
        let email = normalize_email(email)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(TodoError::InvalidCredentials)?;

        let password = password.to_string();
        let stored = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|_| TodoError::Hashing)?;
        if !verified {
            tracing::warn!(user = %user.id, "rejected login");
            return Err(TodoError::InvalidCredentials);
        }

        Ok(user)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(TodoError::validation("Invalid email")),
    }
}
