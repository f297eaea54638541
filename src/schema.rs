// Request bodies. Required fields are optional here so that a missing field
// comes back as our own 400. Wrongly typed fields are rejected by the
// extractor and mapped to the same 400 in `TodoError`.

// Struct representing the request body for creating a new Todo
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CreateTodoSchema {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

// Struct representing the request body for updating a Todo
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct UpdateTodoSchema {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub order: Option<i64>,
}

// Struct representing the request body for moving a Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct MoveTodoSchema {
    pub status: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSchema {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LoginSchema {
    pub email: Option<String>,
    pub password: Option<String>,
}
