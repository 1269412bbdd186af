use crate::model::role::Role;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "jane.doe@company.com")]
    pub email: String,

    /// Argon2 hash, never serialized.
    #[serde(skip_serializing)]
    #[schema(write_only)]
    pub password: String,

    pub role: Role,

    #[schema(example = "EMP-001", nullable = true)]
    pub employee_id: Option<String>,

    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
