use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Work schedule template. Configuration only; the clock engine does not
/// consult schedules when recording attendance.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Schedule {
    pub id: u64,

    #[schema(example = "Day Shift")]
    pub name: String,

    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub start_time: NaiveTime,

    #[schema(value_type = String, format = "time", example = "17:00:00")]
    pub end_time: NaiveTime,

    /// Weekday indices, 0 = Sunday through 6 = Saturday.
    #[schema(value_type = Vec<u8>, example = json!([1, 2, 3, 4, 5]))]
    pub working_days: sqlx::types::Json<Vec<u8>>,

    pub is_active: bool,
}
