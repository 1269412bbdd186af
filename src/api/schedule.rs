use crate::auth::auth::AuthUser;
use crate::authz;
use crate::model::schedule::Schedule;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::ToSchema;

const UPDATABLE_FIELDS: &[&str] = &["name", "start_time", "end_time", "working_days", "is_active"];

#[derive(Deserialize, ToSchema)]
pub struct CreateSchedule {
    #[schema(example = "Day Shift")]
    pub name: String,
    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time", example = "17:00:00")]
    pub end_time: NaiveTime,
    /// Weekday indices, 0 = Sunday through 6 = Saturday.
    #[schema(example = json!([1, 2, 3, 4, 5]))]
    pub working_days: Vec<u8>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ScheduleListResponse {
    pub data: Vec<Schedule>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 15)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

fn valid_working_days(days: &[u8]) -> bool {
    !days.is_empty() && days.iter().all(|d| *d <= 6)
}

/// Create Schedule
#[utoipa::path(
    post,
    path = "/api/v1/schedules",
    request_body = CreateSchedule,
    responses(
        (status = 201, description = "Schedule created", body = Object, example = json!({
            "message": "Schedule created successfully"
        })),
        (status = 400, description = "Invalid working days"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn create_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSchedule>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_schedules(&auth))?;

    if !valid_working_days(&payload.working_days) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Working days must be weekday indices 0-6"
        })));
    }

    let working_days = serde_json::to_string(&payload.working_days)
        .map_err(ErrorInternalServerError)?;

    let result = sqlx::query(
        r#"
        INSERT INTO schedules (name, start_time, end_time, working_days, is_active)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(&working_days)
    .bind(payload.is_active)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Schedule created successfully"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create schedule");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// List Schedules
#[utoipa::path(
    get,
    path = "/api/v1/schedules",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Paginated schedule list", body = ScheduleListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn list_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ScheduleQuery>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_schedules(&auth))?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(15).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schedules")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count schedules");
            ErrorInternalServerError("Database error")
        })?;

    let schedules = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, name, start_time, end_time, working_days, is_active
        FROM schedules
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page as i64)
    .bind(offset as i64)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch schedules");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(ScheduleListResponse {
        data: schedules,
        page,
        per_page,
        total,
    }))
}

async fn fetch_schedule(pool: &MySqlPool, id: u64) -> actix_web::Result<Option<Schedule>> {
    sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, name, start_time, end_time, working_days, is_active
        FROM schedules
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, schedule_id = id, "Failed to fetch schedule");
        ErrorInternalServerError("Database error")
    })
}

/// Get Schedule by ID
#[utoipa::path(
    get,
    path = "/api/v1/schedules/{id}",
    params(("id" = u64, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Schedule found", body = Schedule),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn get_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_schedules(&auth))?;

    match fetch_schedule(pool.get_ref(), path.into_inner()).await? {
        Some(schedule) => Ok(HttpResponse::Ok().json(schedule)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Schedule not found"
        }))),
    }
}

/// Update Schedule
#[utoipa::path(
    put,
    path = "/api/v1/schedules/{id}",
    params(("id" = u64, Path, description = "Schedule ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Schedule updated", body = Object, example = json!({
            "message": "Schedule updated successfully"
        })),
        (status = 400, description = "Bad payload"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn update_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_schedules(&auth))?;

    let id = path.into_inner();
    let payload = body.into_inner();

    if let Some(days) = payload.get("working_days") {
        let days: Vec<u8> = serde_json::from_value(days.clone())
            .map_err(|_| actix_web::error::ErrorBadRequest("working_days must be an array"))?;
        if !valid_working_days(&days) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Working days must be weekday indices 0-6"
            })));
        }
    }

    let update = build_update_sql("schedules", &payload, UPDATABLE_FIELDS, "id", id)?;
    debug!(sql = %update.sql, schedule_id = id, "Updating schedule");

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            error!(error = %e, schedule_id = id, "Failed to update schedule");
            ErrorInternalServerError("Database error")
        })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Schedule not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Schedule updated successfully"
    })))
}

/// Delete Schedule
#[utoipa::path(
    delete,
    path = "/api/v1/schedules/{id}",
    params(("id" = u64, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Schedule deleted", body = Object, example = json!({
            "message": "Schedule deleted successfully"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn delete_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_schedules(&auth))?;

    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Schedule not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Schedule deleted successfully"
            })))
        }
        Err(e) => {
            error!(error = %e, schedule_id = id, "Failed to delete schedule");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_days_must_be_weekday_indices() {
        assert!(valid_working_days(&[0, 1, 5, 6]));
        assert!(!valid_working_days(&[1, 7]));
        assert!(!valid_working_days(&[]));
    }
}
