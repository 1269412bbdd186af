use crate::api::attendance::AttendanceRow;
use crate::auth::auth::AuthUser;
use crate::auth::badge;
use crate::config::Config;
use crate::model::attendance::Attendance;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::Local;
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

/// Arrivals after this time count as late in the daily statistics.
const LATE_THRESHOLD: &str = "09:00:00";

#[derive(Serialize, ToSchema)]
pub struct DashboardStatistics {
    #[schema(example = 40)]
    pub total_employees: i64,
    #[schema(example = 33)]
    pub present_today: i64,
    #[schema(example = 4)]
    pub late_today: i64,
    #[schema(example = 180.5)]
    pub total_hours_today: f64,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    /// Caller's record for today, employees only.
    pub today_attendance: Option<Attendance>,
    /// Present for admin and staff.
    pub statistics: Option<DashboardStatistics>,
    /// Today's 10 most recent records, admin/staff only.
    pub recent_attendances: Vec<AttendanceRow>,
    /// Caller's own last 10 records, employees only.
    pub personal_attendances: Vec<Attendance>,
    /// Badge payload for the caller, rendered client-side as a QR code.
    pub qr_data: String,
}

fn db_error(e: sqlx::Error, what: &str) -> actix_web::Error {
    error!(error = %e, "Failed to load {what}");
    ErrorInternalServerError("Database error")
}

/// Dashboard
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Role-dependent dashboard payload", body = DashboardResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let today = Local::now().date_naive();

    let mut today_attendance = None;
    let mut personal_attendances = Vec::new();

    if auth.role.is_employee() {
        today_attendance = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, clock_in_time, clock_out_time, notes
            FROM attendances
            WHERE user_id = ? AND DATE(clock_in_time) = ?
            ORDER BY clock_in_time DESC
            LIMIT 1
            "#,
        )
        .bind(auth.user_id)
        .bind(today)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "today's attendance"))?;

        personal_attendances = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, clock_in_time, clock_out_time, notes
            FROM attendances
            WHERE user_id = ?
            ORDER BY clock_in_time DESC
            LIMIT 10
            "#,
        )
        .bind(auth.user_id)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "personal attendance history"))?;
    }

    let mut statistics = None;
    let mut recent_attendances = Vec::new();

    if auth.role.is_admin() || auth.role.is_staff() {
        let total_employees =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'employee'")
                .fetch_one(pool.get_ref())
                .await
                .map_err(|e| db_error(e, "employee count"))?;

        let present_today = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT user_id) FROM attendances WHERE DATE(clock_in_time) = ?",
        )
        .bind(today)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "present count"))?;

        let late_today = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendances WHERE DATE(clock_in_time) = ? AND TIME(clock_in_time) > ?",
        )
        .bind(today)
        .bind(LATE_THRESHOLD)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "late count"))?;

        let total_seconds_today = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(COALESCE(SUM(TIMESTAMPDIFF(SECOND, clock_in_time, clock_out_time)), 0) AS SIGNED)
            FROM attendances
            WHERE DATE(clock_in_time) = ? AND clock_out_time IS NOT NULL
            "#,
        )
        .bind(today)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "worked hours"))?;

        statistics = Some(DashboardStatistics {
            total_employees,
            present_today,
            late_today,
            total_hours_today: total_seconds_today as f64 / 3600.0,
        });

        recent_attendances = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT a.id, a.user_id, a.clock_in_time, a.clock_out_time, a.notes,
                   u.name, u.employee_id, u.department
            FROM attendances a
            JOIN users u ON u.id = a.user_id
            WHERE DATE(a.clock_in_time) = ?
            ORDER BY a.clock_in_time DESC
            LIMIT 10
            "#,
        )
        .bind(today)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "recent attendance"))?;
    }

    let qr_data = badge::issue(auth.user_id, config.get_ref());

    Ok(HttpResponse::Ok().json(DashboardResponse {
        today_attendance,
        statistics,
        recent_attendances,
        personal_attendances,
        qr_data,
    }))
}

/// Health check, unauthenticated.
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Local::now().to_rfc3339(),
    }))
}
