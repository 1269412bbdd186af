use crate::auth::auth::AuthUser;
use crate::auth::badge;
use crate::authz;
use crate::config::Config;
use crate::engine::{ClockAction, ClockEngine, ClockError};
use crate::store::mysql::MySqlStore;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::ToSchema;

pub const MAX_NOTES_LEN: usize = 1000;

#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    /// Badge payload scanned from the QR code.
    pub qr_data: String,
    pub action: ClockAction,
    #[schema(example = "left early", nullable = true)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub user_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_from: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_to: Option<NaiveDate>,
}

/// Attendance record joined with the owning user's directory fields.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRow {
    pub id: u64,
    pub user_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub clock_in_time: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub clock_out_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub name: String,
    pub employee_id: Option<String>,
    pub department: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Employees only ever see their own records; the filter they requested is
/// overridden with their own id. Admin and staff may filter freely.
fn effective_user_filter(auth: &AuthUser, requested: Option<u64>) -> Option<u64> {
    if auth.role.is_employee() {
        Some(auth.user_id)
    } else {
        requested
    }
}

/// Typed binds for the dynamic WHERE clause. Dates have to reach MySQL as
/// DATE values; sending them as JSON-encoded strings leaves them
/// quote-wrapped on the wire and the comparison matches nothing.
#[derive(Debug, PartialEq)]
enum FilterBind {
    Id(i64),
    Day(NaiveDate),
}

fn build_attendance_filters(
    auth: &AuthUser,
    query: &AttendanceQuery,
) -> (String, Vec<FilterBind>) {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(user_id) = effective_user_filter(auth, query.user_id) {
        conditions.push("a.user_id = ?");
        bindings.push(FilterBind::Id(user_id as i64));
    }

    if let Some(date_from) = query.date_from {
        conditions.push("DATE(a.clock_in_time) >= ?");
        bindings.push(FilterBind::Day(date_from));
    }

    if let Some(date_to) = query.date_to {
        conditions.push("DATE(a.clock_in_time) <= ?");
        bindings.push(FilterBind::Day(date_to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bindings)
}

fn count_sql(where_clause: &str) -> String {
    format!(
        "SELECT COUNT(*) as total FROM attendances a {}",
        where_clause
    )
}

fn list_sql(where_clause: &str) -> String {
    format!(
        r#"
        SELECT a.id, a.user_id, a.clock_in_time, a.clock_out_time, a.notes,
               u.name, u.employee_id, u.department
        FROM attendances a
        JOIN users u ON u.id = a.user_id
        {}
        ORDER BY a.clock_in_time DESC
        LIMIT ? OFFSET ?
        "#,
        where_clause
    )
}

fn clock_error_response(err: ClockError) -> HttpResponse {
    match err {
        ClockError::StorageUnavailable => {
            HttpResponse::ServiceUnavailable().json(json!({ "message": err.to_string() }))
        }
        _ => HttpResponse::BadRequest().json(json!({ "message": err.to_string() })),
    }
}

/// Clock in / clock out via badge
#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Clock action recorded", body = Object, example = json!({
            "message": "Successfully clocked in at 09:03"
        })),
        (status = 400, description = "Invalid badge, already clocked in, or not clocked in", body = Object, example = json!({
            "message": "You are already clocked in."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Storage unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock(
    _auth: AuthUser,
    engine: web::Data<ClockEngine<MySqlStore>>,
    config: web::Data<Config>,
    payload: web::Json<ClockRequest>,
) -> actix_web::Result<impl Responder> {
    if payload
        .notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LEN)
    {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Notes cannot exceed 1000 characters."
        })));
    }

    // Identity comes from the badge, not from the session: a kiosk logged
    // in as any account submits badges on behalf of whoever scans.
    let claims = match badge::verify(&payload.qr_data, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "badge rejected");
            return Ok(clock_error_response(ClockError::InvalidToken));
        }
    };

    let user = match engine.resolve_user(claims.user_id).await {
        Ok(u) => u,
        Err(e) => return Ok(clock_error_response(e)),
    };

    // Spend the badge only after it resolved to a real user, so a mistyped
    // scan does not burn a single-use token.
    if config.badge_single_use {
        if let Err(e) = badge::consume(&claims).await {
            debug!(error = %e, user_id = user.id, "badge replay rejected");
            return Ok(clock_error_response(ClockError::InvalidToken));
        }
    }

    match engine
        .submit(&user, payload.action, payload.notes.clone())
        .await
    {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({ "message": receipt.message }))),
        Err(e) => Ok(clock_error_response(e)),
    }
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("user_id" = Option<u64>, Query, description = "Filter by user (admin/staff only)"),
        ("date_from" = Option<String>, Query, description = "Clock-in date lower bound (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Clock-in date upper bound (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Paginated attendance list, most recent clock-in first", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_view_attendance(&auth))?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let (where_clause, bindings) = build_attendance_filters(&auth, &query);

    // ---------- total count ----------
    let count_sql = count_sql(&where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting attendance records");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            FilterBind::Id(id) => count_query.bind(id),
            FilterBind::Day(day) => count_query.bind(day),
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count attendance records");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = list_sql(&where_clause);
    debug!(sql = %data_sql, bindings = ?bindings, page, per_page, "Fetching attendance records");

    let mut data_query = sqlx::query_as::<_, AttendanceRow>(&data_sql);
    for b in &bindings {
        data_query = match b {
            FilterBind::Id(id) => data_query.bind(id),
            FilterBind::Day(day) => data_query.bind(day),
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let records = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch attendance records");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}

/// Get one attendance record
#[utoipa::path(
    get,
    path = "/api/v1/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRow),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let record = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT a.id, a.user_id, a.clock_in_time, a.clock_out_time, a.notes,
               u.name, u.employee_id, u.department
        FROM attendances a
        JOIN users u ON u.id = a.user_id
        WHERE a.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, id, "Failed to fetch attendance record");
        ErrorInternalServerError("Database error")
    })?;

    let record = match record {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Attendance record not found"
            })));
        }
    };

    authz::require(authz::can_view_attendance_record(&auth, record.user_id))?;

    Ok(HttpResponse::Ok().json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn actor(id: u64, role: Role) -> AuthUser {
        AuthUser {
            user_id: id,
            email: format!("user{id}@example.com"),
            role,
            employee_id: None,
        }
    }

    #[test]
    fn employees_are_pinned_to_their_own_records() {
        let emp = actor(7, Role::Employee);
        assert_eq!(effective_user_filter(&emp, None), Some(7));
        assert_eq!(effective_user_filter(&emp, Some(3)), Some(7));
    }

    #[test]
    fn staff_and_admin_filter_freely() {
        assert_eq!(effective_user_filter(&actor(1, Role::Admin), Some(3)), Some(3));
        assert_eq!(effective_user_filter(&actor(2, Role::Staff), None), None);
    }

    fn query(
        user_id: Option<u64>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> AttendanceQuery {
        AttendanceQuery {
            page: None,
            per_page: None,
            user_id,
            date_from,
            date_to,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_binds_typed_dates() {
        let (where_clause, bindings) = build_attendance_filters(
            &actor(1, Role::Admin),
            &query(None, Some(day(2026, 8, 1)), Some(day(2026, 8, 31))),
        );

        assert_eq!(
            where_clause,
            "WHERE DATE(a.clock_in_time) >= ? AND DATE(a.clock_in_time) <= ?"
        );
        assert_eq!(
            bindings,
            vec![
                FilterBind::Day(day(2026, 8, 1)),
                FilterBind::Day(day(2026, 8, 31)),
            ]
        );
    }

    #[test]
    fn user_and_date_filters_compose_in_order() {
        let (where_clause, bindings) = build_attendance_filters(
            &actor(1, Role::Staff),
            &query(Some(9), Some(day(2026, 8, 1)), None),
        );

        assert_eq!(
            where_clause,
            "WHERE a.user_id = ? AND DATE(a.clock_in_time) >= ?"
        );
        assert_eq!(
            bindings,
            vec![FilterBind::Id(9), FilterBind::Day(day(2026, 8, 1))]
        );
    }

    #[test]
    fn employee_scope_overrides_requested_user_filter() {
        let (where_clause, bindings) =
            build_attendance_filters(&actor(7, Role::Employee), &query(Some(3), None, None));

        assert_eq!(where_clause, "WHERE a.user_id = ?");
        assert_eq!(bindings, vec![FilterBind::Id(7)]);
    }

    #[test]
    fn unfiltered_list_has_empty_where_clause() {
        let (where_clause, bindings) =
            build_attendance_filters(&actor(1, Role::Admin), &query(None, None, None));
        assert_eq!(where_clause, "");
        assert!(bindings.is_empty());
    }

    #[test]
    fn list_orders_most_recent_clock_in_first() {
        let sql = list_sql("");
        assert!(sql.contains("ORDER BY a.clock_in_time DESC"));
        assert!(count_sql("").starts_with("SELECT COUNT(*)"));
    }
}
