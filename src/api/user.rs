use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::authz;
use crate::model::{role::Role, user::User};
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::{email_cache, email_filter};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Columns a PUT may touch. Everything else is rejected.
const UPDATABLE_FIELDS: &[&str] = &[
    "name",
    "email",
    "password",
    "role",
    "employee_id",
    "department",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: String,
    #[schema(min_length = 8)]
    pub password: String,
    pub role: Role,
    #[schema(example = "EMP-001", nullable = true)]
    pub employee_id: Option<String>,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 15)]
    pub per_page: u32,
    #[schema(example = 40)]
    pub total: i64,
}

async fn fetch_user(pool: &MySqlPool, id: u64) -> actix_web::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, employee_id, department, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id = id, "Failed to fetch user");
        ErrorInternalServerError("Database error")
    })
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.trim().to_lowercase();

    // 1️⃣ Cuckoo filter — fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2️⃣ Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3️⃣ Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

/// Create User
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully"
        })),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email or employee ID already in use"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_users(&auth))?;

    let email = payload.email.trim();
    if payload.name.trim().is_empty() || email.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and email must not be empty"
        })));
    }
    if payload.password.len() < 8 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Password must be at least 8 characters"
        })));
    }

    if !is_email_available(email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "This email is already registered to another user"
        })));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password, role, employee_id, department)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(email)
    .bind(&hashed)
    .bind(payload.role)
    .bind(&payload.employee_id)
    .bind(&payload.department)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            email_filter::insert(email);
            email_cache::mark_taken(email).await;
            Ok(HttpResponse::Created().json(json!({
                "message": "User created successfully"
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Email or employee ID already in use"
                    })));
                }
            }

            error!(error = %e, "Failed to create user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// List Users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    authz::require(authz::can_manage_users(&auth))?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(15).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count users");
            ErrorInternalServerError("Database error")
        })?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, employee_id, department, created_at
        FROM users
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page as i64)
    .bind(offset as i64)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch users");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Get User by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let user = match fetch_user(pool.get_ref(), id).await? {
        Some(u) => u,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "User not found"
            })));
        }
    };

    authz::require(authz::can_view_user(&auth, &user))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Update User
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    request_body = Object,
    responses(
        (status = 200, description = "User updated", body = Object, example = json!({
            "message": "User updated successfully"
        })),
        (status = 400, description = "Bad payload"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let target = match fetch_user(pool.get_ref(), id).await? {
        Some(u) => u,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "User not found"
            })));
        }
    };

    authz::require(authz::can_update_user(&auth, &target))?;

    let mut payload = body.into_inner();
    if let Some(obj) = payload.as_object_mut() {
        // blank password means "leave it alone"
        match obj.get("password") {
            Some(Value::String(p)) if !p.is_empty() => {
                let hashed = hash_password(p).map_err(|e| {
                    error!(error = %e, "Password hashing failed");
                    ErrorInternalServerError("Internal Server Error")
                })?;
                obj.insert("password".into(), Value::String(hashed));
            }
            Some(_) => {
                obj.remove("password");
            }
            None => {}
        }

        if let Some(role) = obj.get("role") {
            let valid = role
                .as_str()
                .is_some_and(|r| Role::from_str(r).is_ok());
            if !valid {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "Please select a valid role"
                })));
            }
        }
    }

    let update = build_update_sql("users", &payload, UPDATABLE_FIELDS, "id", id)?;
    debug!(sql = %update.sql, user_id = id, "Updating user");

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = id, "Failed to update user");
            ErrorInternalServerError("Database error")
        })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    // keep the availability structures in line with an email change
    if let Some(new_email) = payload.get("email").and_then(Value::as_str) {
        if !new_email.eq_ignore_ascii_case(&target.email) {
            email_filter::remove(&target.email);
            email_cache::forget(&target.email).await;
            email_filter::insert(new_email);
            email_cache::mark_taken(new_email).await;
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated successfully"
    })))
}

/// Delete User
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = Object, example = json!({
            "message": "User deleted successfully"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let target = match fetch_user(pool.get_ref(), id).await? {
        Some(u) => u,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "User not found"
            })));
        }
    };

    authz::require(authz::can_delete_user(&auth, &target))?;

    // attendance rows go with the user via ON DELETE CASCADE
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "User not found"
                })));
            }

            email_filter::remove(&target.email);
            email_cache::forget(&target.email).await;

            Ok(HttpResponse::Ok().json(json!({
                "message": "User deleted successfully"
            })))
        }
        Err(e) => {
            error!(error = %e, user_id = id, "Failed to delete user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
