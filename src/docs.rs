use crate::api::attendance::{
    AttendanceListResponse, AttendanceQuery, AttendanceRow, ClockRequest,
};
use crate::api::dashboard::{DashboardResponse, DashboardStatistics};
use crate::api::schedule::{CreateSchedule, ScheduleListResponse, ScheduleQuery};
use crate::api::user::{CreateUser, UserListResponse, UserQuery};
use crate::auth::handlers::{LoginRequest, LoginResponse};
use crate::engine::{ClockAction, ClockReceipt};
use crate::model::{attendance::Attendance, role::Role, schedule::Schedule, user::User};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Role-gated attendance tracking with QR-badge clock-in/clock-out.

### 🔹 Key Features
- **User Management**
  - Admin/staff manage accounts; employees see their own profile
- **Attendance**
  - Badge-based clock-in and clock-out, one session per user per day
  - Filterable history, scoped to the caller's role
- **Schedules**
  - Admin-managed work schedule templates
- **Dashboard**
  - Personal badge + today's record for employees, daily statistics for admin/staff

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**. Clock actions
are authorized by a signed **badge token** carried in the QR code; expiry
and single-use enforcement are configurable.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::clock,
        crate::api::attendance::list_attendance,
        crate::api::attendance::get_attendance,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::schedule::create_schedule,
        crate::api::schedule::list_schedules,
        crate::api::schedule::get_schedule,
        crate::api::schedule::update_schedule,
        crate::api::schedule::delete_schedule,

        crate::api::dashboard::dashboard,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            ClockRequest,
            ClockAction,
            ClockReceipt,
            Attendance,
            AttendanceQuery,
            AttendanceRow,
            AttendanceListResponse,
            Role,
            User,
            CreateUser,
            UserQuery,
            UserListResponse,
            Schedule,
            CreateSchedule,
            ScheduleQuery,
            ScheduleListResponse,
            DashboardStatistics,
            DashboardResponse
        )
    ),
    tags(
        (name = "Auth", description = "Login session APIs"),
        (name = "Attendance", description = "Clock actions and attendance history"),
        (name = "Users", description = "User management APIs"),
        (name = "Schedules", description = "Schedule management APIs"),
        (name = "Dashboard", description = "Role-dependent dashboard"),
    )
)]
pub struct ApiDoc;
