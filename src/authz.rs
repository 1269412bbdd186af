//! Authorization gate: pure predicates over the acting identity and the
//! target resource. Handlers must consult the matching predicate before
//! touching the database and bail out with 403 on a `false` result.

use actix_web::error::ErrorForbidden;

use crate::auth::auth::AuthUser;
use crate::model::user::User;

/// List or create users.
pub fn can_manage_users(actor: &AuthUser) -> bool {
    actor.role.is_admin() || actor.role.is_staff()
}

/// View one user's details: admin, staff, or the user themself.
pub fn can_view_user(actor: &AuthUser, target: &User) -> bool {
    actor.role.is_admin() || actor.role.is_staff() || actor.user_id == target.id
}

/// Update a user: admins may touch anyone, staff anyone but admins.
pub fn can_update_user(actor: &AuthUser, target: &User) -> bool {
    actor.role.is_admin() || (actor.role.is_staff() && !target.role.is_admin())
}

/// Delete a user: admin only, and never their own account.
pub fn can_delete_user(actor: &AuthUser, target: &User) -> bool {
    actor.role.is_admin() && actor.user_id != target.id
}

/// List attendance. Every role may list; employees are restricted to their
/// own records by the query scoping, not by this predicate.
pub fn can_view_attendance(_actor: &AuthUser) -> bool {
    true
}

/// View one attendance record.
pub fn can_view_attendance_record(actor: &AuthUser, record_user_id: u64) -> bool {
    if actor.role.is_admin() || actor.role.is_staff() {
        return true;
    }
    actor.role.is_employee() && record_user_id == actor.user_id
}

/// Any schedule operation.
pub fn can_manage_schedules(actor: &AuthUser) -> bool {
    actor.role.is_admin()
}

/// Short-circuit helper so handlers read as one line per gate.
pub fn require(allowed: bool) -> actix_web::Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(ErrorForbidden("Forbidden"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::NaiveDate;

    fn actor(id: u64, role: Role) -> AuthUser {
        AuthUser {
            user_id: id,
            email: format!("user{id}@example.com"),
            role,
            employee_id: None,
        }
    }

    fn target(id: u64, role: Role) -> User {
        User {
            id,
            name: format!("user-{id}"),
            email: format!("user{id}@example.com"),
            password: String::new(),
            role,
            employee_id: None,
            department: None,
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn manage_users_is_admin_or_staff() {
        assert!(can_manage_users(&actor(1, Role::Admin)));
        assert!(can_manage_users(&actor(1, Role::Staff)));
        assert!(!can_manage_users(&actor(1, Role::Employee)));
    }

    #[test]
    fn view_user_allows_self_for_employees() {
        let me = actor(5, Role::Employee);
        assert!(can_view_user(&me, &target(5, Role::Employee)));
        assert!(!can_view_user(&me, &target(6, Role::Employee)));
        assert!(can_view_user(&actor(1, Role::Admin), &target(6, Role::Employee)));
        assert!(can_view_user(&actor(2, Role::Staff), &target(6, Role::Employee)));
    }

    #[test]
    fn staff_cannot_update_admins() {
        let staff = actor(2, Role::Staff);
        assert!(can_update_user(&staff, &target(3, Role::Employee)));
        assert!(can_update_user(&staff, &target(4, Role::Staff)));
        assert!(!can_update_user(&staff, &target(1, Role::Admin)));

        let admin = actor(1, Role::Admin);
        assert!(can_update_user(&admin, &target(9, Role::Admin)));

        assert!(!can_update_user(&actor(5, Role::Employee), &target(5, Role::Employee)));
    }

    #[test]
    fn delete_is_admin_only_and_never_self() {
        assert!(can_delete_user(&actor(1, Role::Admin), &target(2, Role::Staff)));
        assert!(!can_delete_user(&actor(1, Role::Admin), &target(1, Role::Admin)));
        assert!(!can_delete_user(&actor(2, Role::Staff), &target(3, Role::Employee)));
        assert!(!can_delete_user(&actor(3, Role::Employee), &target(4, Role::Employee)));
    }

    #[test]
    fn attendance_detail_scopes_employees_to_own_records() {
        assert!(can_view_attendance_record(&actor(1, Role::Admin), 9));
        assert!(can_view_attendance_record(&actor(2, Role::Staff), 9));
        assert!(can_view_attendance_record(&actor(9, Role::Employee), 9));
        assert!(!can_view_attendance_record(&actor(8, Role::Employee), 9));
    }

    #[test]
    fn attendance_list_is_open_to_every_role() {
        assert!(can_view_attendance(&actor(1, Role::Admin)));
        assert!(can_view_attendance(&actor(2, Role::Staff)));
        assert!(can_view_attendance(&actor(3, Role::Employee)));
    }

    #[test]
    fn schedules_are_admin_only() {
        assert!(can_manage_schedules(&actor(1, Role::Admin)));
        assert!(!can_manage_schedules(&actor(2, Role::Staff)));
        assert!(!can_manage_schedules(&actor(3, Role::Employee)));
    }

    #[test]
    fn require_maps_false_to_forbidden() {
        assert!(require(true).is_ok());
        let err = require(false).unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::FORBIDDEN
        );
    }
}
