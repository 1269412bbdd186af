use chrono::NaiveDate;
use sqlx::MySqlPool;

use super::{AttendancePatch, AttendanceStore, NewAttendance, StoreError};
use crate::model::{attendance::Attendance, user::User};

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }
}

impl AttendanceStore for MySqlStore {
    async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, role, employee_id, department, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_today_attendance(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, StoreError> {
        let record = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, clock_in_time, clock_out_time, notes
            FROM attendances
            WHERE user_id = ? AND DATE(clock_in_time) = ?
            ORDER BY clock_in_time DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_attendance(&self, new: NewAttendance) -> Result<Attendance, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendances (user_id, clock_in_time, notes)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.clock_in_time)
        .bind(&new.notes)
        .execute(&self.pool)
        .await?;

        Ok(Attendance {
            id: result.last_insert_id(),
            user_id: new.user_id,
            clock_in_time: new.clock_in_time,
            clock_out_time: None,
            notes: new.notes,
        })
    }

    async fn update_attendance(
        &self,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<Attendance, StoreError> {
        sqlx::query(
            r#"
            UPDATE attendances
            SET clock_out_time = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.clock_out_time)
        .bind(&patch.notes)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let record = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, clock_in_time, clock_out_time, notes
            FROM attendances
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}
