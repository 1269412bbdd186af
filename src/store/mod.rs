use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;

use crate::model::{attendance::Attendance, user::User};

pub mod mysql;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "storage unavailable")]
    Unavailable,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Row to insert on clock-in.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub user_id: u64,
    pub clock_in_time: NaiveDateTime,
    pub notes: Option<String>,
}

/// Patch applied on clock-out.
#[derive(Debug, Clone)]
pub struct AttendancePatch {
    pub clock_out_time: NaiveDateTime,
    pub notes: Option<String>,
}

/// Persistence contract consumed by the clock engine. The MySQL
/// implementation is the production one; tests drive the engine with an
/// in-memory store.
pub trait AttendanceStore: Send + Sync {
    async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;

    /// Latest record whose clock-in falls on `date`. At most one such
    /// record can be open at a time.
    async fn find_today_attendance(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, StoreError>;

    async fn insert_attendance(&self, new: NewAttendance) -> Result<Attendance, StoreError>;

    async fn update_attendance(
        &self,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<Attendance, StoreError>;
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use crate::model::role::Role;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// In-memory store for engine tests. Optional latency widens the
    /// read-to-write window so interleaving bugs would actually show up.
    pub struct MemoryStore {
        pub users: Vec<User>,
        pub records: Mutex<Vec<Attendance>>,
        next_id: AtomicU64,
        pub latency: Option<Duration>,
        pub down: AtomicBool,
    }

    impl MemoryStore {
        pub fn with_users(users: Vec<User>) -> Self {
            MemoryStore {
                users,
                records: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                latency: None,
                down: AtomicBool::new(false),
            }
        }

        pub fn user(id: u64, role: Role) -> User {
            User {
                id,
                name: format!("user-{id}"),
                email: format!("user{id}@example.com"),
                password: String::new(),
                role,
                employee_id: None,
                department: None,
                created_at: chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            }
        }

        async fn simulate_io(&self) -> Result<(), StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable);
            }
            if let Some(d) = self.latency {
                tokio::time::sleep(d).await;
            }
            Ok(())
        }
    }

    impl AttendanceStore for MemoryStore {
        async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
            self.simulate_io().await?;
            Ok(self.users.iter().find(|u| u.id == id).cloned())
        }

        async fn find_today_attendance(
            &self,
            user_id: u64,
            date: NaiveDate,
        ) -> Result<Option<Attendance>, StoreError> {
            self.simulate_io().await?;
            let records = self.records.lock().await;
            Ok(records
                .iter()
                .filter(|r| r.user_id == user_id && r.clock_in_time.date() == date)
                .max_by_key(|r| r.clock_in_time)
                .cloned())
        }

        async fn insert_attendance(&self, new: NewAttendance) -> Result<Attendance, StoreError> {
            self.simulate_io().await?;
            let mut records = self.records.lock().await;
            let record = Attendance {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                user_id: new.user_id,
                clock_in_time: new.clock_in_time,
                clock_out_time: None,
                notes: new.notes,
            };
            records.push(record.clone());
            Ok(record)
        }

        async fn update_attendance(
            &self,
            id: u64,
            patch: AttendancePatch,
        ) -> Result<Attendance, StoreError> {
            self.simulate_io().await?;
            let mut records = self.records.lock().await;
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
            record.clock_out_time = Some(patch.clock_out_time);
            record.notes = patch.notes;
            Ok(record.clone())
        }
    }
}
