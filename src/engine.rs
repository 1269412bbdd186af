use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::model::{attendance::Attendance, user::User};
use crate::store::{AttendancePatch, AttendanceStore, NewAttendance, StoreError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClockAction {
    ClockIn,
    ClockOut,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ClockError {
    #[display(fmt = "You are already clocked in.")]
    AlreadyClockedIn,
    #[display(fmt = "You must clock in first.")]
    NotClockedIn,
    #[display(fmt = "Invalid QR code.")]
    InvalidToken,
    #[display(fmt = "Storage unavailable, please try again.")]
    StorageUnavailable,
}

impl std::error::Error for ClockError {}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClockReceipt {
    #[schema(example = "Successfully clocked in at 09:03")]
    pub message: String,
    pub record: Attendance,
}

/// Drives the per-day attendance state machine: no session, open, closed.
///
/// Clock actions for one user are serialized through a per-user lock so the
/// read-then-write cannot race with itself; different users never contend.
/// Every store call runs under a bounded timeout so a dead database surfaces
/// as `StorageUnavailable` instead of a hung request.
pub struct ClockEngine<S> {
    store: S,
    storage_timeout: Duration,
    locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl<S: AttendanceStore> ClockEngine<S> {
    pub fn new(store: S, storage_timeout: Duration) -> Self {
        ClockEngine {
            store,
            storage_timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    async fn guarded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ClockError> {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(error = %e, "store call failed");
                Err(ClockError::StorageUnavailable)
            }
            Err(_) => {
                error!(timeout_ms = self.storage_timeout.as_millis() as u64, "store call timed out");
                Err(ClockError::StorageUnavailable)
            }
        }
    }

    /// Resolves the user a verified badge points at. A badge referencing a
    /// deleted or unknown user is as invalid as a tampered one.
    pub async fn resolve_user(&self, user_id: u64) -> Result<User, ClockError> {
        self.guarded(self.store.find_user_by_id(user_id))
            .await?
            .ok_or(ClockError::InvalidToken)
    }

    pub async fn submit(
        &self,
        user: &User,
        action: ClockAction,
        notes: Option<String>,
    ) -> Result<ClockReceipt, ClockError> {
        let lock = self.user_lock(user.id).await;
        let _guard = lock.lock().await;

        let now = Local::now().naive_local();
        let existing = self
            .guarded(self.store.find_today_attendance(user.id, now.date()))
            .await?;

        match action {
            ClockAction::ClockIn => self.clock_in(user, existing, now, notes).await,
            ClockAction::ClockOut => self.clock_out(user, existing, now, notes).await,
        }
    }

    async fn clock_in(
        &self,
        user: &User,
        existing: Option<Attendance>,
        now: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<ClockReceipt, ClockError> {
        if existing.as_ref().is_some_and(Attendance::is_open) {
            return Err(ClockError::AlreadyClockedIn);
        }

        let record = self
            .guarded(self.store.insert_attendance(NewAttendance {
                user_id: user.id,
                clock_in_time: now,
                notes,
            }))
            .await?;

        info!(user_id = user.id, record_id = record.id, "clocked in");

        Ok(ClockReceipt {
            message: format!("Successfully clocked in at {}", now.format("%H:%M")),
            record,
        })
    }

    async fn clock_out(
        &self,
        user: &User,
        existing: Option<Attendance>,
        now: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<ClockReceipt, ClockError> {
        let open = match existing {
            Some(record) if record.is_open() => record,
            _ => return Err(ClockError::NotClockedIn),
        };

        // Empty or absent notes keep whatever was recorded at clock-in.
        let notes = match notes {
            Some(n) if !n.trim().is_empty() => Some(n),
            _ => open.notes.clone(),
        };

        let record = self
            .guarded(self.store.update_attendance(
                open.id,
                AttendancePatch {
                    clock_out_time: now,
                    notes,
                },
            ))
            .await?;

        info!(user_id = user.id, record_id = record.id, "clocked out");

        Ok(ClockReceipt {
            message: format!("Successfully clocked out at {}", now.format("%H:%M")),
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::store::memory::MemoryStore;
    use std::sync::atomic::Ordering;

    fn engine_with(users: Vec<User>) -> ClockEngine<MemoryStore> {
        ClockEngine::new(MemoryStore::with_users(users), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn first_clock_in_opens_a_session() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);

        let receipt = engine.submit(&user, ClockAction::ClockIn, None).await.unwrap();

        assert!(receipt.record.is_open());
        assert!(receipt.message.starts_with("Successfully clocked in at "));
        assert_eq!(engine.store.records.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn second_clock_in_is_rejected_without_a_write() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);

        engine.submit(&user, ClockAction::ClockIn, None).await.unwrap();
        let err = engine.submit(&user, ClockAction::ClockIn, None).await.unwrap_err();

        assert_eq!(err, ClockError::AlreadyClockedIn);
        assert_eq!(engine.store.records.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn clock_out_without_open_session_is_rejected() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);

        let err = engine.submit(&user, ClockAction::ClockOut, None).await.unwrap_err();

        assert_eq!(err, ClockError::NotClockedIn);
        assert!(engine.store.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn clock_out_closes_session_and_keeps_clock_in_time() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);

        let opened = engine
            .submit(&user, ClockAction::ClockIn, Some("site visit".into()))
            .await
            .unwrap();
        let closed = engine.submit(&user, ClockAction::ClockOut, None).await.unwrap();

        assert!(!closed.record.is_open());
        assert_eq!(closed.record.clock_in_time, opened.record.clock_in_time);
        // omitted notes preserve what clock-in recorded
        assert_eq!(closed.record.notes.as_deref(), Some("site visit"));
    }

    #[tokio::test]
    async fn clock_out_notes_overwrite_when_provided() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);

        engine
            .submit(&user, ClockAction::ClockIn, Some("morning".into()))
            .await
            .unwrap();
        let closed = engine
            .submit(&user, ClockAction::ClockOut, Some("left early".into()))
            .await
            .unwrap();

        assert_eq!(closed.record.notes.as_deref(), Some("left early"));
    }

    #[tokio::test]
    async fn full_day_scenario() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);

        let opened = engine.submit(&user, ClockAction::ClockIn, None).await.unwrap();
        assert!(opened.record.is_open());

        let dup = engine.submit(&user, ClockAction::ClockIn, None).await.unwrap_err();
        assert_eq!(dup, ClockError::AlreadyClockedIn);

        let closed = engine
            .submit(&user, ClockAction::ClockOut, Some("left early".into()))
            .await
            .unwrap();
        assert_eq!(closed.record.notes.as_deref(), Some("left early"));
        assert!(closed.record.clock_out_time.is_some());

        let again = engine.submit(&user, ClockAction::ClockOut, None).await.unwrap_err();
        assert_eq!(again, ClockError::NotClockedIn);
    }

    #[tokio::test]
    async fn concurrent_clock_ins_for_one_user_admit_exactly_one() {
        let user = MemoryStore::user(1, Role::Employee);
        let mut store = MemoryStore::with_users(vec![user.clone()]);
        // widen the read-to-write window so an unserialized engine would
        // let both requests pass the open-session check
        store.latency = Some(Duration::from_millis(20));
        let engine = Arc::new(ClockEngine::new(store, Duration::from_secs(5)));

        let (a, b) = tokio::join!(
            engine.submit(&user, ClockAction::ClockIn, None),
            engine.submit(&user, ClockAction::ClockIn, None),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(engine.store.records.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let alice = MemoryStore::user(1, Role::Employee);
        let bob = MemoryStore::user(2, Role::Employee);
        let engine = engine_with(vec![alice.clone(), bob.clone()]);

        let (a, b) = tokio::join!(
            engine.submit(&alice, ClockAction::ClockIn, None),
            engine.submit(&bob, ClockAction::ClockIn, None),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(engine.store.records.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_storage_unavailable() {
        let user = MemoryStore::user(1, Role::Employee);
        let engine = engine_with(vec![user.clone()]);
        engine.store.down.store(true, Ordering::SeqCst);

        let err = engine.submit(&user, ClockAction::ClockIn, None).await.unwrap_err();

        assert_eq!(err, ClockError::StorageUnavailable);
        assert!(engine.store.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let user = MemoryStore::user(1, Role::Employee);
        let mut store = MemoryStore::with_users(vec![user.clone()]);
        store.latency = Some(Duration::from_millis(100));
        let engine = ClockEngine::new(store, Duration::from_millis(10));

        let err = engine.submit(&user, ClockAction::ClockIn, None).await.unwrap_err();
        assert_eq!(err, ClockError::StorageUnavailable);
    }

    #[tokio::test]
    async fn unknown_badge_user_is_invalid() {
        let engine = engine_with(vec![MemoryStore::user(1, Role::Employee)]);

        let err = engine.resolve_user(99).await.unwrap_err();
        assert_eq!(err, ClockError::InvalidToken);

        let user = engine.resolve_user(1).await.unwrap();
        assert_eq!(user.id, 1);
    }
}
