use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub user_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub clock_in_time: NaiveDateTime,
    /// Null while the session is still open.
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub clock_out_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

impl Attendance {
    pub fn is_open(&self) -> bool {
        self.clock_out_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn session_is_open_until_clock_out_is_set() {
        let mut rec = Attendance {
            id: 1,
            user_id: 7,
            clock_in_time: at(9, 0),
            clock_out_time: None,
            notes: None,
        };
        assert!(rec.is_open());

        rec.clock_out_time = Some(at(17, 30));
        assert!(!rec.is_open());
    }
}
