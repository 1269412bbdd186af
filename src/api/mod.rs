pub mod attendance;
pub mod dashboard;
pub mod schedule;
pub mod user;
