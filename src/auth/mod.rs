pub mod auth;
pub mod badge;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
