//! API handlers module

pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod genres;
pub mod health;
pub mod reviews;
pub mod titles;
pub mod users;
