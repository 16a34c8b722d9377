//! HTTP handlers, one module per resource.

pub mod auth;
pub mod health;
pub mod pagination;
pub mod roles;
pub mod users;
