pub mod entity;
pub mod executor;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod row;

pub use entity::Entity;
pub use executor::{PgExecutor, SqlExecutor};
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{CrudRepository, RoleRepository, SqlRepository, UserRepository};
pub use row::{Row, RowExt};
