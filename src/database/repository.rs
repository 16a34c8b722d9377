use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use super::entity::Entity;
use super::executor::SqlExecutor;
use super::manager::DatabaseError;
use super::models::{Role, User};
use super::query_builder::QueryBuilder;
use crate::filter::{FilterMap, Page, PageRequest, SqlParams};

/// CRUD contract shared by the plain SQL repository and its decorators
#[async_trait]
pub trait CrudRepository<E: Entity>: Send + Sync {
    /// Insert, then return the row as persisted
    async fn save(&self, entity: E) -> Result<E, DatabaseError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, DatabaseError>;

    async fn find_all_paged(&self, request: &PageRequest, filters: &FilterMap) -> Result<Page<E>, DatabaseError>;

    /// Rows affected; 0 when the row no longer exists
    async fn update(&self, entity: &mut E) -> Result<u64, DatabaseError>;

    /// Rows affected; 0 when there was nothing to delete
    async fn delete_by_id(&self, id: i64) -> Result<u64, DatabaseError>;
}

/// Generic single-table repository over the SQL gateway
pub struct SqlRepository<E> {
    executor: Arc<dyn SqlExecutor>,
    _phantom: PhantomData<E>,
}

pub type UserRepository = SqlRepository<User>;
pub type RoleRepository = SqlRepository<Role>;

impl<E> Clone for SqlRepository<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<E: Entity> SqlRepository<E> {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            executor,
            _phantom: PhantomData,
        }
    }

    async fn fetch(&self, sql: &str, params: &SqlParams) -> Result<Vec<E>, DatabaseError> {
        self.executor
            .query_rows(sql, params)
            .await?
            .iter()
            .map(E::decode)
            .collect()
    }
}

fn log_elapsed(table: &str, op: &str, started: Instant) {
    tracing::debug!(
        "execution time for '{}.{}': {} ms",
        table,
        op,
        started.elapsed().as_millis()
    );
}

#[async_trait]
impl<E: Entity> CrudRepository<E> for SqlRepository<E> {
    async fn save(&self, entity: E) -> Result<E, DatabaseError> {
        let started = Instant::now();
        let insert = QueryBuilder::<E>::insert_sql(&entity)?;
        let id = self.executor.query_scalar(&insert.query, &insert.params).await?;

        let saved = self.find_by_id(id).await?.ok_or_else(|| {
            tracing::error!("{} row {} vanished right after insert", E::TABLE, id);
            DatabaseError::Consistency(format!("{} with id {} not found after insert", E::TABLE, id))
        })?;
        log_elapsed(E::TABLE, "save", started);
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, DatabaseError> {
        let started = Instant::now();
        let select = QueryBuilder::<E>::select_by_id(id);
        let found = self.fetch(&select.query, &select.params).await?.into_iter().next();
        log_elapsed(E::TABLE, "find_by_id", started);
        Ok(found)
    }

    async fn find_all_paged(&self, request: &PageRequest, filters: &FilterMap) -> Result<Page<E>, DatabaseError> {
        let started = Instant::now();
        let builder = QueryBuilder::<E>::new()?.filter(filters).page(request);

        let count = builder.to_count_sql()?;
        let total = self.executor.query_scalar(&count.query, &count.params).await?;

        let select = builder.to_select_sql()?;
        let content = self.fetch(&select.query, &select.params).await?;

        log_elapsed(E::TABLE, "find_all_paged", started);
        Ok(Page::new(content, request, total))
    }

    async fn update(&self, entity: &mut E) -> Result<u64, DatabaseError> {
        let started = Instant::now();
        let update = QueryBuilder::<E>::update_sql(entity)?;
        let affected = self.executor.execute(&update.query, &update.params).await?;
        log_elapsed(E::TABLE, "update", started);
        Ok(affected)
    }

    async fn delete_by_id(&self, id: i64) -> Result<u64, DatabaseError> {
        let started = Instant::now();
        let delete = QueryBuilder::<E>::delete_sql(id);
        let affected = self.executor.execute(&delete.query, &delete.params).await?;
        log_elapsed(E::TABLE, "delete_by_id", started);
        Ok(affected)
    }
}

impl SqlRepository<User> {
    /// Exact username match
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let started = Instant::now();
        let sql = format!("{} WHERE u.username = :username LIMIT 1", User::select_sql());
        let params = SqlParams::new().with("username", username);
        let found = self.fetch(&sql, &params).await?.into_iter().next();
        log_elapsed(User::TABLE, "find_by_username", started);
        Ok(found)
    }
}
