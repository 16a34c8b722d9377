use async_trait::async_trait;
use chrono::Duration;

use super::{ActorResolver, Auditable, Clock};
use crate::database::{CrudRepository, DatabaseError, Entity};
use crate::filter::{FilterMap, Page, PageRequest};

/// Stamps audit fields before writes
pub struct AuditInterceptor<'a> {
    actor: &'a dyn ActorResolver,
    clock: &'a dyn Clock,
}

impl<'a> AuditInterceptor<'a> {
    pub fn new(actor: &'a dyn ActorResolver, clock: &'a dyn Clock) -> Self {
        Self { actor, clock }
    }

    pub fn before_create<E: Auditable>(&self, entity: &mut E) {
        let now = self.clock.now();
        let actor = self.actor.current_actor();
        let audit = entity.audit_mut();
        audit.created_at = Some(now);
        audit.created_by = Some(actor.clone());
        audit.updated_at = Some(now);
        audit.updated_by = Some(actor);
    }

    /// `updated_at` always moves forward, even when the clock has not.
    pub fn before_update<E: Auditable>(&self, entity: &mut E) {
        let mut now = self.clock.now();
        let actor = self.actor.current_actor();
        let audit = entity.audit_mut();
        if let Some(prev) = audit.updated_at {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        audit.updated_at = Some(now);
        audit.updated_by = Some(actor);
    }
}

/// Repository decorator: every save/update passes through the interceptor first
pub struct Audited<'a, R> {
    inner: &'a R,
    interceptor: AuditInterceptor<'a>,
}

impl<'a, R> Audited<'a, R> {
    pub fn new(inner: &'a R, actor: &'a dyn ActorResolver, clock: &'a dyn Clock) -> Self {
        Self {
            inner,
            interceptor: AuditInterceptor::new(actor, clock),
        }
    }
}

#[async_trait]
impl<'a, E, R> CrudRepository<E> for Audited<'a, R>
where
    E: Entity + Auditable,
    R: CrudRepository<E>,
{
    async fn save(&self, mut entity: E) -> Result<E, DatabaseError> {
        self.interceptor.before_create(&mut entity);
        self.inner.save(entity).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, DatabaseError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all_paged(&self, request: &PageRequest, filters: &FilterMap) -> Result<Page<E>, DatabaseError> {
        self.inner.find_all_paged(request, filters).await
    }

    async fn update(&self, entity: &mut E) -> Result<u64, DatabaseError> {
        self.interceptor.before_update(entity);
        self.inner.update(entity).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<u64, DatabaseError> {
        self.inner.delete_by_id(id).await
    }
}
