pub mod interceptor;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub use interceptor::{AuditInterceptor, Audited};

/// Actor recorded when no authenticated principal is present
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Placeholder principal name for unauthenticated callers
pub const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Entity carrying creation/modification actor and timestamp
pub trait Auditable {
    fn audit(&self) -> &AuditFields;
    fn audit_mut(&mut self) -> &mut AuditFields;
}

/// Resolves who is acting on behalf of the current request. Never fails.
pub trait ActorResolver: Send + Sync {
    fn current_actor(&self) -> String;
}

/// Actor taken from an optional authenticated principal name
#[derive(Debug, Clone, Default)]
pub struct CurrentActor(pub Option<String>);

impl CurrentActor {
    pub fn system() -> Self {
        Self(None)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }
}

impl ActorResolver for CurrentActor {
    fn current_actor(&self) -> String {
        match self.0.as_deref() {
            None | Some("") | Some(ANONYMOUS_PRINCIPAL) => SYSTEM_ACTOR.to_string(),
            Some(name) => name.to_string(),
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to microseconds, the precision of TIMESTAMPTZ
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}
