use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::audit::{AuditFields, Auditable};
use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::row::{Row, RowExt};
use crate::filter::{FilterMap, FilterWhere, SqlParams, SqlValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    /// bcrypt hash
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl User {
    pub fn role_id(&self) -> Option<i64> {
        self.role.as_ref().and_then(|r| r.id)
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const ALIAS: Option<&'static str> = Some("u");
    const SORT_COLUMNS: &'static [&'static str] = &["id", "username", "created_at", "updated_at"];
    const FILTER_COLUMNS: &'static [&'static str] = &["username", "role_id"];
    const INSERT_ONLY_COLUMNS: &'static [&'static str] = &["created_at", "created_by"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn select_sql() -> String {
        "SELECT u.id AS user_id, u.username AS user_username, u.password AS user_password, \
         u.role_id AS user_role_id, u.created_at AS user_created_at, u.created_by AS user_created_by, \
         u.updated_at AS user_updated_at, u.updated_by AS user_updated_by, \
         r.id AS role_id, r.name AS role_name, r.description AS role_description \
         FROM users u LEFT JOIN roles r ON u.role_id = r.id"
            .to_string()
    }

    fn decode(row: &Row) -> Result<Self, DatabaseError> {
        Ok(User {
            id: Some(row.get_i64("user_id")?),
            username: row.get_string("user_username")?,
            password: row.get_string("user_password")?,
            role: Role::decode_prefixed(row, "role_")?,
            audit: AuditFields {
                created_at: row.get_opt_timestamp("user_created_at")?,
                created_by: row.get_opt_string("user_created_by")?,
                updated_at: row.get_opt_timestamp("user_updated_at")?,
                updated_by: row.get_opt_string("user_updated_by")?,
            },
        })
    }

    fn to_params(&self) -> SqlParams {
        SqlParams::new()
            .with("username", self.username.as_str())
            .with("password", self.password.as_str())
            .with("role_id", SqlValue::from(self.role_id()))
            .with("created_at", SqlValue::from(self.audit.created_at))
            .with("created_by", SqlValue::from(self.audit.created_by.clone()))
            .with("updated_at", SqlValue::from(self.audit.updated_at))
            .with("updated_by", SqlValue::from(self.audit.updated_by.clone()))
    }

    /// `role` is accepted as an alias of `role_id`; role ids must be integers.
    fn normalize_filters(filters: &FilterMap) -> FilterMap {
        let mut filters = filters.clone();
        if let Some(role) = filters.remove("role") {
            if !filters.contains_key("role_id") {
                filters.insert("role_id", role);
            }
        }

        let mut out = FilterWhere::retain_allowed(&filters, Self::FILTER_COLUMNS);
        if let Some(value) = out.get("role_id").cloned() {
            match value.as_i64() {
                Some(id) => out.insert("role_id", id),
                None => {
                    tracing::warn!("Dropping non-numeric role filter: {:?}", value);
                    out.remove("role_id");
                }
            }
        }
        out
    }
}

impl Auditable for User {
    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}
