use serde::{Deserialize, Serialize};

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::row::{Row, RowExt};
use crate::filter::{SqlParams, SqlValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
}

impl Role {
    /// Decode from columns named `<prefix>id`, `<prefix>name`, `<prefix>description`.
    ///
    /// Returns `None` when the id column is null (an unmatched LEFT JOIN).
    pub fn decode_prefixed(row: &Row, prefix: &str) -> Result<Option<Role>, DatabaseError> {
        let id = match row.get_opt_i64(&format!("{}id", prefix))? {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(Some(Role {
            id: Some(id),
            name: row.get_string(&format!("{}name", prefix))?,
            description: row.get_opt_string(&format!("{}description", prefix))?,
        }))
    }
}

impl Entity for Role {
    const TABLE: &'static str = "roles";
    const SORT_COLUMNS: &'static [&'static str] = &["id", "name", "description"];
    const FILTER_COLUMNS: &'static [&'static str] = &["name", "description"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn decode(row: &Row) -> Result<Self, DatabaseError> {
        Role::decode_prefixed(row, "")?
            .ok_or_else(|| DatabaseError::Decode("role row without id".to_string()))
    }

    fn to_params(&self) -> SqlParams {
        SqlParams::new()
            .with("name", self.name.as_str())
            .with("description", SqlValue::from(self.description.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_plain_and_prefixed_rows() {
        let plain = json!({"id": 1, "name": "ADMIN", "description": null});
        let role = Role::decode(plain.as_object().unwrap()).unwrap();
        assert_eq!(role, Role { id: Some(1), name: "ADMIN".into(), description: None });

        let joined = json!({"role_id": 2, "role_name": "USER", "role_description": "default"});
        let role = Role::decode_prefixed(joined.as_object().unwrap(), "role_").unwrap().unwrap();
        assert_eq!(role.description.as_deref(), Some("default"));
    }

    #[test]
    fn unmatched_join_is_none() {
        let joined = json!({"role_id": null, "role_name": null, "role_description": null});
        assert!(Role::decode_prefixed(joined.as_object().unwrap(), "role_").unwrap().is_none());
    }
}
