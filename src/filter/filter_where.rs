use super::error::FilterError;
use super::types::{FilterMap, SqlParams};

/// WHERE body without the `WHERE` keyword, plus the parameters it references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: SqlParams,
}

impl WhereClause {
    /// Empty clause: the caller omits the `WHERE` keyword entirely.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

pub struct FilterWhere;

impl FilterWhere {
    /// Keep only filter keys present in `allowed`; unknown keys are dropped silently.
    pub fn retain_allowed(filters: &FilterMap, allowed: &[&str]) -> FilterMap {
        let mut out = filters.clone();
        out.retain(|key, _| allowed.contains(&key));
        out
    }

    /// Build `alias.col = :col` / `alias.col LIKE :col` conditions joined with AND.
    ///
    /// Values are never interpolated; they travel as named parameters. Keys that
    /// are not plain identifiers are dropped, so only whitelisted column names
    /// produced by the entity layer ever reach the SQL text.
    pub fn generate(filters: &FilterMap, alias: Option<&str>) -> Result<WhereClause, FilterError> {
        let prefix = column_prefix(alias)?;

        let mut conditions = Vec::with_capacity(filters.len());
        let mut params = SqlParams::new();
        for (column, value) in filters.iter() {
            if !is_identifier(column) {
                tracing::warn!("Dropping filter with invalid column name: {:?}", column);
                continue;
            }
            let operator = if value.is_pattern() { "LIKE" } else { "=" };
            conditions.push(format!("{}{} {} :{}", prefix, column, operator, column));
            params.insert(column, value.clone());
        }

        Ok(WhereClause { sql: conditions.join(" AND "), params })
    }
}

pub(crate) fn column_prefix(alias: Option<&str>) -> Result<String, FilterError> {
    match alias {
        None => Ok(String::new()),
        Some(a) if is_identifier(a) => Ok(format!("{}.", a)),
        Some(a) => Err(FilterError::InvalidAlias(a.to_string())),
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
