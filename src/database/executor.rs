use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Postgres, Row as _};
use std::time::{Duration, Instant};

use super::manager::DatabaseError;
use super::row::Row;
use crate::config::DatabaseConfig;
use crate::filter::{SqlParams, SqlValue};

/// SQL gateway: parameterized SQL text with `:name` placeholders plus a named-parameter map
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// First column of the first row as an integer (counts, generated ids)
    async fn query_scalar(&self, sql: &str, params: &SqlParams) -> Result<i64, DatabaseError>;

    async fn query_rows(&self, sql: &str, params: &SqlParams) -> Result<Vec<Row>, DatabaseError>;

    /// Rows affected
    async fn execute(&self, sql: &str, params: &SqlParams) -> Result<u64, DatabaseError>;
}

pub struct PgExecutor {
    pool: PgPool,
    log_queries: bool,
    slow_query_threshold: Duration,
}

impl PgExecutor {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            log_queries: config.enable_query_logging,
            slow_query_threshold: Duration::from_millis(config.slow_query_threshold_ms),
        }
    }

    fn prepare(&self, sql: &str, params: &SqlParams) -> Result<(String, Vec<SqlValue>), DatabaseError> {
        let (text, binds) = to_positional(sql, params)?;
        if self.log_queries {
            let names: Vec<&str> = params.keys().collect();
            tracing::debug!("SQL: {} params: {:?}", text, names);
        }
        Ok((text, binds))
    }

    fn observe(&self, sql: &str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > self.slow_query_threshold {
            tracing::warn!("Slow query ({} ms): {}", elapsed.as_millis(), sql);
        }
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn query_scalar(&self, sql: &str, params: &SqlParams) -> Result<i64, DatabaseError> {
        let (text, binds) = self.prepare(sql, params)?;
        let started = Instant::now();
        let row = bind_all(sqlx::query(&text), binds).fetch_one(&self.pool).await?;
        self.observe(&text, started);
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn query_rows(&self, sql: &str, params: &SqlParams) -> Result<Vec<Row>, DatabaseError> {
        let (text, binds) = self.prepare(sql, params)?;
        let wrapped = rows_as_json_array(&text);
        let started = Instant::now();
        let row = bind_all(sqlx::query(&wrapped), binds).fetch_one(&self.pool).await?;
        self.observe(&wrapped, started);

        decode_row_array(row.try_get::<Value, _>("rows")?)
    }

    async fn execute(&self, sql: &str, params: &SqlParams) -> Result<u64, DatabaseError> {
        let (text, binds) = self.prepare(sql, params)?;
        let started = Instant::now();
        let result = bind_all(sqlx::query(&text), binds).execute(&self.pool).await?;
        self.observe(&text, started);
        Ok(result.rows_affected())
    }
}

fn bind_all(
    mut q: sqlx::query::Query<'_, Postgres, PgArguments>,
    binds: Vec<SqlValue>,
) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    for v in binds {
        q = match v {
            // Rendered as a literal NULL by `to_positional`; never bound.
            SqlValue::Null => q,
            SqlValue::Bool(b) => q.bind(b),
            SqlValue::Int(i) => q.bind(i),
            SqlValue::Float(f) => q.bind(f),
            SqlValue::Text(s) => q.bind(s),
            SqlValue::Timestamp(ts) => q.bind(ts),
        };
    }
    q
}

/// Aggregate the statement's rows into one JSON array.
///
/// The subquery's ORDER BY is kept by the aggregate because the outer level adds
/// no join, filter or grouping of its own.
pub(crate) fn rows_as_json_array(sql: &str) -> String {
    format!("SELECT coalesce(json_agg(t), '[]'::json) AS rows FROM ({}) t", sql)
}

pub(crate) fn decode_row_array(value: Value) -> Result<Vec<Row>, DatabaseError> {
    let Value::Array(items) = value else {
        return Err(DatabaseError::Decode(format!("expected JSON array of rows, got {}", value)));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(DatabaseError::Decode(format!("expected JSON object row, got {}", other))),
        })
        .collect()
}

/// Rewrite `:name` placeholders to `$n` and collect bind values in position order.
///
/// A name used twice reuses its position. `::` casts and text inside single or
/// double quotes are copied through untouched. A `Null` value is written as the
/// literal `NULL` so its type is inferred from context instead of the bind.
pub(crate) fn to_positional(sql: &str, params: &SqlParams) -> Result<(String, Vec<SqlValue>), DatabaseError> {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut binds: Vec<SqlValue> = Vec::new();

    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    i += 1;
                    if chars[i - 1] == c {
                        break;
                    }
                }
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).map_or(false, |n| n.is_ascii_alphabetic() || *n == '_') => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = params
                    .get(&name)
                    .ok_or_else(|| DatabaseError::QueryError(format!("missing SQL parameter ':{}'", name)))?;

                if matches!(value, SqlValue::Null) {
                    out.push_str("NULL");
                } else {
                    let position = match names.iter().position(|n| *n == name) {
                        Some(p) => p + 1,
                        None => {
                            names.push(name);
                            binds.push(value.clone());
                            binds.len()
                        }
                    };
                    out.push('$');
                    out.push_str(&position.to_string());
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, binds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_named_to_positional() {
        let params = SqlParams::new().with("name", "%a%").with("limit", 10i64).with("offset", 0i64);
        let (sql, binds) = to_positional(
            "SELECT * FROM roles WHERE name LIKE :name LIMIT :limit OFFSET :offset",
            &params,
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM roles WHERE name LIKE $1 LIMIT $2 OFFSET $3");
        assert_eq!(binds, vec![SqlValue::from("%a%"), SqlValue::Int(10), SqlValue::Int(0)]);
    }

    #[test]
    fn repeated_name_reuses_position() {
        let params = SqlParams::new().with("id", 5i64);
        let (sql, binds) = to_positional("SELECT :id, :id", &params).unwrap();
        assert_eq!(sql, "SELECT $1, $1");
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn casts_and_quoted_text_are_untouched() {
        let params = SqlParams::new().with("x", 1i64);
        let (sql, binds) = to_positional("SELECT ':not', \"a:b\", :x::bigint, 1::text", &params).unwrap();
        assert_eq!(sql, "SELECT ':not', \"a:b\", $1::bigint, 1::text");
        assert_eq!(binds, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn null_values_become_literals() {
        let params = SqlParams::new().with("name", "r").with("description", SqlValue::Null);
        let (sql, binds) = to_positional("INSERT INTO roles (name, description) VALUES (:name, :description)", &params).unwrap();
        assert_eq!(sql, "INSERT INTO roles (name, description) VALUES ($1, NULL)");
        assert_eq!(binds, vec![SqlValue::from("r")]);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let err = to_positional("SELECT * FROM t WHERE id = :id", &SqlParams::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::QueryError(_)));
    }

    #[test]
    fn rows_are_aggregated_around_the_ordered_statement() {
        let sql = rows_as_json_array("SELECT id, name FROM roles ORDER BY name DESC LIMIT $1 OFFSET $2");
        assert_eq!(
            sql,
            "SELECT coalesce(json_agg(t), '[]'::json) AS rows FROM \
             (SELECT id, name FROM roles ORDER BY name DESC LIMIT $1 OFFSET $2) t"
        );
    }

    #[test]
    fn row_array_keeps_statement_order() {
        let rows = decode_row_array(serde_json::json!([
            {"id": 3, "name": "c"},
            {"id": 1, "name": "a"},
            {"id": 2, "name": "b"}
        ]))
        .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        assert!(decode_row_array(serde_json::json!([])).unwrap().is_empty());
        assert!(decode_row_array(serde_json::json!([1])).is_err());
        assert!(decode_row_array(serde_json::json!({"id": 1})).is_err());
    }
}
