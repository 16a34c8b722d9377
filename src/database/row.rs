use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::manager::DatabaseError;

/// One result row as aggregated by `json_agg`: column name -> JSON value
pub type Row = Map<String, Value>;

/// Typed column accessors over a JSON row
pub trait RowExt {
    fn get_opt_i64(&self, column: &str) -> Result<Option<i64>, DatabaseError>;
    fn get_opt_string(&self, column: &str) -> Result<Option<String>, DatabaseError>;
    fn get_opt_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    fn get_i64(&self, column: &str) -> Result<i64, DatabaseError> {
        self.get_opt_i64(column)?.ok_or_else(|| missing(column))
    }

    fn get_string(&self, column: &str) -> Result<String, DatabaseError> {
        self.get_opt_string(column)?.ok_or_else(|| missing(column))
    }
}

impl RowExt for Row {
    fn get_opt_i64(&self, column: &str) -> Result<Option<i64>, DatabaseError> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| wrong_type(column, "integer")),
            Some(_) => Err(wrong_type(column, "integer")),
        }
    }

    fn get_opt_string(&self, column: &str) -> Result<Option<String>, DatabaseError> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(column, "string")),
        }
    }

    fn get_opt_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        match self.get_opt_string(column)? {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| DatabaseError::Decode(format!("column '{}': {}", column, e))),
        }
    }
}

fn missing(column: &str) -> DatabaseError {
    DatabaseError::Decode(format!("column '{}' is missing or null", column))
}

fn wrong_type(column: &str, expected: &str) -> DatabaseError {
    DatabaseError::Decode(format!("column '{}' is not a {}", column, expected))
}
