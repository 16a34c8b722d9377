use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::database::{DatabaseError, Row, SqlExecutor};
use crate::filter::SqlParams;

/// One statement seen by the [`ScriptedExecutor`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub sql: String,
    pub params: SqlParams,
}

enum Scripted {
    Scalar(i64),
    Rows(Vec<Row>),
    Affected(u64),
    Error(DatabaseError),
}

/// In-process SQL gateway: records every statement and answers from a FIFO script
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_scalar(&self, v: i64) {
        self.push(Scripted::Scalar(v));
    }

    pub fn push_rows(&self, rows: Vec<Value>) {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.push(Scripted::Rows(rows));
    }

    pub fn push_affected(&self, n: u64) {
        self.push(Scripted::Affected(n));
    }

    pub fn push_error(&self, err: DatabaseError) {
        self.push(Scripted::Error(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, s: Scripted) {
        self.script.lock().unwrap().push_back(s);
    }

    fn next(&self, sql: &str, params: &SqlParams) -> Option<Scripted> {
        self.calls.lock().unwrap().push(RecordedCall {
            sql: sql.to_string(),
            params: params.clone(),
        });
        self.script.lock().unwrap().pop_front()
    }
}

fn unexpected(sql: &str) -> DatabaseError {
    DatabaseError::QueryError(format!("no scripted response for: {}", sql))
}

#[async_trait]
impl SqlExecutor for ScriptedExecutor {
    async fn query_scalar(&self, sql: &str, params: &SqlParams) -> Result<i64, DatabaseError> {
        match self.next(sql, params) {
            Some(Scripted::Scalar(v)) => Ok(v),
            Some(Scripted::Error(e)) => Err(e),
            _ => Err(unexpected(sql)),
        }
    }

    async fn query_rows(&self, sql: &str, params: &SqlParams) -> Result<Vec<Row>, DatabaseError> {
        match self.next(sql, params) {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Error(e)) => Err(e),
            _ => Err(unexpected(sql)),
        }
    }

    async fn execute(&self, sql: &str, params: &SqlParams) -> Result<u64, DatabaseError> {
        match self.next(sql, params) {
            Some(Scripted::Affected(n)) => Ok(n),
            Some(Scripted::Error(e)) => Err(e),
            _ => Err(unexpected(sql)),
        }
    }
}
