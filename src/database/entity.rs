use super::manager::DatabaseError;
use super::row::Row;
use crate::filter::{FilterMap, FilterWhere, SqlParams};

/// Table mapping for a persisted record.
///
/// A generic [`SqlRepository`](super::repository::SqlRepository) is parameterized
/// over this trait: the entity supplies its table, its column whitelists, how to
/// decode a row and which values to write.
pub trait Entity: Sized + Send + Sync + 'static {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";
    /// Table alias used in generated column references, e.g. `u` -> `u.username`
    const ALIAS: Option<&'static str> = None;
    /// Columns permitted in ORDER BY
    const SORT_COLUMNS: &'static [&'static str];
    /// Columns permitted in WHERE
    const FILTER_COLUMNS: &'static [&'static str];
    /// Written by INSERT but never by UPDATE
    const INSERT_ONLY_COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> Option<i64>;

    /// Base SELECT (including any joins) that `decode` understands
    fn select_sql() -> String {
        match Self::ALIAS {
            Some(alias) => format!("SELECT {alias}.* FROM {} {alias}", Self::TABLE),
            None => format!("SELECT * FROM {}", Self::TABLE),
        }
    }

    fn decode(row: &Row) -> Result<Self, DatabaseError>;

    /// Persisted column -> value mapping, excluding the id column
    fn to_params(&self) -> SqlParams;

    /// Reduce client filters to whitelisted columns with correctly typed values
    fn normalize_filters(filters: &FilterMap) -> FilterMap {
        FilterWhere::retain_allowed(filters, Self::FILTER_COLUMNS)
    }
}
