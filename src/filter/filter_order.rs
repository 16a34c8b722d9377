use super::error::FilterError;
use super::filter_where::column_prefix;
use super::types::{SortDirection, SortOrder};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse one `sort` query value: `"name"`, `"name,desc"` or `"name,created_at,asc"`.
    ///
    /// A trailing `asc`/`desc` token applies to every column listed before it.
    pub fn parse_sort_param(value: &str) -> Vec<SortOrder> {
        let tokens: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        let (columns, direction) = match tokens.split_last() {
            Some((last, rest)) => match SortDirection::parse(last) {
                Some(dir) => (rest, dir),
                None => (tokens.as_slice(), SortDirection::Asc),
            },
            None => return vec![],
        };

        columns
            .iter()
            .map(|c| SortOrder { column: c.to_string(), direction })
            .collect()
    }

    /// Build the ORDER BY body (without the keyword) from whitelisted columns only.
    ///
    /// Columns outside `whitelist` are dropped; survivors keep their relative order.
    /// Returns an empty string when nothing survives.
    pub fn generate(sort: &[SortOrder], whitelist: &[&str], alias: Option<&str>) -> Result<String, FilterError> {
        let prefix = column_prefix(alias)?;
        let parts: Vec<String> = sort
            .iter()
            .filter(|o| whitelist.contains(&o.column.as_str()))
            .map(|o| format!("{}{} {}", prefix, o.column, o.direction.to_sql()))
            .collect();
        Ok(parts.join(", "))
    }
}
