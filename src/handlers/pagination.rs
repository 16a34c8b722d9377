use std::collections::HashMap;

use crate::config::PaginationConfig;
use crate::error::ApiError;
use crate::filter::{FilterOrder, PageRequest};

/// List query split into the page request and the remaining (filter) parameters
#[derive(Debug)]
pub struct ListQuery {
    pub page: PageRequest,
    pub params: HashMap<String, String>,
}

impl ListQuery {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    pub fn int_param(&self, name: &str) -> Result<Option<i64>, ApiError> {
        self.param(name)
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::bad_request(format!("'{}' must be an integer", name)))
            })
            .transpose()
    }
}

/// Parse `page`, `size` and repeated `sort=col[,asc|desc]`; other keys are kept as filters.
///
/// `size` is capped at the configured maximum; zero falls back to the default.
pub fn parse_list_query(pairs: Vec<(String, String)>, config: &PaginationConfig) -> Result<ListQuery, ApiError> {
    let mut page = 0u32;
    let mut size = config.default_size;
    let mut sort = Vec::new();
    let mut params = HashMap::new();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => {
                page = value
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request("'page' must be a non-negative integer"))?;
            }
            "size" => {
                let requested: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request("'size' must be a non-negative integer"))?;
                size = match requested {
                    0 => config.default_size,
                    n => n.min(config.max_size),
                };
            }
            "sort" => sort.extend(FilterOrder::parse_sort_param(&value)),
            _ => {
                params.entry(key).or_insert(value);
            }
        }
    }

    Ok(ListQuery {
        page: PageRequest::of(page, size).with_sort(sort),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortOrder;

    fn cfg() -> PaginationConfig {
        PaginationConfig { default_size: 20, max_size: 100 }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults() {
        let q = parse_list_query(vec![], &cfg()).unwrap();
        assert_eq!(q.page, PageRequest::of(0, 20));
    }

    #[test]
    fn parses_page_size_sort_and_filters() {
        let q = parse_list_query(
            pairs(&[
                ("page", "2"),
                ("size", "500"),
                ("sort", "username,desc"),
                ("sort", "id"),
                ("username", "bob"),
            ]),
            &cfg(),
        )
        .unwrap();
        assert_eq!(q.page.page, 2);
        assert_eq!(q.page.size, 100);
        assert_eq!(q.page.sort, vec![SortOrder::desc("username"), SortOrder::asc("id")]);
        assert_eq!(q.param("username"), Some("bob"));
        assert!(q.param("sort").is_none());
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(parse_list_query(pairs(&[("page", "-1")]), &cfg()).is_err());
        assert!(parse_list_query(pairs(&[("size", "ten")]), &cfg()).is_err());

        let q = parse_list_query(pairs(&[("role", "x")]), &cfg()).unwrap();
        assert!(q.int_param("role").is_err());
    }
}
