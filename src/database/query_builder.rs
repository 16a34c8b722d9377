use std::marker::PhantomData;

use super::entity::Entity;
use super::manager::DatabaseError;
use crate::filter::filter_where::is_identifier;
use crate::filter::{
    FilterError, FilterMap, FilterOrder, FilterWhere, PageRequest, SqlParams, SqlResult, WhereClause,
};

/// Composes the SQL for one entity's CRUD statements
pub struct QueryBuilder<E> {
    filters: FilterMap,
    page: Option<PageRequest>,
    _phantom: PhantomData<E>,
}

impl<E: Entity> QueryBuilder<E> {
    pub fn new() -> Result<Self, DatabaseError> {
        if !is_identifier(E::TABLE) {
            return Err(FilterError::InvalidTableName(E::TABLE.to_string()).into());
        }
        Ok(Self {
            filters: FilterMap::new(),
            page: None,
            _phantom: PhantomData,
        })
    }

    /// Client filters; anything outside the entity's filter whitelist is dropped
    pub fn filter(mut self, filters: &FilterMap) -> Self {
        self.filters = E::normalize_filters(filters);
        self
    }

    pub fn page(mut self, request: &PageRequest) -> Self {
        self.page = Some(request.clone());
        self
    }

    fn where_clause(&self) -> Result<WhereClause, DatabaseError> {
        Ok(FilterWhere::generate(&self.filters, E::ALIAS)?)
    }

    fn from_clause() -> String {
        match E::ALIAS {
            Some(alias) => format!("{} {}", E::TABLE, alias),
            None => E::TABLE.to_string(),
        }
    }

    fn id_ref() -> String {
        match E::ALIAS {
            Some(alias) => format!("{}.{}", alias, E::ID_COLUMN),
            None => E::ID_COLUMN.to_string(),
        }
    }

    /// `SELECT count(*)` with exactly the WHERE semantics of [`to_select_sql`](Self::to_select_sql)
    pub fn to_count_sql(&self) -> Result<SqlResult, DatabaseError> {
        let clause = self.where_clause()?;
        let mut query = format!("SELECT count(*) AS count FROM {}", Self::from_clause());
        if !clause.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clause.sql);
        }
        Ok(SqlResult { query, params: clause.params })
    }

    /// Base select with WHERE, whitelisted ORDER BY and LIMIT/OFFSET when paged
    pub fn to_select_sql(&self) -> Result<SqlResult, DatabaseError> {
        let clause = self.where_clause()?;
        let mut query = E::select_sql();
        let mut params = clause.params.clone();
        if !clause.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clause.sql);
        }

        if let Some(page) = &self.page {
            let order = FilterOrder::generate(&page.sort, E::SORT_COLUMNS, E::ALIAS)?;
            if !order.is_empty() {
                query.push_str(" ORDER BY ");
                query.push_str(&order);
            }
            query.push_str(" LIMIT :limit OFFSET :offset");
            params.insert("limit", page.limit());
            params.insert("offset", page.offset());
        }

        Ok(SqlResult { query, params })
    }

    pub fn select_by_id(id: i64) -> SqlResult {
        SqlResult {
            query: format!("{} WHERE {} = :id", E::select_sql(), Self::id_ref()),
            params: SqlParams::new().with("id", id),
        }
    }

    pub fn insert_sql(entity: &E) -> Result<SqlResult, DatabaseError> {
        let params = entity.to_params();
        let columns = column_list(&params)?;
        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{}", c)).collect();
        Ok(SqlResult {
            query: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                E::TABLE,
                columns.join(", "),
                placeholders.join(", "),
                E::ID_COLUMN
            ),
            params,
        })
    }

    pub fn update_sql(entity: &E) -> Result<SqlResult, DatabaseError> {
        let id = entity
            .id()
            .ok_or_else(|| DatabaseError::QueryError(format!("cannot update {} without an id", E::TABLE)))?;

        let mut params = entity.to_params();
        params.retain(|column, _| !E::INSERT_ONLY_COLUMNS.contains(&column));
        let assignments: Vec<String> = column_list(&params)?
            .iter()
            .map(|c| format!("{} = :{}", c, c))
            .collect();
        params.insert("id", id);

        Ok(SqlResult {
            query: format!(
                "UPDATE {} SET {} WHERE {} = :id",
                E::TABLE,
                assignments.join(", "),
                E::ID_COLUMN
            ),
            params,
        })
    }

    pub fn delete_sql(id: i64) -> SqlResult {
        SqlResult {
            query: format!("DELETE FROM {} WHERE {} = :id", E::TABLE, E::ID_COLUMN),
            params: SqlParams::new().with("id", id),
        }
    }
}

fn column_list(params: &SqlParams) -> Result<Vec<&str>, DatabaseError> {
    let columns: Vec<&str> = params.keys().collect();
    if let Some(bad) = columns.iter().find(|c| !is_identifier(c)) {
        return Err(FilterError::InvalidColumn(bad.to_string()).into());
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Role, User};
    use crate::filter::{SortOrder, SqlValue};

    #[test]
    fn filter_and_sort_scenario() {
        let filters = FilterMap::new().with("name", "%test%");
        let page = PageRequest::of(0, 20).with_sort(vec![SortOrder::desc("age")]);
        let sql = QueryBuilder::<Role>::new().unwrap().filter(&filters).page(&page).to_select_sql().unwrap();

        assert_eq!(
            sql.query,
            "SELECT * FROM roles WHERE name LIKE :name LIMIT :limit OFFSET :offset"
        );
        assert!(!sql.query.contains("ORDER BY"));
    }

    #[test]
    fn count_and_select_share_where() {
        let filters = FilterMap::new()
            .with("name", "%adm%")
            .with("page", "3")
            .with("description", "exact");
        let page = PageRequest::of(2, 5).with_sort(vec![SortOrder::asc("name"), SortOrder::desc("id")]);
        let builder = QueryBuilder::<Role>::new().unwrap().filter(&filters).page(&page);

        let count = builder.to_count_sql().unwrap();
        let select = builder.to_select_sql().unwrap();
        let where_sql = "WHERE name LIKE :name AND description = :description";

        assert_eq!(count.query, format!("SELECT count(*) AS count FROM roles {}", where_sql));
        assert_eq!(
            select.query,
            format!("SELECT * FROM roles {} ORDER BY name ASC, id DESC LIMIT :limit OFFSET :offset", where_sql)
        );
        assert!(!count.params.contains_key("page"));
        assert_eq!(select.params.get("offset"), Some(&SqlValue::Int(10)));
        assert_eq!(select.params.get("limit"), Some(&SqlValue::Int(5)));
    }

    #[test]
    fn user_queries_are_aliased_and_joined() {
        let filters = FilterMap::new().with("username", "%bo%").with("password", "x");
        let page = PageRequest::of(0, 10).with_sort(vec![SortOrder::desc("created_at"), SortOrder::asc("password")]);
        let builder = QueryBuilder::<User>::new().unwrap().filter(&filters).page(&page);

        let count = builder.to_count_sql().unwrap();
        assert_eq!(count.query, "SELECT count(*) AS count FROM users u WHERE u.username LIKE :username");

        let select = builder.to_select_sql().unwrap();
        assert!(select.query.contains("LEFT JOIN roles r ON u.role_id = r.id"));
        assert!(select.query.ends_with(
            "WHERE u.username LIKE :username ORDER BY u.created_at DESC LIMIT :limit OFFSET :offset"
        ));
        assert!(!select.query.contains("u.password ="));
        assert!(!select.params.contains_key("password"));
    }

    #[test]
    fn role_alias_filter_becomes_role_id() {
        let filters = FilterMap::new().with("role", "4");
        let sql = QueryBuilder::<User>::new().unwrap().filter(&filters).to_count_sql().unwrap();
        assert!(sql.query.ends_with("WHERE u.role_id = :role_id"));
        assert_eq!(sql.params.get("role_id"), Some(&SqlValue::Int(4)));
    }

    #[test]
    fn insert_update_delete_statements() {
        let role = Role { id: Some(3), name: "ADMIN".into(), description: None };

        let insert = QueryBuilder::<Role>::insert_sql(&role).unwrap();
        assert_eq!(
            insert.query,
            "INSERT INTO roles (name, description) VALUES (:name, :description) RETURNING id"
        );

        let update = QueryBuilder::<Role>::update_sql(&role).unwrap();
        assert_eq!(update.query, "UPDATE roles SET name = :name, description = :description WHERE id = :id");
        assert_eq!(update.params.get("id"), Some(&SqlValue::Int(3)));

        let delete = QueryBuilder::<Role>::delete_sql(3);
        assert_eq!(delete.query, "DELETE FROM roles WHERE id = :id");
    }

    #[test]
    fn update_skips_insert_only_columns() {
        let user = User {
            id: Some(1),
            username: "bob".into(),
            password: "hash".into(),
            ..Default::default()
        };
        let update = QueryBuilder::<User>::update_sql(&user).unwrap();
        assert!(!update.query.contains("created_at"));
        assert!(!update.query.contains("created_by"));
        assert!(update.query.contains("updated_at = :updated_at"));
        assert!(update.query.ends_with("WHERE id = :id"));
    }

    #[test]
    fn update_without_id_is_rejected() {
        let role = Role { id: None, name: "X".into(), description: None };
        assert!(QueryBuilder::<Role>::update_sql(&role).is_err());
    }

    #[test]
    fn select_by_id_uses_alias() {
        let sql = QueryBuilder::<User>::select_by_id(9);
        assert!(sql.query.ends_with("WHERE u.id = :id"));
        let sql = QueryBuilder::<Role>::select_by_id(9);
        assert_eq!(sql.query, "SELECT * FROM roles WHERE id = :id");
    }
}
