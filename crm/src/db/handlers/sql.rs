//! Query-building helpers shared by the repositories.
//!
//! List and count queries are assembled with [`QueryBuilder`] so the same filter code feeds both;
//! partial updates go through [`UpdateBuilder`], which only touches the columns a request sets.

use sqlx::{Encode, PgConnection, Postgres, QueryBuilder, Type};
use uuid::Uuid;

use crate::db::errors::{DbError, Result};

/// Escape `LIKE` wildcards so `term` only matches itself.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append a case-insensitive substring match over `columns`, OR-ed together.
///
/// `%` and `_` in `search` are literal. Nullable columns are fine: `LOWER(NULL) LIKE ...` is
/// never true.
pub(crate) fn push_search(query: &mut QueryBuilder<'_, Postgres>, columns: &[&str], search: &str) {
    let search = search.trim();
    if search.is_empty() || columns.is_empty() {
        return;
    }

    let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
    query.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query.push(format_args!("LOWER({column}) LIKE "));
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\'");
    }
    query.push(")");
}

/// Append `AND column = value` when a filter value is present.
pub(crate) fn push_eq<'args, T>(query: &mut QueryBuilder<'args, Postgres>, column: &str, value: Option<T>)
where
    T: 'args + Encode<'args, Postgres> + Type<Postgres>,
{
    if let Some(value) = value {
        query.push(format_args!(" AND {column} = "));
        query.push_bind(value);
    }
}

/// Append `LIMIT`/`OFFSET`.
pub(crate) fn push_page(query: &mut QueryBuilder<'_, Postgres>, skip: i64, limit: i64) {
    query.push(" LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(skip);
}

/// Builds `UPDATE <table> SET updated_at = NOW(), ... WHERE id = $n`.
///
/// Every call to [`set`](Self::set) with `None` is skipped, so an update request whose fields are
/// all absent only bumps `updated_at`. Nullable columns take an `Option<Option<T>>`, where
/// `Some(None)` writes NULL.
pub(crate) struct UpdateBuilder<'args> {
    query: QueryBuilder<'args, Postgres>,
}

impl<'args> UpdateBuilder<'args> {
    pub fn new(table: &str) -> Self {
        Self {
            query: QueryBuilder::new(format!("UPDATE {table} SET updated_at = NOW()")),
        }
    }

    pub fn set<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres>,
    {
        if let Some(value) = value {
            self.query.push(format_args!(", {column} = "));
            self.query.push_bind(value);
        }
        self
    }

    /// Set a column to a SQL expression that takes no parameters, e.g. `COALESCE(closed_at, NOW())`.
    pub fn set_expr(&mut self, column: &str, expr: &str) -> &mut Self {
        self.query.push(format_args!(", {column} = {expr}"));
        self
    }

    /// Run the update against row `id`. Fails with [`DbError::NotFound`] when no row matched.
    pub async fn execute(mut self, conn: &mut PgConnection, id: Uuid) -> Result<()> {
        self.query.push(" WHERE id = ");
        self.query.push_bind(id);

        let result = self.query.build().execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[cfg(test)]
    fn sql(&self) -> &str {
        self.query.sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_clause_binds_one_pattern_per_column() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM contacts WHERE TRUE");
        push_search(&mut query, &["first_name", "email"], "  Ada ");
        assert_eq!(
            query.sql(),
            "SELECT 1 FROM contacts WHERE TRUE AND (LOWER(first_name) LIKE $1 ESCAPE '\\' OR LOWER(email) LIKE $2 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like(r"c:\temp"), r"c:\\temp");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1");
        push_search(&mut query, &["name"], "   ");
        assert_eq!(query.sql(), "SELECT 1");
    }

    #[test]
    fn test_eq_filters_and_page() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM deals d WHERE TRUE");
        push_eq(&mut query, "d.owner_id", Some(Uuid::nil()));
        push_eq::<Uuid>(&mut query, "d.company_id", None);
        push_page(&mut query, 20, 10);
        assert_eq!(
            query.sql(),
            "SELECT 1 FROM deals d WHERE TRUE AND d.owner_id = $1 LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_update_builder_skips_absent_fields() {
        let mut update = UpdateBuilder::new("contacts");
        update
            .set("first_name", Some("Ada".to_string()))
            .set::<String>("last_name", None)
            .set("company_id", Some(None::<Uuid>))
            .set_expr("closed_at", "NULL");
        assert_eq!(
            update.sql(),
            "UPDATE contacts SET updated_at = NOW(), first_name = $1, company_id = $2, closed_at = NULL"
        );
    }
}
