//! `users` table over a [`SqlExecutor`].

use sea_query::{Asterisk, Expr, Order, PostgresQueryBuilder, Query};
use std::time::Duration;

use super::{GatewayError, PersistenceGateway};
use crate::connection::{connect_with_timeout, ConnectionError};
use crate::definition::USER_INPUT_SCHEMA;
use crate::executor::{with_converted_params, DbError, PgExecutor, SqlExecutor};
use crate::migrate;
use crate::model::User;

pub struct PostgresGateway<E: SqlExecutor = PgExecutor> {
    executor: E,
}

impl PostgresGateway<PgExecutor> {
    /// Connect with `statement_timeout` set to `request_timeout`.
    pub fn connect(url: &str, request_timeout: Duration) -> Result<Self, ConnectionError> {
        let client = connect_with_timeout(url, request_timeout)?;
        Ok(Self::new(PgExecutor::new(client)))
    }
}

impl<E: SqlExecutor> PostgresGateway<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Create the `users` table if it is missing.
    pub fn ensure_schema(&self) -> Result<(), GatewayError> {
        migrate::ensure_schema(&self.executor).map_err(GatewayError::from)
    }
}

/// `INSERT INTO users (name, email) VALUES ($1, $2) RETURNING *`
pub(crate) fn insert_statement(name: &str, email: &str) -> (String, sea_query::Values) {
    Query::insert()
        .into_table(USER_INPUT_SCHEMA.table)
        .columns(["name", "email"])
        .values_panic([Expr::val(name.to_string()), Expr::val(email.to_string())])
        .returning_col(Asterisk)
        .build(PostgresQueryBuilder)
}

/// `SELECT id, name, email FROM users ORDER BY id ASC`
pub(crate) fn list_statement() -> (String, sea_query::Values) {
    Query::select()
        .columns(["id", "name", "email"])
        .from(USER_INPUT_SCHEMA.table)
        .order_by("id", Order::Asc)
        .build(PostgresQueryBuilder)
}

impl<E: SqlExecutor> PersistenceGateway for PostgresGateway<E> {
    fn insert(&self, name: &str, email: &str) -> Result<User, GatewayError> {
        let (sql, values) = insert_statement(name, email);
        let user = with_converted_params(&values, |params| {
            let row = self.executor.query_one(&sql, params)?;
            User::from_row(&row)
        })?;
        Ok(user)
    }

    fn list_all(&self) -> Result<Vec<User>, GatewayError> {
        let (sql, _) = list_statement();
        let rows = self.executor.query_all(&sql, &[])?;
        let users = rows
            .iter()
            .map(User::from_row)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(users)
    }

    fn ping(&self) -> Result<(), GatewayError> {
        let row = self.executor.query_one("SELECT 1", &[])?;
        let value: i32 = row
            .try_get(0)
            .map_err(|e| GatewayError::Query(format!("health check: {e}")))?;
        if value == 1 {
            Ok(())
        } else {
            Err(GatewayError::Query(format!("health check returned {value}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_statement_binds_both_fields() {
        let (sql, values) = insert_statement("Alice", "alice@example.com");
        assert_eq!(
            sql,
            r#"INSERT INTO "users" ("name", "email") VALUES ($1, $2) RETURNING *"#
        );
        assert_eq!(values.0.len(), 2);
    }

    #[test]
    fn test_list_statement_orders_by_id() {
        let (sql, values) = list_statement();
        assert_eq!(
            sql,
            r#"SELECT "id", "name", "email" FROM "users" ORDER BY "id" ASC"#
        );
        assert!(values.0.is_empty());
    }
}
