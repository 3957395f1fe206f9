//! Schema bootstrap for the `users` table.
//!
//! The DDL is generated from [`USER_INPUT_SCHEMA`], so column lengths always
//! match the validation rules. Running it is idempotent.

use sea_query::{ColumnDef, PostgresQueryBuilder, Table, TableCreateStatement};

use crate::definition::{EntitySchema, FieldType, USER_INPUT_SCHEMA};
use crate::executor::{DbError, SqlExecutor};

/// `CREATE TABLE IF NOT EXISTS` for an entity schema, with a `BIGSERIAL` id.
pub fn create_table_statement(schema: &EntitySchema) -> TableCreateStatement {
    let mut table = Table::create();
    table.table(schema.table).if_not_exists().col(
        ColumnDef::new("id")
            .big_integer()
            .not_null()
            .auto_increment()
            .primary_key(),
    );

    for field in schema.fields {
        let mut column = ColumnDef::new(field.name);
        match (field.ty, field.max_length()) {
            (FieldType::String, Some(len)) => column.string_len(len as u32),
            (FieldType::String, None) => column.text(),
        };
        column.not_null();
        table.col(column);
    }

    table.to_owned()
}

/// Create the `users` table if it does not exist.
pub fn ensure_schema(executor: &dyn SqlExecutor) -> Result<(), DbError> {
    let sql = create_table_statement(&USER_INPUT_SCHEMA).build(PostgresQueryBuilder);
    executor.execute(&sql, &[])?;
    log::info!("schema ready: table {}", USER_INPUT_SCHEMA.table);
    Ok(())
}
