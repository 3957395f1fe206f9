//! The `User` entity.

use async_graphql::{Object, ID};
use may_postgres::Row;
use std::fmt;

use crate::executor::DbError;

/// Store-assigned identifier. Positive, unique, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(i64);

impl UserId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for ID {
    fn from(id: UserId) -> Self {
        ID(id.0.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Build a `User` from a row shaped `(id, name, email)`.
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| DbError::ParseError(format!("users.id: {e}")))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| DbError::ParseError(format!("users.name: {e}")))?;
        let email: String = row
            .try_get("email")
            .map_err(|e| DbError::ParseError(format!("users.email: {e}")))?;
        Ok(Self::new(UserId::new(id), name, email))
    }
}

#[Object]
impl User {
    async fn id(&self) -> ID {
        self.id.into()
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn email(&self) -> &str {
        &self.email
    }
}
