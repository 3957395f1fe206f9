//! GraphQL schema and resolvers.
//!
//! ```graphql
//! type User { id: ID!  name: String!  email: String! }
//! type Query { users: [User!]! }
//! type Mutation { createUser(name: String!, email: String!): User! }
//! ```
//!
//! Resolver errors carry `extensions.code` (`VALIDATION_ERROR` with
//! `extensions.field`, or `STORAGE_UNAVAILABLE`).

use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, Object, Result, Schema,
};

use crate::model::User;
use crate::service::{ServiceError, UserService};

pub type RosterSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Nesting deeper than this is rejected before execution.
pub const MAX_QUERY_DEPTH: usize = 8;
/// Upper bound on the computed complexity of a single operation.
pub const MAX_QUERY_COMPLEXITY: usize = 256;

/// Build the executable schema. The service handle is the only context data.
pub fn build_schema(service: UserService) -> RosterSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

impl ErrorExtensions for ServiceError {
    fn extend(&self) -> Error {
        Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            if let ServiceError::Validation(v) = self {
                e.set("field", v.field.as_str());
            }
        })
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Every user, in insertion order.
    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let service = ctx.data::<UserService>()?;
        service.list_users().map_err(|e| e.extend())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create a user. Not idempotent: a retry after a storage timeout may
    /// create a second record.
    async fn create_user(&self, ctx: &Context<'_>, name: String, email: String) -> Result<User> {
        let service = ctx.data::<UserService>()?;
        service.create_user(&name, &email).map_err(|e| e.extend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MemoryGateway, PersistenceGateway};
    use async_graphql::Value;
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> (RosterSchema, Arc<MemoryGateway>) {
        let memory = Arc::new(MemoryGateway::new());
        let schema = build_schema(UserService::new(memory.clone()));
        (schema, memory)
    }

    fn run(schema: &RosterSchema, query: &str) -> async_graphql::Response {
        block_on(schema.execute(query))
    }

    #[test]
    fn test_sdl_exposes_the_contract() {
        let (schema, _) = schema();
        let sdl = schema.sdl();
        assert!(sdl.contains("users: [User!]!"), "{sdl}");
        assert!(sdl.contains("createUser(name: String!, email: String!): User!"), "{sdl}");
        assert!(sdl.contains("id: ID!"), "{sdl}");
    }

    #[test]
    fn test_create_then_list() {
        let (schema, _) = schema();
        let created = run(
            &schema,
            r#"mutation { createUser(name: "Alice", email: "alice@example.com") { id name email } }"#,
        );
        assert!(created.errors.is_empty(), "{:?}", created.errors);
        assert_eq!(
            created.data.into_json().unwrap(),
            json!({ "createUser": { "id": "1", "name": "Alice", "email": "alice@example.com" } })
        );

        let listed = run(&schema, "{ users { id name email } }");
        assert_eq!(
            listed.data.into_json().unwrap(),
            json!({ "users": [{ "id": "1", "name": "Alice", "email": "alice@example.com" }] })
        );
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let (schema, _) = schema();
        let listed = run(&schema, "{ users { id } }");
        assert_eq!(listed.data.into_json().unwrap(), json!({ "users": [] }));
    }

    #[test]
    fn test_validation_error_extensions() {
        let (schema, memory) = schema();
        let response = run(
            &schema,
            r#"mutation { createUser(name: "Alice", email: "") { id } }"#,
        );
        assert_eq!(response.errors.len(), 1);
        let extensions = response.errors[0].extensions.as_ref().expect("extensions");
        assert_eq!(
            extensions.get("code"),
            Some(&Value::from("VALIDATION_ERROR"))
        );
        assert_eq!(extensions.get("field"), Some(&Value::from("email")));
        assert!(memory.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_storage_error_extensions() {
        let (schema, memory) = schema();
        memory.set_available(false);

        for query in [
            "{ users { id } }",
            r#"mutation { createUser(name: "Bob", email: "bob@example.com") { id } }"#,
        ] {
            let response = run(&schema, query);
            assert_eq!(response.errors.len(), 1, "{query}");
            let extensions = response.errors[0].extensions.as_ref().expect("extensions");
            assert_eq!(
                extensions.get("code"),
                Some(&Value::from("STORAGE_UNAVAILABLE"))
            );
        }
    }

    #[test]
    fn test_missing_argument_is_rejected_by_the_executor() {
        let (schema, memory) = schema();
        let response = run(&schema, r#"mutation { createUser(name: "Alice") { id } }"#);
        assert!(!response.errors.is_empty());
        assert!(memory.list_all().unwrap().is_empty());
    }
}
