//! HTTP transport on `may_minihttp`.
//!
//! | Route            | Behavior                                           |
//! |------------------|----------------------------------------------------|
//! | `POST /graphql`  | JSON GraphQL request (single or batch)             |
//! | `GET /graphql`   | GraphiQL page, when enabled                        |
//! | `GET /healthz`   | `200` when the gateway answers a ping, else `503`  |
//! | `GET /metrics`   | Prometheus text (with the `metrics` feature)       |

use async_graphql::http::GraphiQLSource;
use async_graphql::BatchRequest;
use futures::executor::block_on;
use may::coroutine::JoinHandle;
use may_minihttp::{HttpServer, HttpService, Request, Response};
use serde_json::json;
use std::io::{self, Read};

use crate::graphql::RosterSchema;
use crate::service::UserService;

pub const GRAPHQL_PATH: &str = "/graphql";
pub const HEALTH_PATH: &str = "/healthz";
pub const METRICS_PATH: &str = "/metrics";

const JSON: &str = "Content-Type: application/json";
const HTML: &str = "Content-Type: text/html; charset=utf-8";
const TEXT: &str = "Content-Type: text/plain; version=0.0.4; charset=utf-8";

/// A fully rendered reply, independent of the server type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: JSON,
            body: value.to_string().into_bytes(),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "errors": [{ "message": message.into() }] }))
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}

#[derive(Clone)]
pub struct GraphQlHttp {
    schema: RosterSchema,
    service: UserService,
    graphiql: bool,
    max_body_bytes: usize,
}

impl GraphQlHttp {
    pub fn new(schema: RosterSchema, service: UserService) -> Self {
        Self {
            schema,
            service,
            graphiql: true,
            max_body_bytes: 1024 * 1024,
        }
    }

    pub fn with_graphiql(mut self, enabled: bool) -> Self {
        self.graphiql = enabled;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Route one request. `path` may carry a query string; it is ignored.
    pub fn handle(&self, method: &str, path: &str, body: &mut dyn Read) -> Reply {
        let path = path.split('?').next().unwrap_or(path);
        log::debug!("{} {}", method, path);

        match (method, path) {
            ("POST", GRAPHQL_PATH) => self.graphql(body),
            ("GET", GRAPHQL_PATH) if self.graphiql => Reply {
                status: 200,
                content_type: HTML,
                body: GraphiQLSource::build()
                    .endpoint(GRAPHQL_PATH)
                    .finish()
                    .into_bytes(),
            },
            (_, GRAPHQL_PATH) => Reply::error(405, "use POST for GraphQL requests"),
            ("GET", HEALTH_PATH) => match self.service.health() {
                Ok(()) => Reply::json(200, json!({ "status": "ok" })),
                Err(e) => Reply::json(
                    503,
                    json!({ "status": "unavailable", "error": e.to_string() }),
                ),
            },
            ("GET", METRICS_PATH) if cfg!(feature = "metrics") => Reply {
                status: 200,
                content_type: TEXT,
                body: crate::metrics::render_prometheus().into_bytes(),
            },
            _ => Reply::error(404, format!("no route for {} {}", method, path)),
        }
    }

    fn graphql(&self, body: &mut dyn Read) -> Reply {
        let limit = self.max_body_bytes as u64;
        let mut raw = Vec::new();
        if let Err(e) = body.take(limit + 1).read_to_end(&mut raw) {
            return Reply::error(400, format!("failed to read request body: {}", e));
        }
        if raw.len() as u64 > limit {
            return Reply::error(413, format!("request body exceeds {} bytes", limit));
        }

        let request: BatchRequest = match serde_json::from_slice(&raw) {
            Ok(request) => request,
            Err(e) => return Reply::error(400, format!("invalid GraphQL request: {}", e)),
        };

        let response = block_on(self.schema.execute_batch(request));
        match serde_json::to_vec(&response) {
            Ok(body) => Reply {
                status: 200,
                content_type: JSON,
                body,
            },
            Err(e) => Reply::error(500, format!("failed to encode response: {}", e)),
        }
    }
}

impl HttpService for GraphQlHttp {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let method = req.method().to_owned();
        let path = req.path().to_owned();
        let mut body = req.body();

        let reply = self.handle(&method, &path, &mut body);
        res.status_code(reply.status as usize, reply.reason());
        res.header(reply.content_type);
        res.body_mut().extend_from_slice(&reply.body);
        Ok(())
    }
}

/// Start serving on `addr`. Each connection runs on its own coroutine.
pub fn serve(app: GraphQlHttp, addr: &str) -> io::Result<JoinHandle<()>> {
    let handle = HttpServer(app).start(addr)?;
    log::info!("GraphQL endpoint listening on http://{}{}", addr, GRAPHQL_PATH);
    Ok(handle)
}
