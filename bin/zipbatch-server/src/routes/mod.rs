//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (request timeouts, CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI document endpoint (disable with `ZIPBATCH_ENABLE_SWAGGER=false`)
//! - Health route
//! - `/api/task` task routes and `/archive` downloads

mod archive;
pub mod doc;
mod health;
mod tasks;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Router, middleware};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(tasks::router())
        .merge(archive::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Bounds handlers up to the response head; archive bodies stream past it.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(RequestBodyTimeoutLayer::new(state.config.read_timeout()))
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(&state.config))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::Path;
    use axum::http::{Request, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use zipbatch_core::ArchivePoolHandle;

    use super::*;
    use crate::config::Config;

    /// Router plus the archive directory it writes to, removed on drop.
    pub struct TestApp {
        pub router: Router,
        pub config: Config,
        pub pool: Option<ArchivePoolHandle>,
    }

    impl TestApp {
        pub fn new(config: Config) -> Self {
            let (state, pool) = AppState::new(config.clone());
            Self {
                router: build(Arc::new(state)),
                config,
                pool: Some(pool),
            }
        }

        pub async fn send(&self, req: Request<Body>) -> Response {
            self.router.clone().oneshot(req).await.expect("router is infallible")
        }

        pub async fn get(&self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        pub async fn post_json(&self, uri: &str, body: &str) -> Response {
            self.send(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
        }
    }

    impl Drop for TestApp {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.config.archive_directory);
        }
    }

    pub fn test_config() -> Config {
        Config {
            archive_directory: std::env::temp_dir()
                .join(format!("zipbatch-server-{}", uuid::Uuid::new_v4())),
            public_base_url: Some("http://downloads.test".into()),
            fetch_timeout_secs: 2,
            ..Config::default()
        }
    }

    pub async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec()
    }

    pub async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).expect("json body")
    }

    async fn serve_file(Path((dir, name)): Path<(String, String)>) -> Response {
        match dir.as_str() {
            "missing" => StatusCode::NOT_FOUND.into_response(),
            _ => format!("{dir}/{name}").into_response(),
        }
    }

    /// Local HTTP server standing in for the remote file hosts.
    pub async fn spawn_file_host() -> String {
        let app = Router::new().route("/{dir}/{name}", get(serve_file));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind file host");
        let addr = listener.local_addr().expect("file host addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("file host");
        });
        format!("http://{addr}")
    }

    pub async fn wait_for_status(app: &TestApp, id: &str, status: &str) -> Value {
        for _ in 0..400 {
            let body = body_json(app.get(&format!("/api/task/{id}")).await).await;
            if body["status"] == status {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("task {id} never reached {status}");
    }
}
