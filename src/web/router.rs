//! Web application router and middleware setup.

use crate::web::{handlers, websocket, WebContext};
use axum::{
    routing::get,
    Router,
};
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the axum application with all routes and middleware.
pub fn create_app(ctx: WebContext) -> Router {
    let config = ctx.config.clone();

    let mut app = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/sensor/current", get(handlers::current_sensor))
        .route("/api/sensor/status", get(handlers::sensor_status))
        .route(
            "/api/sensor/config",
            get(handlers::get_config).post(handlers::update_config),
        )
        .route("/ws", get(websocket::websocket_handler));

    match &config.static_path {
        Some(static_path) if PathBuf::from(static_path).join("index.html").exists() => {
            info!("Serving dashboard from: {}", static_path);
            app = app
                .nest_service("/static", ServeDir::new(static_path))
                .route("/", get(handlers::serve_index));
        }
        Some(static_path) => {
            warn!(
                "Static path {:?} has no index.html, serving API banner at /",
                static_path
            );
            app = app.route("/", get(handlers::root));
        }
        None => {
            app = app.route("/", get(handlers::root));
        }
    }

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::web::WebConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        create_app(WebContext::new(
            AppState::shared(Default::default()),
            WebConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_config_update_validation() {
        let response = app()
            .oneshot(
                Request::post("/api/sensor/config")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"caution_threshold": 90}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(
                Request::post("/api/sensor/config")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"caution_threshold": 20, "danger_threshold": 80}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_banner() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
