use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Builds the full router: public routes, JWT-gated routes and global layers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(public::auth::login_post))
        .route("/api/auth/logout", post(public::auth::logout_post))
        .route("/api/images/serve", get(public::images::serve_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{entries, images, questions};

    Router::new()
        .route("/api/entries", get(entries::list_get).post(entries::create_post))
        .route("/api/entries/delete", delete(entries::delete))
        .route("/api/images/generate", post(images::generate_post))
        .route("/api/images/generate-prompt-idea", post(images::prompt_idea_post))
        .route("/api/questions/question-1", post(questions::question_1_post))
        .route("/api/questions/question-2", post(questions::question_2_post))
        .route("/api/questions/question-3", post(questions::question_3_post))
        .route("/api/questions/bridge-to-image", post(questions::bridge_to_image_post))
        .route("/api/questions/wildcards-random-2", get(questions::wildcards_random_2_get))
        // Only matched routes are gated; unknown methods still answer 405.
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// `*` allows any origin, an empty list disables cross-origin access.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Journal API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth/login, /api/auth/logout (public)",
            "entries": "/api/entries, /api/entries/delete (protected)",
            "images": "/api/images/generate, /api/images/generate-prompt-idea (protected), /api/images/serve (public)",
            "questions": "/api/questions/* (protected)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "storage": state.storage.kind(),
        "timestamp": chrono::Utc::now(),
    }))
}

/// Binds the configured port and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let address = format!("0.0.0.0:{}", state.config.server.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Journal API listening on http://{}", address);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AppConfig, Environment, ImageConfig, LangfuseConfig, LlmConfig, PromptConfig, PromptSourceKind,
        ServerConfig, StorageConfig,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(data_dir: &std::path::Path, cors_origins: Vec<String>) -> AppState {
        let config = AppConfig {
            environment: Environment::Production,
            server: ServerConfig { port: 0 },
            security: SecurityConfig {
                jwt_secret: "secret".into(),
                auth_password: "pw".into(),
                jwt_expiry_hours: 24,
                cors_origins,
            },
            storage: StorageConfig::Local {
                data_dir: data_dir.to_path_buf(),
            },
            llm: LlmConfig {
                openrouter_api_key: None,
                openrouter_base_url: "http://127.0.0.1:9".into(),
                question_model: "m".into(),
                image_idea_model: None,
            },
            images: ImageConfig {
                service: None,
                openai_api_key: None,
                openai_image_model: None,
                openai_base_url: "http://127.0.0.1:9".into(),
                recraft_api_key: None,
                recraft_image_model: None,
                recraft_base_url: "http://127.0.0.1:9".into(),
            },
            prompts: PromptConfig {
                source: PromptSourceKind::File,
                dir: data_dir.to_path_buf(),
                langfuse: LangfuseConfig {
                    host: "http://127.0.0.1:9".into(),
                    public_key: None,
                    secret_key: None,
                },
                cache_ttl_secs: 60,
            },
        };
        AppState::from_config(config).unwrap()
    }

    #[tokio::test]
    async fn test_root_lists_service() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(state(dir.path(), Vec::new()))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin_only() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(state(dir.path(), vec!["https://journal.example".into()]));

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/entries")
                .header("Origin", origin)
                .header("Access-Control-Request-Method", "GET")
                .body(Body::empty())
                .unwrap()
        };

        let allowed = router.clone().oneshot(preflight("https://journal.example")).await.unwrap();
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "https://journal.example"
        );

        let denied = router.oneshot(preflight("https://elsewhere.example")).await.unwrap();
        assert!(denied.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_empty_bearer_token_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(state(dir.path(), Vec::new()))
            .oneshot(
                Request::get("/api/entries")
                    .header("Authorization", "Bearer ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Invalid token");
    }
}
