//! HTTP surface: `POST /generar-sql` plus diagnostics

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use serde_json::json;
use tokio::net::TcpListener;

use crate::client::SqlRelay;
use crate::request::{ErrorResponse, GenerationRequest, ModelsResponse};

/// Creates the API router.
pub fn create_router(relay: SqlRelay) -> Router
{   Router::new()
      .route("/generar-sql", post(generar_sql))
      .route("/debug-sql", post(debug_sql))
      .route("/modelos", get(list_models))
      .route("/health", get(health_check))
      .with_state(relay)
}

/// Bind the configured address and serve until ctrl-c.
pub async fn serve(
  relay: SqlRelay
, config: &crate::config::ServerConfig
) -> Result<(), crate::error::Error>
{   let listener = TcpListener::bind(config.bind_addr()).await?;
    serve_on(relay, listener).await
}

/// Serve on an already bound listener.
pub async fn serve_on(
  relay: SqlRelay
, listener: TcpListener
) -> Result<(), crate::error::Error>
{   let addr = listener.local_addr()?;
    info!("sqlrelay listening on {}", addr);
    axum::serve(listener, create_router(relay))
      .with_graceful_shutdown(shutdown_signal())
      .await?;
    info!("sqlrelay stopped");
    Ok(())
}

async fn shutdown_signal()
{   if let Err(e) = tokio::signal::ctrl_c().await
    {   error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn generar_sql(
  State(relay): State<SqlRelay>
, Json(request): Json<GenerationRequest>
) -> Response
{   if relay.masks_failures()
    {   return Json(relay.generate(&request).await).into_response();
    }
    match relay.try_generate(&request).await
    {   Ok(result) => Json(result).into_response()
      , Err(e) => {
          error!("Generation failed: {}", e);
          (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { detail: e.to_string() }),
          ).into_response()
        }
    }
}

async fn debug_sql(
  State(relay): State<SqlRelay>
, Json(request): Json<GenerationRequest>
) -> impl IntoResponse
{   Json(relay.generate_debug(&request).await)
}

async fn list_models(State(relay): State<SqlRelay>) -> Response
{   match relay.list_models().await
    {   Ok(modelos) => Json(ModelsResponse { modelos }).into_response()
      , Err(e) => {
          error!("Model listing failed: {}", e);
          (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse { detail: e.to_string() }),
          ).into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse
{   (StatusCode::OK, Json(json!({ "status": "ok" })))
}
