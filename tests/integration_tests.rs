use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use sqlrelay::config::FailoverConfig;
use sqlrelay::error::Error;
use sqlrelay::failover::{dispatch, FailoverSequence, RetryPolicy};
use sqlrelay::request::GenerationRequest;
use sqlrelay::{OutputFormat, SqlRelay, TextProvider};

/// Provider that answers from a fixed table and records every call
struct ScriptedProvider
{   answers: HashMap<String, Result<String, Error>>
  , models: Result<Vec<String>, Error>
  , calls: Mutex<Vec<String>>
}

impl ScriptedProvider
{   fn new(answers: &[(&str, Result<&str, Error>)]) -> Arc<Self>
    {   Arc::new(ScriptedProvider
        {   answers: answers
              .iter()
              .map(|(model, answer)| {
                (model.to_string(), answer.clone().map(str::to_string))
              })
              .collect()
          , models: Ok(vec!["gemini-2.0-flash".to_string()])
          , calls: Mutex::new(vec![])
        })
    }

    fn failing_models(error: Error) -> Arc<Self>
    {   Arc::new(ScriptedProvider
        {   answers: HashMap::new()
          , models: Err(error)
          , calls: Mutex::new(vec![])
        })
    }

    fn calls(&self) -> Vec<String>
    {   self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider
{   async fn generate(
      &self
    , model: &str
    , _prompt: &str
    ) -> Result<String, Error>
    {   self.calls.lock().unwrap().push(model.to_string());
        self.answers
          .get(model)
          .cloned()
          .unwrap_or_else(|| Err(Error::ApiError
          {   status: 404
            , message: format!("unknown model {}", model)
          }))
    }

    async fn list_models(&self) -> Result<Vec<String>, Error>
    {   self.models.clone()
    }

    fn name(&self) -> &str
    {   "scripted"
    }
}

fn failover_config(candidates: &[&str]) -> FailoverConfig
{   FailoverConfig
    {   candidates: candidates.iter().map(|c| c.to_string()).collect()
      , short_backoff_ms: 0
      , long_backoff_ms: 0
      , mask_failures: true
    }
}

fn transient() -> Error
{   Error::ApiError
    {   status: 503
      , message: "overloaded".to_string()
    }
}

async fn json_body(response: axum::response::Response) -> Value
{   let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body>
{   Request::builder()
      .method("POST")
      .uri(uri)
      .header("Content-Type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
}

// ===== End-to-end scenarios =====

#[tokio::test]
async fn test_first_candidate_answers()
{   let provider = ScriptedProvider::new(&[
      ("m1", Ok("SELECT * FROM usuario"))
    , ("m2", Ok("SELECT 2"))
    ]);
    let relay = SqlRelay::new(
      provider.clone(),
      &failover_config(&["m1", "m2"])
    );

    let result = relay
      .generate(&GenerationRequest::new("generar JSON: lista de clientes"))
      .await;

    assert_eq!(result.sql, "SELECT * FROM usuario");
    assert_eq!(result.formato, OutputFormat::Json);
    assert!(result.columnas.is_empty());
    assert_eq!(provider.calls(), vec!["m1"]);
}

#[tokio::test]
async fn test_fenced_answer_is_cleaned()
{   let provider = ScriptedProvider::new(&[
      ("m1", Ok("```sql\nSELECT * FROM venta\n```"))
    ]);
    let relay = SqlRelay::new(provider, &failover_config(&["m1"]));

    let result = relay
      .generate(&GenerationRequest::new("dame reporte en pdf de ventas"))
      .await;

    assert_eq!(result.sql, "SELECT * FROM venta");
    assert_eq!(result.formato, OutputFormat::Pdf);
}

#[tokio::test]
async fn test_all_candidates_fail_gives_fallback()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(transient()))
    , ("m2", Err(Error::RateLimitExceeded("quota".into())))
    , ("m3", Err(Error::HttpError("connection reset".into())))
    ]);
    let relay = SqlRelay::new(
      provider.clone(),
      &failover_config(&["m1", "m2", "m3"])
    );
    let request = GenerationRequest::new("lista de productos");

    let first = relay.generate(&request).await;
    assert_eq!(
      first.sql,
      sqlrelay::fallback::fallback_sql("lista de productos")
    );
    assert!(first.sql.contains("FROM productos"));
    assert_eq!(first.formato, OutputFormat::Json);
    assert!(first.columnas.is_empty());

    let second = relay.generate(&request).await;
    assert_eq!(first, second);
    assert_eq!(provider.calls().len(), 6);
}

#[tokio::test]
async fn test_fallback_forces_json_format()
{   let provider = ScriptedProvider::new(&[("m1", Err(transient()))]);
    let relay = SqlRelay::new(provider, &failover_config(&["m1"]));

    let result = relay
      .generate(&GenerationRequest::new("reporte excel de clientes"))
      .await;

    assert_eq!(result.formato, OutputFormat::Json);
    assert!(result.sql.contains("FROM usuarios"));
}

// ===== Dispatcher =====

#[tokio::test]
async fn test_candidates_tried_in_order_until_success()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(transient()))
    , ("m2", Err(Error::Timeout))
    , ("m3", Ok("SELECT 3"))
    , ("m4", Ok("SELECT 4"))
    ]);
    let mut sequence = FailoverSequence::new(
      ["m1", "m2", "m3", "m4"].iter().map(|m| m.to_string()).collect()
    );

    let completion = tokio_test::assert_ok!(
      dispatch(
        provider.as_ref(),
        &mut sequence,
        &RetryPolicy::new(0, 0),
        "prompt"
      ).await
    );

    assert_eq!(completion.text, "SELECT 3");
    assert_eq!(completion.model, "m3");
    assert_eq!(completion.attempts, 3);
    assert_eq!(provider.calls(), vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn test_at_most_one_call_per_candidate()
{   let provider = ScriptedProvider::new(&[]);
    let candidates: Vec<String>
      = (0..5).map(|i| format!("m{}", i)).collect();
    let mut sequence = FailoverSequence::new(candidates.clone());

    let err = tokio_test::assert_err!(
      dispatch(
        provider.as_ref(),
        &mut sequence,
        &RetryPolicy::new(0, 0),
        "prompt"
      ).await
    );

    assert!(matches!(err, Error::CandidatesExhausted { attempts: 5, .. }));
    assert_eq!(provider.calls(), candidates);
}

#[tokio::test]
async fn test_blank_answer_moves_to_next_candidate()
{   let provider = ScriptedProvider::new(&[
      ("m1", Ok("```sql\n```"))
    , ("m2", Ok("SELECT 2"))
    ]);
    let relay = SqlRelay::new(
      provider.clone(),
      &failover_config(&["m1", "m2"])
    );

    let result = relay.generate(&GenerationRequest::new("ventas")).await;

    assert_eq!(result.sql, "SELECT 2");
    assert_eq!(provider.calls(), vec!["m1", "m2"]);
}

#[tokio::test]
async fn test_empty_candidate_list_is_exhaustion()
{   let provider = ScriptedProvider::new(&[("m1", Ok("SELECT 1"))]);
    let mut sequence = FailoverSequence::new(vec![]);

    let err = tokio_test::assert_err!(
      dispatch(
        provider.as_ref(),
        &mut sequence,
        &RetryPolicy::default(),
        "prompt"
      ).await
    );

    assert!(matches!(err, Error::CandidatesExhausted { attempts: 0, .. }));
    assert!(provider.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_takes_long_pause()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(Error::RateLimitExceeded("quota".into())))
    , ("m2", Ok("SELECT 1"))
    ]);
    let mut sequence = FailoverSequence::new(
      vec!["m1".to_string(), "m2".to_string()]
    );
    let start = tokio::time::Instant::now();

    tokio_test::assert_ok!(
      dispatch(
        provider.as_ref(),
        &mut sequence,
        &RetryPolicy::new(500, 5000),
        "prompt"
      ).await
    );

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(5000), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(5500), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_ordinary_failure_takes_short_pause()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(transient()))
    , ("m2", Ok("SELECT 1"))
    ]);
    let mut sequence = FailoverSequence::new(
      vec!["m1".to_string(), "m2".to_string()]
    );
    let start = tokio::time::Instant::now();

    tokio_test::assert_ok!(
      dispatch(
        provider.as_ref(),
        &mut sequence,
        &RetryPolicy::new(500, 5000),
        "prompt"
      ).await
    );

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(500), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(5000), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_no_pause_after_last_candidate()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(Error::RateLimitExceeded("quota".into())))
    ]);
    let mut sequence = FailoverSequence::new(vec!["m1".to_string()]);
    let start = tokio::time::Instant::now();

    tokio_test::assert_err!(
      dispatch(
        provider.as_ref(),
        &mut sequence,
        &RetryPolicy::new(500, 5000),
        "prompt"
      ).await
    );

    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_missing_key_answers_fallback_without_pausing()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(Error::MissingApiKey("Gemini".into())))
    , ("m2", Err(Error::MissingApiKey("Gemini".into())))
    , ("m3", Err(Error::MissingApiKey("Gemini".into())))
    , ("m4", Err(Error::MissingApiKey("Gemini".into())))
    ]);
    let mut config = failover_config(&["m1", "m2", "m3", "m4"]);
    config.short_backoff_ms = 1000;
    config.long_backoff_ms = 5000;
    let relay = SqlRelay::new(provider.clone(), &config);
    let start = tokio::time::Instant::now();

    let result = relay
      .generate(&GenerationRequest::new("lista de clientes"))
      .await;

    assert!(start.elapsed() < Duration::from_millis(1000));
    assert_eq!(result.sql, sqlrelay::fallback::fallback_sql("lista de clientes"));
    assert_eq!(provider.calls().len(), 4);
}

// ===== HTTP surface =====

#[tokio::test]
async fn test_generar_sql_endpoint()
{   let provider = ScriptedProvider::new(&[
      ("m1", Ok("SELECT * FROM usuario"))
    ]);
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &failover_config(&["m1"]))
    );

    let response = app.oneshot(post_json(
      "/generar-sql",
      r#"{"prompt": "generar JSON: lista de clientes"}"#
    )).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
      body,
      serde_json::json!({
        "sql": "SELECT * FROM usuario",
        "formato": "json",
        "columnas": []
      })
    );
}

#[tokio::test]
async fn test_generar_sql_masks_provider_failure()
{   let provider = ScriptedProvider::new(&[("m1", Err(transient()))]);
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &failover_config(&["m1"]))
    );

    let response = app.oneshot(post_json(
      "/generar-sql",
      r#"{"prompt": "ventas de hoy"}"#
    )).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["formato"], "json");
    assert!(body["sql"].as_str().unwrap().contains("FROM ventas"));
    assert_eq!(body["columnas"], serde_json::json!([]));
}

#[tokio::test]
async fn test_generar_sql_unmasked_returns_500()
{   let provider = ScriptedProvider::new(&[("m1", Err(transient()))]);
    let mut config = failover_config(&["m1"]);
    config.mask_failures = false;
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &config)
    );

    let response = app.oneshot(post_json(
      "/generar-sql",
      r#"{"prompt": "ventas de hoy"}"#
    )).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn test_missing_prompt_is_rejected()
{   let provider = ScriptedProvider::new(&[("m1", Ok("SELECT 1"))]);
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider.clone(), &failover_config(&["m1"]))
    );

    let response = app.oneshot(post_json(
      "/generar-sql",
      r#"{"texto": "ventas"}"#
    )).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_debug_endpoint_echoes_prompt()
{   let provider = ScriptedProvider::new(&[
      ("m1", Err(transient()))
    , ("m2", Ok("SELECT 1"))
    ]);
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &failover_config(&["m1", "m2"]))
    );

    let response = app.oneshot(post_json(
      "/debug-sql",
      r#"{"prompt": "generar JSON: ventas en excel"}"#
    )).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["consulta"], "ventas en excel");
    assert_eq!(body["formato"], "excel");
    assert_eq!(body["modelo"], "m2");
    assert_eq!(body["fallback"], false);
    assert_eq!(body["sql"], "SELECT 1");
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with(sqlrelay::prompt::DB_SCHEMA));
    assert!(prompt.contains("\"ventas en excel\""));
}

#[tokio::test]
async fn test_models_endpoint()
{   let provider = ScriptedProvider::new(&[]);
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &failover_config(&["m1"]))
    );

    let response = app.oneshot(
      Request::builder()
        .uri("/modelos")
        .body(Body::empty())
        .unwrap()
    ).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["modelos"], serde_json::json!(["gemini-2.0-flash"]));
}

#[tokio::test]
async fn test_models_endpoint_provider_failure()
{   let provider = ScriptedProvider::failing_models(
      Error::MissingApiKey("Gemini".to_string())
    );
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &failover_config(&["m1"]))
    );

    let response = app.oneshot(
      Request::builder()
        .uri("/modelos")
        .body(Body::empty())
        .unwrap()
    ).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("Gemini"));
}

#[tokio::test]
async fn test_health()
{   let provider = ScriptedProvider::new(&[]);
    let app = sqlrelay::server::create_router(
      SqlRelay::new(provider, &failover_config(&["m1"]))
    );

    let response = app.oneshot(
      Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap()
    ).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ===== Live provider =====

#[tokio::test]
#[ignore]
async fn test_gemini_live_generation()
{   let api_key = match std::env::var("GEMINI_API_KEY")
    {   Ok(key) => key,
        Err(_) => {
          println!("Skipping test: GEMINI_API_KEY not set");
          return;
        }
    };

    let provider = sqlrelay::providers::GeminiClient::new(Some(api_key));
    let relay = SqlRelay::new(
      Arc::new(provider),
      &FailoverConfig::default()
    );

    let result = relay
      .generate_debug(&GenerationRequest::new(
        "generar JSON: lista de clientes"
      ))
      .await;
    println!(
      "model {:?}, fallback {}: {}",
      result.modelo, result.fallback, result.sql
    );
    assert!(!result.sql.is_empty());
}
