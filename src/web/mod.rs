// ============================================================
// Layer 7 — HTTP Prediction Service
// ============================================================
// A warp server with three routes:
//
//   GET  /         → {"health_check": "App up and running!"}
//   POST /predict  → AbaloneInput JSON in, {"predicted_rings": f64} out
//   POST /retrain  → spawns an out-of-process training job and
//                    answers 202 immediately; the child is reaped
//                    in the background and its exit status logged.
//                    Only one job runs at a time: a request while
//                    one is still running gets 409
//
// AppState (ServiceContext + retrain command) is built once before
// the server starts and handed to each handler through an Arc.
//
// Error bodies are always {"error": "..."}:
//   400  malformed JSON or an unknown Sex code
//   404  unknown path, 405 wrong method
//   409  retraining already in progress
//   411  POST /predict without Content-Length
//   500  prediction or spawn failure
//
// Reference: warp documentation (Filters, Rejections)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc};
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::application::predict_use_case::ServiceContext;
use crate::domain::abalone::{AbaloneInput, AbalonePrediction};

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum RetrainError {
    #[error("retraining is already in progress")]
    AlreadyRunning,

    #[error("could not start retraining: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The external command POST /retrain launches.
#[derive(Debug, Clone)]
pub struct RetrainCommand {
    pub program: PathBuf,
    pub args:    Vec<String>,
    running:     Arc<AtomicBool>,
}

impl RetrainCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self { program: program.into(), args, running: Arc::new(AtomicBool::new(false)) }
    }

    /// True while a spawned job has not been reaped yet
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Re-invoke this binary's `train` subcommand.
    pub fn current_exe(args: Vec<String>) -> Result<Self> {
        let program = std::env::current_exe().context("Cannot locate the running executable")?;
        let mut full = vec!["train".to_string()];
        full.extend(args);
        Ok(Self::new(program, full))
    }

    /// Start the job and return without waiting for it.
    /// Refuses while the previous job is still running.
    pub fn spawn(&self) -> Result<u32, RetrainError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RetrainError::AlreadyRunning);
        }

        let mut child = match tokio::process::Command::new(&self.program).args(&self.args).spawn() {
            Ok(child) => child,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };
        let pid     = child.id().unwrap_or_default();
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => tracing::info!("Retrain job {pid} finished"),
                Ok(status) => tracing::warn!("Retrain job {pid} exited with {status}"),
                Err(e) => tracing::warn!("Could not wait on retrain job {pid}: {e}"),
            }
            running.store(false, Ordering::Release);
        });
        Ok(pid)
    }
}

pub struct AppState {
    pub ctx:     ServiceContext,
    pub retrain: RetrainCommand,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthBody {
    pub health_check: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrainBody {
    pub status: String,
    pub pid:    u32,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody { error: message.into() }),
        status,
    )
}

// ─── Routes ───────────────────────────────────────────────────────────────────

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_state = warp::any().map(move || Arc::clone(&state));

    let health = warp::path::end().and(warp::get()).map(|| {
        warp::reply::json(&HealthBody { health_check: "App up and running!".to_string() })
    });

    let predict = warp::path!("predict")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state.clone())
        .and_then(predict_handler);

    let retrain = warp::path!("retrain")
        .and(warp::post())
        .and(with_state)
        .and_then(retrain_handler);

    health
        .or(predict)
        .or(retrain)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

async fn predict_handler(input: AbaloneInput, state: Arc<AppState>) -> Result<impl Reply, Infallible> {
    let reply = match state.ctx.predict(&input) {
        Ok(predicted_rings) => warp::reply::with_status(
            warp::reply::json(&AbalonePrediction { predicted_rings }),
            StatusCode::OK,
        ),
        Err(e) => {
            tracing::warn!("Prediction failed: {e:#}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    };
    Ok(reply)
}

async fn retrain_handler(state: Arc<AppState>) -> Result<impl Reply, Infallible> {
    let reply = match state.retrain.spawn() {
        Ok(pid) => {
            tracing::info!("Retraining started as process {pid}");
            warp::reply::with_status(
                warp::reply::json(&RetrainBody { status: "retraining started".to_string(), pid }),
                StatusCode::ACCEPTED,
            )
        }
        Err(e @ RetrainError::AlreadyRunning) => {
            tracing::info!("Retrain request refused: {e}");
            error_reply(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => {
            tracing::warn!("{e}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    };
    Ok(reply)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let reply = if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        error_reply(StatusCode::LENGTH_REQUIRED, "Content-Length header required")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        error_reply(StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected application/json")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "not found")
    } else {
        tracing::warn!("Unhandled rejection: {err:?}");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };
    Ok(reply)
}

// ─── Server ───────────────────────────────────────────────────────────────────

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let (bound, server) = warp::serve(routes(Arc::new(state)))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .with_context(|| format!("Cannot bind HTTP server to {addr}"))?;

    tracing::info!("Abalone Prediction API listening on http://{bound}");
    server.await;
    Ok(())
}
