use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use opticut::grouping;
use opticut::solver;
use opticut::types::{
    CutRequest, GroupedResult, OptimizationResult, OptimizeError, OptimizeOptions, Piece,
    SheetType,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    sheet: SheetType,
    pieces: Vec<Piece>,
    #[serde(default)]
    options: OptimizeOptions,
}

#[derive(Deserialize, Serialize)]
struct GroupedRequest {
    requests: Vec<CutRequest>,
    catalog: Vec<SheetType>,
    #[serde(default)]
    options: OptimizeOptions,
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizationResult>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    solver::optimize(&req.sheet, &req.pieces, &req.options)
        .map(Json)
        .map_err(|e| match e {
            OptimizeError::InvalidSheet { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
            OptimizeError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })
}

async fn optimize_grouped(Json(req): Json<GroupedRequest>) -> Json<GroupedResult> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize-grouped"
    );

    Json(grouping::optimize_grouped(
        &req.requests,
        &req.catalog,
        &req.options,
    ))
}

async fn serve() {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/optimize-grouped", post(optimize_grouped))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}

fn main() {
    // Sentry wants to be initialized before the async runtime starts.
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(serve());
}
