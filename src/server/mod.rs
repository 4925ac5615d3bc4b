/// # HTTP entry point
///
/// `GET /?p=<template>&<token>=<value>...` renders the named template and
/// answers with the encoded image. Every query value is also available to
/// `%token%` placeholders.
///
/// ```bash
/// rtimg serve --listen 0.0.0.0:8080 --templates ./templates --resources ./resources
/// ```

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::core::generator::{sanitize_params, Generator, RenderOutcome};
use crate::error::GeneratorError;

/// Query string of a render request.
#[derive(Debug, Default, Deserialize)]
pub struct RenderQuery {
    #[serde(flatten)]
    pub params: HashMap<String, String>,
}

/// Build the router serving renders at `/`.
pub fn router(generator: Arc<Generator>) -> Router {
    Router::new()
        .route("/", get(render_handler))
        .with_state(generator)
}

/// Start the HTTP server.
pub async fn serve(generator: Generator, listen: SocketAddr) -> std::io::Result<()> {
    let app = router(Arc::new(generator));

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}

/// Handle GET / - render a template.
async fn render_handler(
    State(generator): State<Arc<Generator>>,
    Query(query): Query<RenderQuery>,
) -> Response {
    let requested = query
        .params
        .get(&generator.config().query_parameter)
        .cloned();
    let placeholders = sanitize_params(query.params);

    // Rendering is CPU-bound, keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let template = generator.template_name(requested.as_deref()).to_string();
        generator.render(&template, &placeholders)
    })
    .await;

    match result {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => {
            error!("Render task failed: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Task error: {e}"))
        }
    }
}

/// Map a render result to the HTTP response.
pub fn outcome_response(outcome: Result<RenderOutcome, GeneratorError>) -> Response {
    match outcome {
        Ok(RenderOutcome::Image { image, .. }) => match image.filename {
            Some(filename) => (
                [
                    (header::CONTENT_TYPE, image.content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("filename=\"{filename}\""),
                    ),
                ],
                image.bytes,
            )
                .into_response(),
            None => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        },
        Ok(RenderOutcome::Rejected { errors }) => {
            text_response(StatusCode::INTERNAL_SERVER_ERROR, errors.join("\n"))
        }
        Err(e) => {
            error!("Render failed: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
