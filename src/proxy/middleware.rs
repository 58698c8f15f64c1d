//! Middleware implementations for the gateway

use crate::proxy::headers::header_text;
use crate::proxy::types::CorrelationHeader;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Logging middleware - logs request/response details with timing.
///
/// `correlation_header` is the configured header whose value is logged as
/// `request_id`.
pub async fn logging_middleware(
    State(correlation_header): State<CorrelationHeader>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    // Extract request details before passing ownership
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = header_text(request.headers(), correlation_header.as_ref());

    info!(
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        "Incoming request"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();

    info!(
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        status = response.status().as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn_with_state;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_logging_middleware_passes_response_through() {
        let handler = tower::service_fn(|_req: Request| async move {
            Ok::<_, std::convert::Infallible>(
                Response::builder()
                    .status(StatusCode::CREATED)
                    .body(Body::from("made"))
                    .unwrap(),
            )
        });

        let header = CorrelationHeader::try_new("x-correlation-id".to_string()).unwrap();
        let service = tower::ServiceBuilder::new()
            .layer(from_fn_with_state(header, logging_middleware))
            .service(handler);

        let request = Request::builder()
            .method("POST")
            .uri("/svc-a/items")
            .header("x-correlation-id", "req-9")
            .body(Body::empty())
            .unwrap();

        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"made");
    }
}
