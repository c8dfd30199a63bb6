//! SSE byte passthrough.
//!
//! The relay is a read/write pump: each chunk read from the provider is
//! forwarded to the client as-is, in order, with no buffering, inspection, or
//! transcoding. Once this response is returned, headers are committed — a
//! mid-stream upstream failure can only end the body, never rewrite the
//! status, so the pump logs and closes instead of erroring the body stream.
//! If the client disconnects, axum drops the body, which drops the upstream
//! response and releases the connection.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use tracing::warn;

/// Wraps a successful upstream streaming response into the client-facing
/// event-stream response.
pub fn relay_sse(upstream: reqwest::Response) -> Response {
    let body = Body::from_stream(async_stream::stream! {
        let mut chunks = Box::pin(upstream.bytes_stream());
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => yield Ok::<Bytes, Infallible>(bytes),
                Err(err) => {
                    warn!("upstream stream interrupted mid-relay: {err}");
                    break;
                },
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .expect("valid streaming response")
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    // relay_sse itself needs a reqwest::Response; the integration tests in
    // relay::tests::handlers exercise it end-to-end against a mock provider.
    // Here we only pin down the pump ordering over a plain chunk stream.

    async fn pump(chunks: Vec<Result<Bytes, std::io::Error>>) -> Vec<Bytes> {
        let source = stream::iter(chunks);
        let relayed = async_stream::stream! {
            let mut chunks = Box::pin(source);
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => yield bytes,
                    Err(_) => break,
                }
            }
        };
        Box::pin(relayed).collect().await
    }

    #[tokio::test]
    async fn forwards_chunks_in_order() {
        let out = pump(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Ok(Bytes::from_static(b"data: two\n\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ])
        .await;
        assert_eq!(out, vec![
            Bytes::from_static(b"data: one\n\n"),
            Bytes::from_static(b"data: two\n\n"),
            Bytes::from_static(b"data: [DONE]\n\n"),
        ]);
    }

    #[tokio::test]
    async fn stops_cleanly_at_first_error_without_dropping_earlier_chunks() {
        let out = pump(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ])
        .await;
        assert_eq!(out, vec![Bytes::from_static(b"data: one\n\n")]);
    }
}
