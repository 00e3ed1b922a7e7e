//! HTTP/1 transport for a [`Handler`].

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::api_error::{ApiError, ErrorKind};
use crate::handler::Handler;

/// Largest request body [`serve`] accepts, in bytes.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Bind `addr` and serve `handler` until the listener fails.
pub async fn bind_and_serve(addr: SocketAddr, handler: Arc<Handler>) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on {}", listener.local_addr()?);
    serve(listener, handler).await
}

/// Accept connections on `listener` and answer each request with `handler`.
///
/// Every request is routed on the blocking pool since the backend performs
/// synchronous filesystem calls. Connection errors are logged and do not
/// stop the loop; an accept error does.
pub async fn serve(listener: TcpListener, handler: Arc<Handler>) -> io::Result<()> {
    serve_with_limit(listener, handler, MAX_BODY_BYTES).await
}

/// Like [`serve`], answering bodies larger than `max_body_bytes` with
/// `bad-input` without buffering them.
pub async fn serve_with_limit(
    listener: TcpListener,
    handler: Arc<Handler>,
    max_body_bytes: usize,
) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = Arc::clone(&handler);

        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let handler = Arc::clone(&handler);
                async move { Ok::<_, Infallible>(respond(handler, request, max_body_bytes).await) }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::warn!("connection from {} failed: {}", peer, e);
            }
        });
    }
}

async fn respond(
    handler: Arc<Handler>,
    request: Request<Incoming>,
    max_body_bytes: usize,
) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    let body = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            log::warn!("rejecting request body larger than {} bytes", max_body_bytes);
            return ApiError::bad_input("the request body is too large.")
                .to_response()
                .map(Full::new);
        }
        Err(e) => {
            log::warn!("failed to read request body: {}", e);
            return ApiError::from(ErrorKind::BadInput)
                .to_response()
                .map(Full::new);
        }
    };

    let request = Request::from_parts(parts, body);
    match tokio::task::spawn_blocking(move || handler.handle(request)).await {
        Ok(response) => response.map(Full::new),
        Err(e) => {
            log::error!("request handler did not complete: {}", e);
            ApiError::internal().to_response().map(Full::new)
        }
    }
}
