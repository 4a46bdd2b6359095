//! Plain HTTP endpoint for operators.
//!
//! Serves `GET /metrics` in the Prometheus text format on its own port, next
//! to the WebSocket edge. Any other path is a 404.

use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::metrics;

type HttpResult = Result<Response<Full<Bytes>>, Infallible>;

async fn http_handler(req: Request<IncomingBody>) -> HttpResult {
    let response = match req.uri().path() {
        "/metrics" => match metrics::gather_metrics() {
            Ok(text) => {
                let mut res = Response::new(Full::new(Bytes::from(text)));
                res.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                res
            }
            Err(e) => {
                error!("Failed to gather metrics: {e}");
                status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        },
        _ => status_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    Ok(response)
}

fn status_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *res.status_mut() = status;
    res
}

pub async fn start_metrics_server(addr: String) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics endpoint listening on http://{addr}/metrics");

    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!("Failed to accept metrics connection: {e}");
                continue;
            }
        };

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(http_handler))
                .await
            {
                warn!("Error serving metrics connection: {err}");
            }
        });
    }
}
