//! tiny_http server loop.

use crate::config::WebConfig;
use crate::error::WebError;
use crate::handler::{FrameHandler, Reply};
use std::io::Cursor;
use tiny_http::{Header, Request, Response, Server};
use tracing::{info, warn};

/// Bind `config.addr`.
pub fn bind(config: &WebConfig) -> Result<Server, WebError> {
    Server::http(config.addr.as_str()).map_err(|source| WebError::Bind {
        addr: config.addr.clone(),
        source,
    })
}

/// Answer requests until the server is unblocked.
pub fn serve(server: &Server, handler: &FrameHandler) {
    let addr = server
        .server_addr()
        .to_ip()
        .map_or_else(|| "unix socket".to_string(), |a| a.to_string());
    info!(
        "Serving camera frame file: {} via http on: {}",
        handler.frame().display(),
        addr
    );
    for request in server.incoming_requests() {
        respond(request, handler);
    }
    info!("Server stopped");
}

fn respond(request: Request, handler: &FrameHandler) {
    let authorization = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_string());

    let reply = handler.handle(authorization.as_deref());
    let status = reply.status;
    if let Err(e) = request.respond(into_response(reply)) {
        warn!(status, "Error writing response: {}", e);
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(h) => Some(h),
        Err(()) => {
            warn!("Dropping invalid header {}: {}", name, value);
            None
        }
    }
}

/// Convert a reply with an exact `Content-Length` and no chunking.
pub fn into_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_data(reply.body)
        .with_status_code(reply.status)
        .with_chunked_threshold(usize::MAX);
    if let Some(h) = header("Content-Type", reply.content_type) {
        response.add_header(h);
    }
    if let Some(challenge) = reply.www_authenticate {
        if let Some(h) = header("WWW-Authenticate", &challenge) {
            response.add_header(h);
        }
    }
    response
}
