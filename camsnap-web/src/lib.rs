//! camsnap web - serve the latest captured frame over HTTP
//!
//! Every request is gated by HTTP Basic authentication and answered with the
//! current contents of the frame file written by the capture loop.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use auth::{BasicAuth, encode_basic, parse_basic};
pub use config::WebConfig;
pub use error::WebError;
pub use handler::{FrameHandler, Reply};
pub use server::{bind, into_response, serve};

/// Validate, bind and serve until the process exits.
pub fn run(config: &WebConfig) -> Result<(), WebError> {
    config.validate()?;
    let server = bind(config)?;
    serve(&server, &FrameHandler::from(config));
    Ok(())
}
