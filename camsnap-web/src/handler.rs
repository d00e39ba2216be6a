//! Request handling independent of the HTTP transport.

use crate::auth::BasicAuth;
use crate::config::WebConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const UNAUTHORISED_BODY: &[u8] = b"Unauthorised.\n";

/// A response ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    /// Challenge sent with `401`.
    pub www_authenticate: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    fn unauthorised(realm: &str) -> Self {
        Self {
            status: 401,
            content_type: "text/plain; charset=utf-8",
            www_authenticate: Some(format!("Basic realm=\"{}\"", realm)),
            body: UNAUTHORISED_BODY.to_vec(),
        }
    }

    fn server_error(message: String) -> Self {
        Self {
            status: 500,
            content_type: "text/plain; charset=utf-8",
            www_authenticate: None,
            body: message.into_bytes(),
        }
    }
}

/// Serves the frame file behind Basic authentication.
///
/// Every path and method gets the same treatment.
#[derive(Clone)]
pub struct FrameHandler {
    frame: PathBuf,
    auth: BasicAuth,
    realm: String,
}

impl FrameHandler {
    pub fn new(frame: impl Into<PathBuf>, auth: BasicAuth, realm: impl Into<String>) -> Self {
        Self {
            frame: frame.into(),
            auth,
            realm: realm.into(),
        }
    }

    pub fn frame(&self) -> &Path {
        &self.frame
    }

    pub fn handle(&self, authorization: Option<&str>) -> Reply {
        if !self.auth.verify(authorization) {
            debug!("Rejected request without valid credentials");
            return Reply::unauthorised(&self.realm);
        }

        match fs::read(&self.frame) {
            Ok(body) => Reply {
                status: 200,
                content_type: "image/jpeg",
                www_authenticate: None,
                body,
            },
            Err(e) => {
                warn!("Error reading frame {}: {}", self.frame.display(), e);
                Reply::server_error(format!("Error reading frame: {}", e))
            }
        }
    }
}

impl From<&WebConfig> for FrameHandler {
    fn from(config: &WebConfig) -> Self {
        FrameHandler::new(
            config.frame.clone(),
            BasicAuth::new(config.user.clone(), config.password.clone()),
            config.realm.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::encode_basic;

    fn handler(frame: &Path) -> FrameHandler {
        FrameHandler::new(frame, BasicAuth::new("admin", "s3cr3t"), "camsnap")
    }

    #[test]
    fn test_missing_credentials_challenge() {
        let dir = tempfile::tempdir().unwrap();
        let reply = handler(&dir.path().join("frame.jpeg")).handle(None);
        assert_eq!(reply.status, 401);
        assert_eq!(
            reply.www_authenticate.as_deref(),
            Some("Basic realm=\"camsnap\"")
        );
        assert_eq!(reply.body, UNAUTHORISED_BODY);
    }

    #[test]
    fn test_wrong_password_challenge() {
        let dir = tempfile::tempdir().unwrap();
        let reply =
            handler(&dir.path().join("frame.jpeg")).handle(Some(&encode_basic("admin", "nope")));
        assert_eq!(reply.status, 401);
    }

    #[test]
    fn test_serves_frame_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpeg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        let reply = handler(&path).handle(Some(&encode_basic("admin", "s3cr3t")));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "image/jpeg");
        assert_eq!(reply.body, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn test_missing_frame_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let reply =
            handler(&dir.path().join("absent.jpeg")).handle(Some(&encode_basic("admin", "s3cr3t")));
        assert_eq!(reply.status, 500);
        assert!(String::from_utf8(reply.body).unwrap().starts_with("Error reading frame"));
    }
}
