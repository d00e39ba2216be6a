//! Server settings.

use crate::error::WebError;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_FRAME: &str = "./camera_frame.jpeg";
pub const DEFAULT_ADDR: &str = "0.0.0.0:9876";
pub const DEFAULT_REALM: &str = "Please enter your username and password for this site";

#[derive(Clone)]
pub struct WebConfig {
    /// File served on every authorised request.
    pub frame: PathBuf,
    pub addr: String,
    pub user: String,
    pub password: String,
    pub realm: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            frame: PathBuf::from(DEFAULT_FRAME),
            addr: DEFAULT_ADDR.to_string(),
            user: String::new(),
            password: String::new(),
            realm: DEFAULT_REALM.to_string(),
        }
    }
}

impl WebConfig {
    /// Both credentials must be set.
    pub fn validate(&self) -> Result<(), WebError> {
        if self.user.is_empty() {
            return Err(WebError::MissingCredential("user"));
        }
        if self.password.is_empty() {
            return Err(WebError::MissingCredential("password"));
        }
        Ok(())
    }
}

impl fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebConfig")
            .field("frame", &self.frame)
            .field("addr", &self.addr)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_required() {
        let mut config = WebConfig::default();
        assert!(matches!(
            config.validate(),
            Err(WebError::MissingCredential("user"))
        ));
        config.user = "admin".into();
        assert!(matches!(
            config.validate(),
            Err(WebError::MissingCredential("password"))
        ));
        config.password = "secret".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = WebConfig {
            password: "hunter2".into(),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
