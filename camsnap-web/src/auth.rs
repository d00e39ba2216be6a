//! HTTP Basic authentication.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use subtle::ConstantTimeEq;

/// Username and password pair accepted by the server.
#[derive(Clone)]
pub struct BasicAuth {
    user: String,
    password: String,
}

impl BasicAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Check an `Authorization` header value.
    ///
    /// Both fields are compared in constant time for equal-length inputs and
    /// both comparisons always run.
    pub fn verify(&self, authorization: Option<&str>) -> bool {
        let Some((user, password)) = authorization.and_then(parse_basic) else {
            return false;
        };
        let user_ok = user.as_bytes().ct_eq(self.user.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        bool::from(user_ok & password_ok)
    }
}

/// Decode `Basic <base64(user:password)>`.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// `Authorization` header value for `user:password`.
pub fn encode_basic(user: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{}:{}", user, password))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        assert_eq!(
            parse_basic("Basic YWRtaW46czNjcjN0"),
            Some(("admin".to_string(), "s3cr3t".to_string()))
        );
        assert_eq!(
            parse_basic("basic YWRtaW46czNjcjN0"),
            Some(("admin".to_string(), "s3cr3t".to_string()))
        );
        assert_eq!(parse_basic("Bearer YWRtaW46czNjcjN0"), None);
        assert_eq!(parse_basic("Basic not-base64!"), None);
        // "nocolon"
        assert_eq!(parse_basic("Basic bm9jb2xvbg=="), None);
    }

    #[test]
    fn test_password_may_contain_colon() {
        let header = encode_basic("admin", "a:b");
        assert_eq!(
            parse_basic(&header),
            Some(("admin".to_string(), "a:b".to_string()))
        );
    }

    #[test]
    fn test_verify() {
        let auth = BasicAuth::new("admin", "s3cr3t");
        assert!(auth.verify(Some(&encode_basic("admin", "s3cr3t"))));
        assert!(!auth.verify(Some(&encode_basic("admin", "wrong"))));
        assert!(!auth.verify(Some(&encode_basic("root", "s3cr3t"))));
        assert!(!auth.verify(Some(&encode_basic("admin", "s3cr3t!"))));
        assert!(!auth.verify(None));
    }
}
