//! Credential extraction.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Cookie carrying a bearer token for browser clients.
pub const BEARER_COOKIE: &str = "warden_token";

/// The concrete credential a request presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A raw bearer token, already stripped of the `Bearer ` prefix.
    Bearer(String),
    /// HTTP Basic username and password.
    Basic {
        /// The login name.
        username: String,
        /// The cleartext password.
        password: String,
    },
}

/// Extract the strongest credential from a request.
///
/// Precedence, first match wins: `Authorization: Bearer` header, the
/// bearer cookie, then HTTP Basic. `None` means the request is anonymous;
/// whether that is acceptable is the route's decision, not this
/// function's.
pub fn extract_credential(authorization: Option<&str>, cookie: Option<&str>) -> Option<Credential> {
    if let Some(token) = authorization.and_then(|header| header.strip_prefix("Bearer ")) {
        let token = token.trim();
        if !token.is_empty() {
            return Some(Credential::Bearer(token.to_string()));
        }
    }

    if let Some(token) = cookie.and_then(|header| cookie_value(header, BEARER_COOKIE)) {
        if !token.is_empty() {
            return Some(Credential::Bearer(token));
        }
    }

    if let Some(encoded) = authorization.and_then(|header| header.strip_prefix("Basic ")) {
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        return Some(Credential::Basic {
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    None
}

/// Find a value in a `Cookie` header.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
