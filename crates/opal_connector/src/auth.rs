use base64::prelude::{Engine, BASE64_STANDARD};

/// Header carrying an opal personal access token.
const OPAL_AUTH_HEADER: &str = "X-Opal-Auth";

/// Credentials attached to every request made against the opal server.
///
/// Opal accepts either HTTP basic auth or a personal access token carried in
/// its own header. Neither requires a login round trip, so credentials are
/// resolved into a header once per request without a session exchange.
#[derive(Debug, Clone)]
pub enum OpalCredentials {
    Basic { username: String, password: String },
    Token(String),
}

impl OpalCredentials {
    /// Header name/value pair for these credentials.
    pub(crate) fn header(&self) -> (&'static str, String) {
        match self {
            OpalCredentials::Basic { username, password } => {
                let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
                ("Authorization", format!("Basic {encoded}"))
            }
            OpalCredentials::Token(token) => (OPAL_AUTH_HEADER, token.clone()),
        }
    }
}
