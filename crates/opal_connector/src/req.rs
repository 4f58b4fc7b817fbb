use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, IntoUrl, Url};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::auth::OpalCredentials;
use crate::errors::{OpalError, Result};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQ_ACCEPT: &str = "application/json";

#[derive(Debug, Default)]
pub struct OpalClientBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl OpalClientBuilder {
    #[allow(unused)]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[allow(unused)]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    pub fn build<U: IntoUrl>(
        self,
        base_url: U,
        credentials: OpalCredentials,
    ) -> Result<OpalClient> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(REQ_ACCEPT));

        let mut builder = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(default_headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build()?;
        Ok(OpalClient {
            base_url: base_url.into_url()?,
            credentials,
            inner: client,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OpalClient {
    base_url: Url,
    credentials: OpalCredentials,
    inner: Client,
}

impl OpalClient {
    pub fn builder() -> OpalClientBuilder {
        OpalClientBuilder::default()
    }

    /// Execute a GET against the given path and decode the JSON response.
    ///
    /// Non-success statuses are returned as errors carrying the response
    /// body, which is where opal puts its error message.
    pub async fn get_json<R>(&self, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            // The URL crate we use is from the "reqwest" crate which doesn't
            // expose the error and hence we cast it to a string.
            .map_err(|e| OpalError::UrlParseError(format!("{e}")))?;

        let (header_name, header_value) = self.credentials.header();
        let res = self
            .inner
            .get(url.clone())
            .header(header_name, header_value)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let message = res.text().await.unwrap_or_default();
            return Err(OpalError::HttpError { status, message });
        }

        let res = res.text().await?;
        trace!(%url, "opal response");

        let res: R = serde_json::from_str(&res)?;
        Ok(res)
    }
}
