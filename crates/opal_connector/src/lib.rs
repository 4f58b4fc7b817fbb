use std::time::Duration;

pub use crate::auth::OpalCredentials;
use crate::errors::{OpalError, Result};
use crate::models::{OpalDatasource, OpalVariable, PluginPackages, Taxonomy, ValueSets};
use crate::req::OpalClient;

mod auth;
mod req;

pub mod errors;
pub mod models;

#[derive(Debug)]
pub struct ConnectionBuilder {
    url: String,

    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

macro_rules! builder_fn {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, $name: $ty) -> Self {
            self.$name = Some($name);
            self
        }
    };
}

impl ConnectionBuilder {
    builder_fn! {username, String}

    builder_fn! {password, String}

    builder_fn! {token, String}

    builder_fn! {timeout, Duration}

    builder_fn! {connect_timeout, Duration}

    pub fn new(url: String) -> Self {
        Self {
            url,

            username: None,
            password: None,
            token: None,
            timeout: None,
            connect_timeout: None,
        }
    }

    pub fn build(self) -> Result<Connection> {
        if self.url.is_empty() {
            return Err(OpalError::InvalidConnectionParameters(
                "url cannot be empty".to_string(),
            ));
        }

        let credentials = match (self.token, self.username) {
            (Some(token), _) => OpalCredentials::Token(token),
            (None, Some(username)) => {
                let password = self
                    .password
                    .ok_or(OpalError::InvalidConnectionParameters(
                        "password is required for basic authentication".to_string(),
                    ))?;
                OpalCredentials::Basic { username, password }
            }
            (None, None) => {
                return Err(OpalError::InvalidConnectionParameters(
                    "either a token or a username is required".to_string(),
                ))
            }
        };

        let mut client = OpalClient::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            client = client.connect_timeout(connect_timeout);
        }
        let client = client.build(&self.url, credentials)?;

        Ok(Connection { client })
    }
}

/// An authenticated connection to an opal server, exposing the REST
/// endpoints the datasource needs as typed calls.
#[derive(Debug, Clone)]
pub struct Connection {
    client: OpalClient,
}

impl Connection {
    pub fn builder(url: String) -> ConnectionBuilder {
        ConnectionBuilder::new(url)
    }

    /// List the datasources published by the server, with their table names.
    pub async fn list_datasources(&self) -> Result<Vec<OpalDatasource>> {
        self.client.get_json("/ws/datasources").await
    }

    /// Variable metadata for one table of a datasource.
    pub async fn table_variables(
        &self,
        datasource: &str,
        table: &str,
    ) -> Result<Vec<OpalVariable>> {
        self.client
            .get_json(&format!("/ws/datasource/{datasource}/table/{table}/variables"))
            .await
    }

    /// Value sets (rows) for one table of a datasource.
    pub async fn table_value_sets(&self, datasource: &str, table: &str) -> Result<ValueSets> {
        self.client
            .get_json(&format!("/ws/datasource/{datasource}/table/{table}/valueSets"))
            .await
    }

    /// The taxonomy/vocabulary/term tree from the system configuration.
    pub async fn taxonomies(&self) -> Result<Vec<Taxonomy>> {
        self.client.get_json("/ws/system/conf/taxonomies").await
    }

    /// Plugin packages installed on the server.
    pub async fn plugins(&self) -> Result<PluginPackages> {
        self.client.get_json("/ws/plugins").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_credentials() {
        let err = ConnectionBuilder::new("https://opal.example.org".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, OpalError::InvalidConnectionParameters(_)));

        let err = ConnectionBuilder::new("https://opal.example.org".to_string())
            .username("administrator".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, OpalError::InvalidConnectionParameters(_)));
    }

    #[test]
    fn build_with_basic_auth() {
        let conn = ConnectionBuilder::new("https://opal.example.org".to_string())
            .username("administrator".to_string())
            .password("password".to_string())
            .build();
        assert!(conn.is_ok());
    }

    #[test]
    fn build_with_token() {
        let conn = ConnectionBuilder::new("https://opal.example.org".to_string())
            .token("abc123".to_string())
            .build();
        assert!(conn.is_ok());
    }

    #[test]
    fn build_rejects_empty_url() {
        let err = ConnectionBuilder::new(String::new())
            .token("abc123".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, OpalError::InvalidConnectionParameters(_)));
    }
}
