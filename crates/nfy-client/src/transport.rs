//! Transport boundary: "perform this HTTP request".
//!
//! The client builds requests without credentials. Authentication and the
//! `User-Agent` header are attached by the [`Transport`] implementation, so
//! the protocol code never sees secrets.

use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Request, RequestBuilder, Response};

/// Executes one HTTP request.
///
/// Implementations must be `Send + Sync`: a single transport is shared by all
/// concurrent submissions of a [`crate::Client`]. Any connection pooling is the
/// implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: Request) -> Result<Response, reqwest::Error>;
}

/// Plain `reqwest` client, no credentials added.
#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, req: Request) -> Result<Response, reqwest::Error> {
        reqwest::Client::execute(self, req).await
    }
}

/// `User-Agent` value sent on behalf of the source named `client_name`.
pub fn user_agent(client_name: &str) -> String {
    format!("{client_name} nfy-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Adds HTTP basic credentials and a fixed `User-Agent` to every request.
///
/// **The password is redacted in `Debug` output.**
#[derive(Clone)]
pub struct BasicAuthTransport {
    http: reqwest::Client,
    username: String,
    password: String,
    user_agent: String,
}

impl fmt::Debug for BasicAuthTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthTransport")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl BasicAuthTransport {
    /// Transport over a fresh `reqwest` client with default settings.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client_name: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build http client")?;
        Ok(Self::with_http(http, username, password, client_name))
    }

    /// Transport over a caller-configured `reqwest` client (timeouts, pool
    /// limits, proxies, TLS roots).
    pub fn with_http(
        http: reqwest::Client,
        username: impl Into<String>,
        password: impl Into<String>,
        client_name: &str,
    ) -> Self {
        Self {
            http,
            username: username.into(),
            password: password.into(),
            user_agent: user_agent(client_name),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[async_trait]
impl Transport for BasicAuthTransport {
    async fn execute(&self, req: Request) -> Result<Response, reqwest::Error> {
        RequestBuilder::from_parts(self.http.clone(), req)
            .basic_auth(&self.username, Some(&self.password))
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
    }
}
