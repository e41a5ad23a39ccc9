//! Purpose: Fetch JSON documents over HTTP for link-following navigation.
//! Exports: `Transport`, `HttpTransport`.
//! Role: The seam between record decoding and the network; pages replay the
//! server's opaque links through this trait and never build URLs themselves.
//! Invariants: Transport failures surface as `ErrorKind::Transport`; the body
//! of a non-2xx response is never silently decoded as data.

use serde_json::Value;
use url::Url;

use crate::core::error::{Error, ErrorKind};

/// Issues a GET for a server-supplied link and returns the parsed JSON body.
/// Implemented by the bundled HTTP client and by in-memory fakes in tests.
pub trait Transport {
    fn get(&self, url: &Url) -> Result<Value, Error>;
}

/// The bundled blocking HTTP transport.
pub struct HttpTransport {
    agent: ureq::Agent,
    client_name: String,
    client_version: String,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Overrides the client identification headers sent with every request.
    pub fn with_client(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<Value, Error> {
        tracing::debug!(url = %url, "fetching page");
        let response = self
            .agent
            .request("GET", url.as_str())
            .set("Accept", "application/json")
            .set("X-Client-Name", &self.client_name)
            .set("X-Client-Version", &self.client_version)
            .call();
        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::new(ErrorKind::Transport)
                    .with_message(format!("server returned status {code}")));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Transport)
                    .with_message("request failed")
                    .with_source(err));
            }
        };
        let body = response.into_string().map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message("failed to read response body")
                .with_source(err)
        })?;
        serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message("response body is not valid json")
                .with_source(err)
        })
    }
}
