use std::{sync::Arc, time::Duration};

use log::{error, warn};

use crate::{
    auth::{AuthError, CredentialCache},
    client::QueryError,
    transport::{HttpRequest, HttpResponse, Method, Transport},
};

pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Sends requests to the store, attaching a token when credentials are
/// configured. A rejected token is refreshed and the request retried once.
pub struct Session {
    transport: Arc<dyn Transport>,
    credentials: Option<Arc<CredentialCache>>,
    timeout: Duration,
}

impl Session {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Option<Arc<CredentialCache>>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            credentials,
            timeout,
        }
    }

    pub fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, QueryError> {
        let credentials = match &self.credentials {
            Some(credentials) => credentials,
            None => return Ok(self.transport.send(&self.request(method, url, body, None))?),
        };

        let token = credentials.ensure_valid()?;
        let response = self
            .transport
            .send(&self.request(method, url, body.clone(), Some(&token)))?;
        if !response.is_rejection() {
            return Ok(response);
        }

        warn!("store rejected token for {}, refreshing", url);
        credentials.invalidate(&token)?;
        let token = credentials.ensure_valid()?;
        let response = self
            .transport
            .send(&self.request(method, url, body, Some(&token)))?;
        if response.is_rejection() {
            error!("store rejected refreshed token for {}", url);
            return Err(AuthError::Rejected.into());
        }
        Ok(response)
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> HttpRequest {
        let headers = match token {
            Some(token) => vec![(AUTH_HEADER.to_string(), token.to_string())],
            None => vec![],
        };
        HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
            timeout: self.timeout,
        }
    }
}
