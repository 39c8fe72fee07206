use reqwest::{blocking::Client, header::CONTENT_TYPE};

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// [`Transport`] backed by a blocking `reqwest` client. Safe to share
/// between threads; connections are pooled.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Protocol {
                url: String::new(),
                source: e.into(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().map_err(|e| classify(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| classify(&request.url, e))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }
}

fn classify(url: &str, e: reqwest::Error) -> TransportError {
    let url = url.to_string();
    if e.is_timeout() {
        TransportError::Timeout { url }
    } else if e.is_connect() {
        TransportError::Connect {
            url,
            source: e.into(),
        }
    } else {
        TransportError::Protocol {
            url,
            source: e.into(),
        }
    }
}
