use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value as JsonValue;

use super::error::{
    deadline_exceeded, internal_error, invalid_argument, unavailable, GatewayError, GatewayResult,
};
use super::rpc_error::map_http_error;

/// Characters escaped in query values. PostgREST operators such as `eq.`,
/// `in.(a,b)` and `created_at.desc` stay readable.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// HTTP transport shared by the REST adapters (data, auth and storage).
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    base_url: String,
    api_key: String,
    client: Option<Client>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub prefer: Option<String>,
    pub request_timeout: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub body: JsonValue,
    pub content_range: Option<String>,
}

impl ConnectionBuilder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> GatewayResult<Connection> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|err| invalid_argument(format!("Invalid API url '{}': {err}", self.base_url)))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid_argument(format!(
                "API url '{}' cannot be used as a base",
                self.base_url
            )));
        }
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        Ok(Connection {
            client,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            api_key: self.api_key,
        })
    }
}

impl Connection {
    pub fn builder(base_url: impl Into<String>, api_key: impl Into<String>) -> ConnectionBuilder {
        ConnectionBuilder::new(base_url, api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub async fn invoke_json(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<JsonValue>,
        context: &RequestContext,
    ) -> GatewayResult<Response> {
        let mut request = self.build_request(method, path, params, context);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    pub async fn invoke_bytes(
        &self,
        method: Method,
        path: &str,
        content_type: &str,
        bytes: bytes::Bytes,
        context: &RequestContext,
    ) -> GatewayResult<Response> {
        let request = self
            .build_request(method, path, &[], context)
            .header("Content-Type", content_type)
            .body(bytes);
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let text = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            log::debug!("request failed with status {status}: {text}");
            return Err(map_http_error(status, &text));
        }
        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).map_err(|err| internal_error(err.to_string()))?
        };
        Ok(Response {
            body,
            content_range,
        })
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        context: &RequestContext,
    ) -> RequestBuilder {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(key, value)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(key, QUERY_VALUE),
                        utf8_percent_encode(value, QUERY_VALUE)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }

        let mut builder = self.client.request(method, url);
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Some(timeout) = context.request_timeout {
                builder = builder.timeout(timeout);
            }
        }
        builder = builder.header("apikey", self.api_key.as_str());
        let bearer = context.auth_token.as_deref().unwrap_or(self.api_key.as_str());
        builder = builder.bearer_auth(bearer);
        if let Some(prefer) = context.prefer.as_deref() {
            builder = builder.header("Prefer", prefer);
        }
        builder
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return deadline_exceeded(err.to_string());
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return unavailable(err.to_string());
        }
    }
    if err.is_request() {
        unavailable(err.to_string())
    } else {
        internal_error(err.to_string())
    }
}
