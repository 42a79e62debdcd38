use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::platform::runtime::sleep as runtime_sleep;
use crate::platform::token::{NoopTokenProvider, TokenProviderArc};
use crate::util::BackoffConfig;

use super::connection::{Connection, ConnectionBuilder, RequestContext, Response};
use super::error::{internal_error, unauthenticated, GatewayErrorCode, GatewayResult};
use super::query::{Embed, Filter, FilterOp, SelectQuery};
use super::{RemoteGateway, Row};

const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";

/// PostgREST implementation of [`RemoteGateway`].
#[derive(Clone)]
pub struct RestGateway {
    connection: Connection,
    token_provider: TokenProviderArc,
    retry: RetrySettings,
}

#[derive(Clone)]
pub struct RestGatewayBuilder {
    connection_builder: ConnectionBuilder,
    token_provider: TokenProviderArc,
    retry: RetrySettings,
}

/// Timeout and retry policy for gateway requests.
///
/// Every request is bounded by `request_timeout`. Reads are retried up to
/// `max_attempts` in total on transient failures. Mutations are sent exactly
/// once: a delete whose first attempt committed would come back empty on retry.
#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub backoff: BackoffConfig,
    pub request_timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: BackoffConfig::default(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl RetrySettings {
    fn should_retry(&self, attempt: usize, code: &GatewayErrorCode) -> bool {
        if attempt + 1 >= self.max_attempts {
            return false;
        }
        matches!(
            code,
            GatewayErrorCode::Internal
                | GatewayErrorCode::Unavailable
                | GatewayErrorCode::DeadlineExceeded
        )
    }
}

impl RestGateway {
    /// `api_url` is the PostgREST root, e.g. `https://<project>.supabase.co/rest/v1`.
    pub fn builder(api_url: impl Into<String>, api_key: impl Into<String>) -> RestGatewayBuilder {
        RestGatewayBuilder {
            connection_builder: Connection::builder(api_url, api_key),
            token_provider: Arc::new(NoopTokenProvider),
            retry: RetrySettings::default(),
        }
    }

    async fn execute<F, Fut, T>(&self, idempotent: bool, mut operation: F) -> GatewayResult<T>
    where
        F: FnMut(RequestContext) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt = 0usize;
        loop {
            let context = self.request_context().await?;
            match operation(context).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if err.code == GatewayErrorCode::Unauthenticated {
                        self.token_provider.invalidate_token();
                    }
                    if !idempotent || !self.retry.should_retry(attempt, &err.code) {
                        return Err(err);
                    }
                    log::debug!("retrying gateway request after {err}");
                    runtime_sleep(self.retry.backoff.delay(attempt as u32)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn request_context(&self) -> GatewayResult<RequestContext> {
        let auth_token = self
            .token_provider
            .get_token()
            .await
            .map_err(|err| unauthenticated(err.to_string()))?;
        Ok(RequestContext {
            auth_token,
            prefer: None,
            request_timeout: Some(self.retry.request_timeout),
        })
    }

    async fn call(
        &self,
        idempotent: bool,
        method: Method,
        table: &str,
        params: Vec<(String, String)>,
        body: Option<Value>,
        prefer: Option<&str>,
    ) -> GatewayResult<Response> {
        self.execute(idempotent, |mut context| {
            context.prefer = prefer.map(str::to_owned);
            let method = method.clone();
            let params = params.clone();
            let body = body.clone();
            async move {
                self.connection
                    .invoke_json(method, table, &params, body, &context)
                    .await
            }
        })
        .await
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RemoteGateway for RestGateway {
    async fn select(&self, query: &SelectQuery) -> GatewayResult<Vec<Row>> {
        let params = encode_select(query);
        let response = self
            .call(true, Method::GET, query.table(), params, None, None)
            .await?;
        rows_from(response.body)
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> GatewayResult<u64> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filters.iter().map(|filter| encode_filter("", filter)));
        let response = self
            .call(true, Method::HEAD, table, params, None, Some(COUNT_EXACT))
            .await?;
        response
            .content_range
            .as_deref()
            .and_then(parse_content_range_total)
            .ok_or_else(|| internal_error("Count response is missing a Content-Range total"))
    }

    async fn insert(&self, table: &str, values: Row, returning: &[Embed]) -> GatewayResult<Row> {
        let mut params = vec![("select".to_string(), select_clause(&[], returning))];
        params.extend(embed_filters(returning));
        let response = self
            .call(
                false,
                Method::POST,
                table,
                params,
                Some(Value::Object(values)),
                Some(RETURN_REPRESENTATION),
            )
            .await?;
        rows_from(response.body)?
            .into_iter()
            .next()
            .ok_or_else(|| internal_error(format!("Insert into '{table}' returned no row")))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> GatewayResult<Vec<Row>> {
        let params = filters.iter().map(|filter| encode_filter("", filter)).collect();
        let response = self
            .call(
                false,
                Method::PATCH,
                table,
                params,
                Some(Value::Object(patch)),
                Some(RETURN_REPRESENTATION),
            )
            .await?;
        rows_from(response.body)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> GatewayResult<Vec<Row>> {
        let params = filters.iter().map(|filter| encode_filter("", filter)).collect();
        let response = self
            .call(
                false,
                Method::DELETE,
                table,
                params,
                None,
                Some(RETURN_REPRESENTATION),
            )
            .await?;
        rows_from(response.body)
    }
}

impl RestGatewayBuilder {
    pub fn with_token_provider(mut self, provider: TokenProviderArc) -> Self {
        self.token_provider = provider;
        self
    }

    pub fn with_retry_settings(mut self, settings: RetrySettings) -> Self {
        self.retry = settings;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.connection_builder = self.connection_builder.with_client(client);
        self
    }

    pub fn build(self) -> GatewayResult<RestGateway> {
        Ok(RestGateway {
            connection: self.connection_builder.build()?,
            token_provider: self.token_provider,
            retry: self.retry,
        })
    }
}

fn rows_from(body: Value) -> GatewayResult<Vec<Row>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(internal_error(format!("Expected a row object, got {other}"))),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        Value::Null => Ok(Vec::new()),
        other => Err(internal_error(format!("Unexpected gateway response: {other}"))),
    }
}

fn encode_select(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        select_clause(query.selected_columns(), query.embeds()),
    )];
    params.extend(query.filters().iter().map(|filter| encode_filter("", filter)));
    params.extend(embed_filters(query.embeds()));
    if !query.ordering().is_empty() {
        let order = query
            .ordering()
            .iter()
            .map(|order| format!("{}.{}", order.column, order.direction.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(offset) = query.offset_value() {
        params.push(("offset".to_string(), offset.to_string()));
    }
    if let Some(limit) = query.limit_value() {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn select_clause(columns: &[String], embeds: &[Embed]) -> String {
    let mut parts: Vec<String> = if columns.is_empty() {
        vec!["*".to_string()]
    } else {
        columns.to_vec()
    };
    for embed in embeds {
        parts.push(match embed {
            Embed::One {
                alias,
                table,
                local_column,
            } => format!("{alias}:{table}!{local_column}(*)"),
            Embed::Many {
                alias,
                table,
                foreign_column,
                columns,
                ..
            } => {
                let columns = if columns.is_empty() {
                    "*".to_string()
                } else {
                    columns.join(",")
                };
                format!("{alias}:{table}!{foreign_column}({columns})")
            }
            Embed::Count {
                alias,
                table,
                foreign_column,
            } => format!("{alias}:{table}!{foreign_column}(count)"),
        });
    }
    parts.join(",")
}

fn embed_filters(embeds: &[Embed]) -> Vec<(String, String)> {
    embeds
        .iter()
        .filter_map(|embed| match embed {
            Embed::Many { alias, filters, .. } => Some(
                filters
                    .iter()
                    .map(|filter| encode_filter(&format!("{alias}."), filter))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })
        .flatten()
        .collect()
}

fn encode_filter(prefix: &str, filter: &Filter) -> (String, String) {
    let value = match filter.op() {
        FilterOp::Eq(value) => format!("eq.{}", encode_value(value)),
        FilterOp::Neq(value) => format!("neq.{}", encode_value(value)),
        FilterOp::IsNull => "is.null".to_string(),
        FilterOp::NotNull => "not.is.null".to_string(),
        FilterOp::In(values) => format!(
            "in.({})",
            values
                .iter()
                .map(|value| quote_list_item(&encode_value(value)))
                .collect::<Vec<_>>()
                .join(",")
        ),
    };
    (format!("{prefix}{}", filter.column()), value)
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quote_list_item(item: &str) -> String {
    if item.contains([',', '(', ')', '"']) {
        format!("\"{}\"", item.replace('"', "\\\""))
    } else {
        item.to_string()
    }
}

fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}
