//! `FetchTransport` over an async `reqwest::Client`.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use super::{encode_form, FetchTransport};
use crate::error::TransportError;
use crate::http::{Body, BoxFuture, HttpResponse};
use crate::options::RequestOptions;

/// Sends requests with `reqwest`.
///
/// The `credentials` option has no effect here: reqwest applies no browser
/// cookie policy, so every request is effectively credentialed when the
/// client carries a cookie store.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: Client,
}

impl ReqwestFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn network(err: impl std::fmt::Display) -> TransportError {
    TransportError::Network(err.to_string())
}

impl FetchTransport for ReqwestFetch {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let method = Method::from_bytes(options.method_str().to_uppercase().as_bytes()).map_err(network)?;
            let mut builder = self.client.request(method, url);
            for (name, value) in options.string_headers() {
                builder = builder.header(name, value);
            }

            let has_content_type = options
                .string_headers()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
            builder = match options.body_ref() {
                None => builder,
                Some(Body::Text(text)) => builder.body(text.clone()),
                Some(Body::Bytes(bytes)) => builder.body(bytes.clone()),
                Some(Body::Form(fields)) => {
                    let builder = if has_content_type {
                        builder
                    } else {
                        builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    };
                    builder.body(encode_form(fields))
                }
                Some(Body::Stream(stream)) => {
                    let stream = stream.clone();
                    let bytes = tokio::task::spawn_blocking(move || stream.read_all())
                        .await
                        .map_err(network)?
                        .map_err(network)?;
                    builder.body(Bytes::from(bytes))
                }
            };

            let response = builder.send().await.map_err(network)?;
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();
            let body = response.bytes().await.map_err(network)?;

            tracing::debug!(status, url = %final_url, "fetch completed");
            Ok(HttpResponse {
                status,
                url: final_url,
                headers,
                body,
            })
        })
    }
}
