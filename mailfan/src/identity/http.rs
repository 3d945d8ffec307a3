//! HTTP transport for token-endpoint requests
//!
//! The OAuth flow must not follow redirects: a redirecting token endpoint
//! is an SSRF vector. This shim hands `oauth2`'s request type to `reqwest`
//! with redirects disabled and converts the response back.

use oauth2::{HttpRequest, HttpResponse};

/// Errors from the token-endpoint transport
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// The request could not be sent or the response body read
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream response could not be reassembled
    #[error("malformed response: {0}")]
    Response(#[from] http::Error),
}

/// Send one token-endpoint request, following no redirects
pub(crate) async fn send_token_request(request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let (parts, body) = request.into_parts();
    let upstream = client
        .request(parts.method, parts.uri.to_string())
        .headers(parts.headers)
        .body(body)
        .send()
        .await?;

    let mut response = http::Response::builder().status(upstream.status());
    if let Some(headers) = response.headers_mut() {
        headers.extend(upstream.headers().clone());
    }
    let body = upstream.bytes().await?.to_vec();
    Ok(response.body(body)?)
}
