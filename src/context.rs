use std::{borrow::Cow, collections::HashMap, net::SocketAddr};

use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue,
    header::{HeaderName, IntoHeaderName},
    request::Parts,
};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Read access to an inbound request, already parsed by the host framework.
///
/// Every lookup is optional; the key builder substitutes an empty string for
/// anything missing.
pub trait RequestContext {
    /// Resolved client IP address, or an empty string when unknown.
    fn client_ip(&self) -> Cow<'_, str>;

    /// First value of the named header, if present and valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;

    /// Value of the named query parameter.
    fn query(&self, name: &str) -> Option<&str>;

    /// Value of the named path parameter.
    fn param(&self, name: &str) -> Option<&str>;

    /// Raw request body.
    fn body(&self) -> &[u8];
}

/// Owned snapshot of the request attributes the limiter reads.
///
/// ```
/// use http::HeaderValue;
/// use concurrent_limiter::{RequestContext, RequestSnapshot};
///
/// let ctx = RequestSnapshot::new()
///     .with_remote_addr("192.0.2.1:4000".parse().unwrap())
///     .with_header("x-token", HeaderValue::from_static("xyz"))
///     .with_query("type", "1")
///     .with_param("id", "123")
///     .with_body(r#"{"account":"tree.xie"}"#);
///
/// assert_eq!(ctx.client_ip(), "192.0.2.1");
/// assert_eq!(ctx.header("X-Token"), Some("xyz"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestSnapshot {
    remote_addr: Option<SocketAddr>,
    headers: HeaderMap,
    query: HashMap<String, String>,
    params: HashMap<String, String>,
    body: Bytes,
}

impl RequestSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from request head parts.
    ///
    /// The URI query string is decoded as `application/x-www-form-urlencoded`;
    /// for repeated names the last value wins. Path parameters come from the
    /// router and are added with [`RequestSnapshot::with_param`].
    pub fn from_parts(parts: &Parts, remote_addr: Option<SocketAddr>, body: Bytes) -> Self {
        let mut query = HashMap::new();
        if let Some(raw_query) = parts.uri.query() {
            for (k, v) in url::form_urlencoded::parse(raw_query.as_bytes()) {
                query.insert(k.into_owned(), v.into_owned());
            }
        }

        Self {
            remote_addr,
            headers: parts.headers.clone(),
            query,
            params: HashMap::new(),
            body,
        }
    } // end constructor from_parts

    /// Set the peer address of the connection.
    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    /// Append a header value.
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Set a path parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Replace all path parameters.
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Peer address of the connection.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Mutable path parameters.
    pub fn params_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.params
    }
}

impl RequestContext for RequestSnapshot {
    /// First non-empty `X-Forwarded-For` entry, then `X-Real-Ip`, then the
    /// peer address.
    fn client_ip(&self) -> Cow<'_, str> {
        let forwarded = self
            .headers
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').map(str::trim).find(|ip| !ip.is_empty()));
        if let Some(ip) = forwarded {
            return Cow::Borrowed(ip);
        }

        if let Some(ip) = self
            .headers
            .get(&X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            && !ip.is_empty()
        {
            return Cow::Borrowed(ip);
        }

        match self.remote_addr {
            Some(addr) => Cow::Owned(addr.ip().to_string()),
            None => Cow::Borrowed(""),
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}
