use std::{collections::HashMap, fmt};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use serde_json::value::RawValue;

use crate::{KEY_SEPARATOR, KeySource, RequestContext};

/// Builds the lock key for a request from an ordered list of [`KeySource`]s.
///
/// Each source resolves to a string (missing values resolve to `""`) and the
/// results are joined with [`KEY_SEPARATOR`] in configuration order. Building
/// never fails, and identical inputs always give identical keys.
///
/// Source order is part of the key format: two deployments sharing a lock
/// backend must list their sources in the same order, or they lock disjoint
/// key spaces.
///
/// ```
/// use http::HeaderValue;
/// use concurrent_limiter::{LockKeyBuilder, RequestSnapshot};
///
/// let builder = LockKeyBuilder::new([":ip", "h:X-Token", "q:type", "p:id", "account"]);
/// let ctx = RequestSnapshot::new()
///     .with_remote_addr("192.0.2.1:4000".parse().unwrap())
///     .with_header("x-token", HeaderValue::from_static("xyz"))
///     .with_query("type", "1")
///     .with_param("id", "123")
///     .with_body(r#"{"account":"tree.xie"}"#);
///
/// assert_eq!(builder.build(&ctx), "192.0.2.1,xyz,1,123,tree.xie");
/// ```
#[derive(Clone, Debug, Default)]
pub struct LockKeyBuilder {
    sources: Vec<KeySource>,
    reads_body: bool,
}

impl LockKeyBuilder {
    /// Parse raw key-source strings into a builder.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_sources(KeySource::parse_all(keys))
    }

    /// Create a builder from already parsed sources.
    pub fn from_sources(sources: Vec<KeySource>) -> Self {
        let reads_body = sources.iter().any(|s| matches!(s, KeySource::Body(_)));

        Self {
            sources,
            reads_body,
        }
    }

    /// Configured sources, in key order.
    pub fn sources(&self) -> &[KeySource] {
        &self.sources
    }

    /// Resolve every source against `ctx` and join the values.
    pub fn build<C: RequestContext + ?Sized>(&self, ctx: &C) -> String {
        // The body is decoded once, and only when a body field is configured.
        let body = if self.reads_body {
            serde_json::from_slice::<BodyFields<'_>>(ctx.body()).ok()
        } else {
            None
        };

        let mut key = String::with_capacity(8 * self.sources.len());

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }

            match source {
                KeySource::ClientIp => key.push_str(&ctx.client_ip()),
                KeySource::Header(name) => key.push_str(ctx.header(name).unwrap_or_default()),
                KeySource::Query(name) => key.push_str(ctx.query(name).unwrap_or_default()),
                KeySource::Param(name) => key.push_str(ctx.param(name).unwrap_or_default()),
                KeySource::Body(field) => push_body_field(&mut key, body.as_ref(), field),
            }
        }

        key
    } // end method build
}

/// Top-level fields of a JSON object body, kept as their source text.
///
/// The first occurrence of a repeated field wins.
struct BodyFields<'a>(HashMap<String, &'a RawValue>);

impl<'de> Deserialize<'de> for BodyFields<'de> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = BodyFields<'de>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = HashMap::new();
                while let Some((name, value)) = map.next_entry::<String, &'de RawValue>()? {
                    fields.entry(name).or_insert(value);
                }

                Ok(BodyFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Strings are pushed unquoted, `null` as nothing, anything else as its
/// original JSON text.
fn push_body_field(key: &mut String, body: Option<&BodyFields<'_>>, field: &str) {
    let Some(raw) = body.and_then(|body| body.0.get(field)) else {
        return;
    };

    let text = raw.get();
    if text == "null" {
        return;
    }

    if text.starts_with('"') {
        if let Ok(s) = serde_json::from_str::<String>(text) {
            key.push_str(&s);
        }
    } else {
        key.push_str(text);
    }
}
