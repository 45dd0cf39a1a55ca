use std::fmt;

/// Error category shared by every [`ConcurrentLimiterError`](crate::ConcurrentLimiterError).
pub const ERR_CATEGORY: &str = "concurrent-limiter";

/// Separator placed between resolved key-source values in a lock key.
pub const KEY_SEPARATOR: char = ',';

pub(crate) const CLIENT_IP_KEY: &str = ":ip";
pub(crate) const HEADER_PREFIX: &str = "h:";
pub(crate) const QUERY_PREFIX: &str = "q:";
pub(crate) const PARAM_PREFIX: &str = "p:";

/// One configured component of a lock key.
///
/// Parsed from a raw configuration string:
///
/// | raw            | source                      |
/// |----------------|-----------------------------|
/// | `:ip`          | [`KeySource::ClientIp`]     |
/// | `h:<name>`     | [`KeySource::Header`]       |
/// | `q:<name>`     | [`KeySource::Query`]        |
/// | `p:<name>`     | [`KeySource::Param`]        |
/// | anything else  | [`KeySource::Body`]         |
///
/// Unrecognized strings are never rejected; they name a field of a JSON body.
///
/// ```
/// use concurrent_limiter::KeySource;
///
/// assert_eq!(KeySource::parse(":ip"), KeySource::ClientIp);
/// assert_eq!(KeySource::parse("h:X-Token"), KeySource::Header("X-Token".into()));
/// assert_eq!(KeySource::parse("account"), KeySource::Body("account".into()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// Resolved client IP address.
    ClientIp,
    /// Value of the named request header.
    Header(String),
    /// Value of the named query parameter.
    Query(String),
    /// Value of the named path parameter.
    Param(String),
    /// Top-level field of the request body, read as JSON.
    Body(String),
}

impl KeySource {
    /// Parse a raw configuration string.
    pub fn parse(raw: &str) -> Self {
        if raw == CLIENT_IP_KEY {
            return Self::ClientIp;
        }

        if let Some(name) = raw.strip_prefix(HEADER_PREFIX) {
            Self::Header(name.to_string())
        } else if let Some(name) = raw.strip_prefix(QUERY_PREFIX) {
            Self::Query(name.to_string())
        } else if let Some(name) = raw.strip_prefix(PARAM_PREFIX) {
            Self::Param(name.to_string())
        } else {
            Self::Body(raw.to_string())
        }
    } // end method parse

    /// Parse an ordered list of raw configuration strings, preserving order.
    pub fn parse_all<I, S>(raw: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter().map(|s| Self::parse(s.as_ref())).collect()
    }
}

impl From<&str> for KeySource {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientIp => f.write_str(CLIENT_IP_KEY),
            Self::Header(name) => write!(f, "{HEADER_PREFIX}{name}"),
            Self::Query(name) => write!(f, "{QUERY_PREFIX}{name}"),
            Self::Param(name) => write!(f, "{PARAM_PREFIX}{name}"),
            Self::Body(field) => f.write_str(field),
        }
    }
}
