//! Exchange engine options, settable by name.
//!
//! Names follow the engine's public vocabulary (`connectTimeout`,
//! `followLocation`, ...) and are matched case-insensitively. Typed access
//! goes through the fields of [`ClientOptions`] directly.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::HttpError;

/// Default `User-Agent` header sent by engines that honour [`ClientOptions`].
pub const USER_AGENT: &str = concat!("syncline-http/", env!("CARGO_PKG_VERSION"));

/// A dynamically typed option value for [`ClientOptions::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Duration(Duration),
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<Duration> for OptionValue {
    fn from(v: Duration) -> Self {
        OptionValue::Duration(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{v}"),
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Duration(v) => write!(f, "{v:?}"),
            OptionValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Options understood by exchange engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// How long an idle keep-alive connection is retained.
    pub keep_alive_timeout: Duration,
    /// Follow `Location` headers on 3xx responses.
    pub follow_location: bool,
    /// Add a `Referer` header when following redirects.
    pub auto_referer: bool,
    /// Maximum simultaneous connections. -1 = unlimited.
    pub max_connections: i64,
    /// Maximum simultaneous connections to one host.
    pub max_connections_per_host: i64,
    /// How long to wait for `100 Continue` before sending the body anyway.
    pub continue_delay: Duration,
    /// Buffer the full response body before completing.
    pub buffer_body: bool,
    /// Read/write chunk size in bytes.
    pub io_granularity: i64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            keep_alive_timeout: Duration::from_secs(30),
            follow_location: true,
            auto_referer: true,
            max_connections: -1,
            max_connections_per_host: 8,
            continue_delay: Duration::from_secs(3),
            buffer_body: true,
            io_granularity: 65536,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Known option names, in their canonical spelling.
const NAMES: [&str; 10] = [
    "connectTimeout",
    "keepAliveTimeout",
    "followLocation",
    "autoReferer",
    "maxConnections",
    "maxConnectionsPerHost",
    "continueDelay",
    "bufferBody",
    "ioGranularity",
    "userAgent",
];

impl ClientOptions {
    /// Validate option values. Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), HttpError> {
        if self.max_connections == 0 || self.max_connections < -1 {
            return Err(invalid("maxConnections", "must be -1 or > 0"));
        }
        if self.max_connections_per_host <= 0 {
            return Err(invalid("maxConnectionsPerHost", "must be > 0"));
        }
        if self.io_granularity <= 0 {
            return Err(invalid("ioGranularity", "must be > 0"));
        }
        if self.user_agent.is_empty() {
            return Err(invalid("userAgent", "must not be empty"));
        }
        Ok(())
    }

    /// Set one option by name.
    ///
    /// The options are left unchanged if the name is unknown or the value is
    /// rejected.
    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<(), HttpError> {
        let mut next = self.clone();
        next.apply(name, value)?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Set several options at once. Either every entry is applied or none is.
    /// An empty map is a no-op.
    pub fn set_all(&mut self, options: HashMap<String, OptionValue>) -> Result<(), HttpError> {
        if options.is_empty() {
            return Ok(());
        }
        let mut next = self.clone();
        for (name, value) in options {
            next.apply(&name, value)?;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn apply(&mut self, name: &str, value: OptionValue) -> Result<(), HttpError> {
        let canonical = NAMES
            .iter()
            .copied()
            .find(|n| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| HttpError::UnknownOption(name.to_string()))?;

        match canonical {
            "connectTimeout" => self.connect_timeout = duration(canonical, value)?,
            "keepAliveTimeout" => self.keep_alive_timeout = duration(canonical, value)?,
            "followLocation" => self.follow_location = boolean(canonical, value)?,
            "autoReferer" => self.auto_referer = boolean(canonical, value)?,
            "maxConnections" => self.max_connections = int(canonical, value)?,
            "maxConnectionsPerHost" => self.max_connections_per_host = int(canonical, value)?,
            "continueDelay" => self.continue_delay = duration(canonical, value)?,
            "bufferBody" => self.buffer_body = boolean(canonical, value)?,
            "ioGranularity" => self.io_granularity = int(canonical, value)?,
            "userAgent" => self.user_agent = string(canonical, value)?,
            _ => return Err(HttpError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> HttpError {
    HttpError::InvalidOption {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn boolean(name: &str, value: OptionValue) -> Result<bool, HttpError> {
    match value {
        OptionValue::Bool(v) => Ok(v),
        other => Err(invalid(name, format!("expected bool, got {other}"))),
    }
}

fn int(name: &str, value: OptionValue) -> Result<i64, HttpError> {
    match value {
        OptionValue::Int(v) => Ok(v),
        other => Err(invalid(name, format!("expected integer, got {other}"))),
    }
}

/// Durations also accept whole seconds as an integer.
fn duration(name: &str, value: OptionValue) -> Result<Duration, HttpError> {
    match value {
        OptionValue::Duration(v) => Ok(v),
        OptionValue::Int(secs) if secs >= 0 => Ok(Duration::from_secs(secs.unsigned_abs())),
        other => Err(invalid(name, format!("expected duration, got {other}"))),
    }
}

fn string(name: &str, value: OptionValue) -> Result<String, HttpError> {
    match value {
        OptionValue::Str(v) => Ok(v),
        other => Err(invalid(name, format!("expected string, got {other}"))),
    }
}

/// Builder for [`ClientOptions`] with `build()` validation.
///
/// ```rust
/// use std::time::Duration;
/// use syncline_http::ClientOptionsBuilder;
///
/// let options = ClientOptionsBuilder::new()
///     .connect_timeout(Duration::from_secs(5))
///     .follow_location(false)
///     .build()
///     .expect("invalid options");
/// assert!(!options.follow_location);
/// ```
#[derive(Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Create a new builder with default option values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set the keep-alive timeout.
    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.options.keep_alive_timeout = timeout;
        self
    }

    /// Enable or disable redirect following.
    pub fn follow_location(mut self, enable: bool) -> Self {
        self.options.follow_location = enable;
        self
    }

    /// Set connection limits. -1 total = unlimited.
    pub fn max_connections(mut self, total: i64, per_host: i64) -> Self {
        self.options.max_connections = total;
        self.options.max_connections_per_host = per_host;
        self
    }

    /// Set the `User-Agent` header value.
    pub fn user_agent(mut self, agent: &str) -> Self {
        self.options.user_agent = agent.to_string();
        self
    }

    /// Validate and build the final [`ClientOptions`].
    pub fn build(self) -> Result<ClientOptions, HttpError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ClientOptions::default().validate().is_ok());
    }

    #[test]
    fn set_by_name_is_case_insensitive() {
        let mut options = ClientOptions::default();
        options.set("FOLLOWLOCATION", false.into()).unwrap();
        options.set("connecttimeout", Duration::from_secs(2).into()).unwrap();
        options.set("userAgent", "syncline-test/1.0".into()).unwrap();
        assert!(!options.follow_location);
        assert_eq!(options.connect_timeout, Duration::from_secs(2));
        assert_eq!(options.user_agent, "syncline-test/1.0");
    }

    #[test]
    fn integer_seconds_accepted_for_durations() {
        let mut options = ClientOptions::default();
        options.set("keepAliveTimeout", 5.into()).unwrap();
        assert_eq!(options.keep_alive_timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_name_rejected() {
        let mut options = ClientOptions::default();
        let err = options.set("bogus", true.into()).unwrap_err();
        assert!(matches!(err, HttpError::UnknownOption(name) if name == "bogus"));
    }

    #[test]
    fn wrong_type_leaves_options_unchanged() {
        let mut options = ClientOptions::default();
        let err = options.set("bufferBody", 1.into()).unwrap_err();
        assert!(matches!(err, HttpError::InvalidOption { .. }));
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn out_of_range_rejected() {
        let mut options = ClientOptions::default();
        assert!(options.set("maxConnections", 0.into()).is_err());
        assert!(options.set("ioGranularity", (-4).into()).is_err());
        assert_eq!(options, ClientOptions::default());
        options.set("maxConnections", 16.into()).unwrap();
        assert_eq!(options.max_connections, 16);
    }

    #[test]
    fn set_all_is_all_or_nothing() {
        let mut options = ClientOptions::default();
        let mut batch = HashMap::new();
        batch.insert("followLocation".to_string(), false.into());
        batch.insert("nope".to_string(), true.into());
        assert!(options.set_all(batch).is_err());
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn set_all_empty_is_noop() {
        let mut options = ClientOptions::default();
        options.set_all(HashMap::new()).unwrap();
        assert_eq!(options, ClientOptions::default());
    }
}
