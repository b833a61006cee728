use std::fmt;

/// An `a=` line: a key and an optional value (`a=key` or `a=key:value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    key: String,
    value: Option<String>,
}

impl Attribute {
    /// Creates an attribute.
    ///
    /// # Parameters
    /// - `key`: the name before the colon, e.g. `"mid"`.
    /// - `value`: the text after the colon, or `None` for a flag.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::sdp::attribute::Attribute;
    ///
    /// let mid = Attribute::new("mid", Some("0".to_owned()));
    /// assert_eq!(mid.to_string(), "mid:0");
    /// assert_eq!(Attribute::flag("rtcp-mux").to_string(), "rtcp-mux");
    /// ```
    pub fn new<K: Into<String>, V: Into<Option<String>>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Property attribute without a value, e.g. `a=rtcp-mux`.
    pub fn flag<K: Into<String>>(key: K) -> Self {
        Self::new(key, None)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Parses the part after `a=`. Whitespace around key and value is
    /// dropped; everything after the first colon is the value.
    #[must_use]
    pub fn parse(rest: &str) -> Self {
        match rest.split_once(':') {
            Some((k, v)) => Self::new(k.trim(), Some(v.trim().to_owned())),
            None => Self::flag(rest.trim()),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}:{}", self.key, v),
            None => f.write_str(&self.key),
        }
    }
}
