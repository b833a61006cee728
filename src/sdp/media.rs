use std::fmt::{self, Write as _};

use crate::sdp::{attribute::Attribute, connection::Connection, sdp_error::SdpError};

/// Media type of an `m=` line.
///
/// Standard values are `Audio`, `Video`, `Text`, `Application` and `Message`;
/// anything else is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Text,
    Application,
    Message,
    Other(String),
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
            Self::Text => f.write_str("text"),
            Self::Application => f.write_str("application"),
            Self::Message => f.write_str("message"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MediaKind {
    fn from(s: &str) -> Self {
        match s {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "text" => Self::Text,
            "application" => Self::Application,
            "message" => Self::Message,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A media description: the `m=` line plus the `c=`/`a=` lines under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    kind: MediaKind,
    /// Port `0` marks a rejected or disabled section.
    port: u16,
    /// Transport protocol, e.g. `"UDP/TLS/RTP/SAVPF"`.
    proto: String,
    /// Payload format tokens.
    fmts: Vec<String>,
    connection: Option<Connection>,
    attrs: Vec<Attribute>,
    /// Unknown lines, kept for round-trip.
    extra_lines: Vec<String>,
}

impl Media {
    /// Creates a media description without connection or attribute lines.
    ///
    /// # Parameters
    /// - `kind`: media type of the `m=` line.
    /// - `port`: transport port, `0` to reject the section.
    /// - `proto`: transport protocol, e.g. `"UDP/TLS/RTP/SAVPF"`.
    /// - `fmts`: payload format tokens in preference order.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::sdp::{attribute::Attribute, media::{Media, MediaKind}};
    ///
    /// let mut m = Media::new(MediaKind::Audio, 9, "UDP/TLS/RTP/SAVPF", vec!["111".into()]);
    /// m.add_attr(Attribute::new("mid", Some("0".to_owned())));
    /// let mut text = String::new();
    /// m.write_lines(&mut text);
    /// assert_eq!(text, "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=mid:0\r\n");
    /// ```
    pub fn new(kind: MediaKind, port: u16, proto: impl Into<String>, fmts: Vec<String>) -> Self {
        Self {
            kind,
            port,
            proto: proto.into(),
            fmts,
            connection: None,
            attrs: Vec::new(),
            extra_lines: Vec::new(),
        }
    }

    pub const fn kind(&self) -> &MediaKind {
        &self.kind
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn proto(&self) -> &str {
        &self.proto
    }

    pub fn fmts(&self) -> &[String] {
        &self.fmts
    }

    pub const fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    pub fn extra_lines(&self) -> &[String] {
        &self.extra_lines
    }

    /// Replaces the section level `c=` line.
    pub fn set_connection(&mut self, connection: Option<Connection>) {
        self.connection = connection;
    }

    /// Appends an `a=` line; attributes keep insertion order.
    pub fn add_attr(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    pub fn add_extra_line<S: Into<String>>(&mut self, line: S) {
        self.extra_lines.push(line.into());
    }

    /// First value of attribute `key`.
    pub fn attr_value(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key() == key)
            .and_then(Attribute::value)
    }

    /// True if a (value-less or valued) attribute `key` is present.
    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.iter().any(|a| a.key() == key)
    }

    /// Parses the part after `m=`: `<media> <port>[/<num>] <proto> <fmt>...`.
    ///
    /// # Errors
    /// `SdpError::Invalid` when a token is missing, `ParseInt` for a bad port.
    pub fn parse_header(rest: &str) -> Result<Self, SdpError> {
        let mut p = rest.split_whitespace();
        let kind = MediaKind::from(p.next().ok_or(SdpError::Invalid("m="))?);
        let port_tok = p.next().ok_or(SdpError::Invalid("m= port"))?;
        let port = match port_tok.split_once('/') {
            Some((base, _num)) => base.parse::<u16>()?,
            None => port_tok.parse::<u16>()?,
        };
        let proto = p.next().ok_or(SdpError::Invalid("m= proto"))?;
        let fmts = p.map(ToOwned::to_owned).collect();
        Ok(Self::new(kind, port, proto, fmts))
    }

    /// Emits the `m=` line and every line under it, CRLF terminated.
    pub fn write_lines(&self, out: &mut String) {
        let mut header = format!("m={} {} {}", self.kind, self.port, self.proto);
        for f in &self.fmts {
            header.push(' ');
            header.push_str(f);
        }
        let _ = write!(out, "{header}\r\n");
        if let Some(c) = &self.connection {
            let _ = write!(out, "c={c}\r\n");
        }
        for a in &self.attrs {
            let _ = write!(out, "a={a}\r\n");
        }
        for x in &self.extra_lines {
            let _ = write!(out, "{x}\r\n");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::sdp::addr_type::AddrType;

    #[test]
    fn media_kind_display_and_from() {
        assert_eq!(MediaKind::from("audio"), MediaKind::Audio);
        assert_eq!(MediaKind::from("video").to_string(), "video");
        // case-sensitive
        assert_eq!(MediaKind::from("Audio"), MediaKind::Other("Audio".into()));
    }

    #[test]
    fn parses_header_with_port_range() {
        let m = Media::parse_header("video 9/2 UDP/TLS/RTP/SAVPF 96 97").unwrap();
        assert_eq!(m.kind(), &MediaKind::Video);
        assert_eq!(m.port(), 9);
        assert_eq!(m.proto(), "UDP/TLS/RTP/SAVPF");
        assert_eq!(m.fmts(), ["96".to_string(), "97".to_string()]);
    }

    #[test]
    fn rejects_header_without_proto() {
        assert_eq!(
            Media::parse_header("audio 9"),
            Err(SdpError::Invalid("m= proto"))
        );
        assert!(matches!(
            Media::parse_header("audio x RTP/AVP 0"),
            Err(SdpError::ParseInt(_))
        ));
    }

    #[test]
    fn writes_all_lines_in_order() {
        let mut m = Media::new(MediaKind::Audio, 9, "UDP/TLS/RTP/SAVPF", vec!["111".into()]);
        m.set_connection(Some(Connection::new("IN", AddrType::IP4, "0.0.0.0")));
        m.add_attr(Attribute::new("mid", Some("0".to_string())));
        m.add_attr(Attribute::flag("rtcp-mux"));
        m.add_extra_line("x-custom=1");

        let mut out = String::new();
        m.write_lines(&mut out);
        assert_eq!(
            out,
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\nc=IN IP4 0.0.0.0\r\na=mid:0\r\na=rtcp-mux\r\nx-custom=1\r\n"
        );
        assert_eq!(m.attr_value("mid"), Some("0"));
        assert!(m.has_attr("rtcp-mux"));
    }
}
