use std::fmt::Write as _;

use crate::sdp::{
    attribute::Attribute, connection::Connection, media::Media, origin::Origin,
    sdp_error::SdpError,
};

/// A whole session description in SDP text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdp {
    /// `v=`, always 0.
    pub version: u8,
    pub origin: Origin,
    /// `s=`
    pub session_name: String,
    /// Session level `c=`.
    pub connection: Option<Connection>,
    /// `t=<start> <stop>`; `0 0` for an unbounded session.
    pub timing: (u64, u64),
    /// Session level `a=*`.
    pub attrs: Vec<Attribute>,
    pub media: Vec<Media>,
    /// Unknown session level lines.
    pub extra_lines: Vec<String>,
}

impl Sdp {
    /// Empty description with the mandatory session lines filled in.
    ///
    /// # Parameters
    /// - `origin`: the `o=` line.
    /// - `session_name`: the `s=` text, `-` when there is none.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::sdp::{Sdp, origin::Origin};
    ///
    /// let sdp = Sdp::new(Origin::anonymous(7, 1), "-");
    /// let text = sdp.encode();
    /// assert!(text.starts_with("v=0\r\no=- 7 1 IN IP4 127.0.0.1\r\ns=-\r\n"));
    /// assert_eq!(Sdp::parse(&text).unwrap(), sdp);
    /// ```
    pub fn new(origin: Origin, session_name: impl Into<String>) -> Self {
        Self {
            version: 0,
            origin,
            session_name: session_name.into(),
            connection: None,
            timing: (0, 0),
            attrs: Vec::new(),
            media: Vec::new(),
            extra_lines: Vec::new(),
        }
    }

    /// First value of session attribute `key`.
    pub fn attr_value(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key() == key)
            .and_then(Attribute::value)
    }

    /// Parses SDP text. Accepts both `\r\n` and `\n` line endings.
    ///
    /// # Errors
    /// `SdpError::Missing` when `v=`, `o=` or `s=` is absent, `Invalid` or
    /// `ParseInt` for malformed lines.
    pub fn parse(input: &str) -> Result<Self, SdpError> {
        let mut version: Option<u8> = None;
        let mut origin: Option<Origin> = None;
        let mut session_name: Option<String> = None;
        let mut connection = None;
        let mut timing = (0, 0);
        let mut attrs = Vec::new();
        let mut media: Vec<Media> = Vec::new();
        let mut extra_lines = Vec::new();

        for raw in input.split('\n') {
            let line = raw.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let Some((prefix, rest)) = line.split_once('=') else {
                return Err(SdpError::Invalid("line without '='"));
            };
            if prefix == "m" {
                media.push(Media::parse_header(rest)?);
                continue;
            }
            match (prefix, media.last_mut()) {
                ("v", _) => version = Some(rest.trim().parse()?),
                ("o", _) => origin = Some(rest.parse()?),
                ("s", _) => session_name = Some(rest.to_owned()),
                ("t", _) => {
                    let mut p = rest.split_whitespace();
                    let (Some(start), Some(stop)) = (p.next(), p.next()) else {
                        return Err(SdpError::Invalid("t="));
                    };
                    timing = (start.parse()?, stop.parse()?);
                }
                ("c", Some(m)) => m.set_connection(Some(rest.parse()?)),
                ("c", None) => connection = Some(rest.parse()?),
                ("a", Some(m)) => m.add_attr(Attribute::parse(rest)),
                ("a", None) => attrs.push(Attribute::parse(rest)),
                (_, Some(m)) => m.add_extra_line(line),
                (_, None) => extra_lines.push(line.to_owned()),
            }
        }

        Ok(Self {
            version: version.ok_or(SdpError::Missing("v="))?,
            origin: origin.ok_or(SdpError::Missing("o="))?,
            session_name: session_name.ok_or(SdpError::Missing("s="))?,
            connection,
            timing,
            attrs,
            media,
            extra_lines,
        })
    }

    /// Encodes to SDP text with CRLF line endings.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "v={}\r\n", self.version);
        let _ = write!(out, "o={}\r\n", self.origin);
        let _ = write!(out, "s={}\r\n", self.session_name);
        if let Some(c) = &self.connection {
            let _ = write!(out, "c={c}\r\n");
        }
        let _ = write!(out, "t={} {}\r\n", self.timing.0, self.timing.1);
        for a in &self.attrs {
            let _ = write!(out, "a={a}\r\n");
        }
        for x in &self.extra_lines {
            let _ = write!(out, "{x}\r\n");
        }
        for m in &self.media {
            m.write_lines(&mut out);
        }
        out
    }
}
