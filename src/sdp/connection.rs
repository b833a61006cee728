use std::{fmt, str::FromStr};

use crate::sdp::{addr_type::AddrType, sdp_error::SdpError};

/// A `c=` line: network type, address type and connection address.
///
/// Descriptions built by the negotiator carry the placeholder
/// `IN IP4 0.0.0.0`; real addresses travel in candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Network type, usually `"IN"`.
    net_type: String,
    addr_type: AddrType,
    /// Unicast address, or a multicast address with `/ttl`.
    conn_address: String,
}

impl Connection {
    /// Creates a connection line.
    ///
    /// # Parameters
    /// - `net_type`: network type, usually `"IN"`.
    /// - `addr_type`: [`AddrType::IP4`] or [`AddrType::IP6`].
    /// - `connection_address`: the address token as written after the type.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::sdp::{addr_type::AddrType, connection::Connection};
    ///
    /// let conn = Connection::new("IN", AddrType::IP4, "203.0.113.1");
    /// assert_eq!(conn.to_string(), "IN IP4 203.0.113.1");
    /// ```
    pub fn new(
        net_type: impl Into<String>,
        addr_type: AddrType,
        connection_address: impl Into<String>,
    ) -> Self {
        Self {
            net_type: net_type.into(),
            addr_type,
            conn_address: connection_address.into(),
        }
    }

    /// Network type token.
    pub fn net_type(&self) -> &str {
        &self.net_type
    }

    pub const fn addr_type(&self) -> AddrType {
        self.addr_type
    }

    /// Address token exactly as parsed, `/ttl` suffix included.
    pub fn connection_address(&self) -> &str {
        &self.conn_address
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.net_type, self.addr_type, self.conn_address)
    }
}

impl FromStr for Connection {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [net, addr, conn] = parts.as_slice() else {
            return Err(SdpError::Invalid("c="));
        };
        Ok(Self::new(*net, addr.parse()?, *conn))
    }
}
