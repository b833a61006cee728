use std::{fmt, str::FromStr};

use crate::sdp::{addr_type::AddrType, sdp_error::SdpError};

/// The `o=` line.
///
/// `session_id` stays fixed for the lifetime of a peer connection while
/// `session_version` grows with every applied local description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    username: String,
    session_id: u64,
    session_version: u64,
    net_type: String,
    addr_type: AddrType,
    unicast_address: String,
}

impl Origin {
    /// Creates an origin line.
    ///
    /// # Parameters
    /// - `username`: originator login, `-` when anonymous.
    /// - `session_id`: stays fixed for the whole session.
    /// - `session_version`: must grow whenever the description changes.
    /// - `net_type`, `addr_type`, `unicast_address`: where the session was
    ///   created, as in a `c=` line.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::sdp::{addr_type::AddrType, origin::Origin};
    ///
    /// let o = Origin::new("-", 42, 1, "IN", AddrType::IP4, "127.0.0.1");
    /// assert_eq!(o.to_string(), "- 42 1 IN IP4 127.0.0.1");
    /// assert_eq!(o, Origin::anonymous(42, 1));
    /// ```
    pub fn new(
        username: impl Into<String>,
        session_id: u64,
        session_version: u64,
        net_type: impl Into<String>,
        addr_type: AddrType,
        unicast_address: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            session_id,
            session_version,
            net_type: net_type.into(),
            addr_type,
            unicast_address: unicast_address.into(),
        }
    }

    /// Anonymous origin as browsers emit it: `- <id> <version> IN IP4 127.0.0.1`.
    pub fn anonymous(session_id: u64, session_version: u64) -> Self {
        Self::new("-", session_id, session_version, "IN", AddrType::IP4, "127.0.0.1")
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub const fn session_id(&self) -> u64 {
        self.session_id
    }

    pub const fn session_version(&self) -> u64 {
        self.session_version
    }

    pub fn net_type(&self) -> &str {
        &self.net_type
    }

    pub const fn addr_type(&self) -> AddrType {
        self.addr_type
    }

    pub fn unicast_address(&self) -> &str {
        &self.unicast_address
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.username,
            self.session_id,
            self.session_version,
            self.net_type,
            self.addr_type,
            self.unicast_address
        )
    }
}

impl FromStr for Origin {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [user, id, version, net, addr, unicast] = parts.as_slice() else {
            return Err(SdpError::Invalid("o="));
        };
        Ok(Self::new(
            *user,
            id.parse()?,
            version.parse()?,
            *net,
            addr.parse()?,
            *unicast,
        ))
    }
}
