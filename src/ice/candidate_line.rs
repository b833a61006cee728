use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use thiserror::Error;

use crate::ice::candidate_type::CandidateType;

/// Maximum local preference (interface-insensitive).
const MAX_LOCAL_PREF: u16 = u16::MAX;

/// Offsets of the priority formula, RFC 8445 §5.1.2.1.
const TYPE_PREF_SHIFT: u32 = 24;
const LOCAL_PREF_SHIFT: u32 = 8;
const COMPONENT_OFFSET: u32 = 256;

const CANDIDATE_PREFIX: &str = "candidate:";
const MIN_FIELDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateLineError {
    #[error("candidate line has {0} fields, at least 8 expected")]
    TooShort(usize),
    #[error("invalid {0} in candidate line")]
    Invalid(&'static str),
    #[error("missing 'typ' token in candidate line")]
    MissingTyp,
    #[error("unknown candidate type '{0}'")]
    UnknownType(String),
}

/// Structured form of an `a=candidate` connectivity string:
/// `<foundation> <component> <transport> <priority> <ip> <port> typ <type>
/// [raddr <ip> rport <port>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLine {
    pub foundation: String,
    /// 1 = RTP, 2 = RTCP.
    pub component: u8,
    /// Lowercase transport, e.g. `udp`.
    pub transport: String,
    pub priority: u32,
    pub address: SocketAddr,
    pub cand_type: CandidateType,
    pub related_address: Option<SocketAddr>,
}

impl CandidateLine {
    /// A host candidate with computed foundation and priority.
    #[must_use]
    pub fn host(address: SocketAddr, transport: &str, component: u8) -> Self {
        let transport = transport.to_ascii_lowercase();
        Self {
            foundation: foundation(CandidateType::Host, &transport, address.ip()),
            component,
            priority: priority(CandidateType::Host, MAX_LOCAL_PREF, component),
            transport,
            address,
            cand_type: CandidateType::Host,
            related_address: None,
        }
    }

    /// Whether a pair of `self` and `other` can ever work: same address
    /// family, transport and component.
    pub fn compatible_with(&self, other: &Self) -> bool {
        self.address.is_ipv4() == other.address.is_ipv4()
            && self.transport == other.transport
            && self.component == other.component
    }
}

// RFC 8445 §5.1.1.3: any stable identifier will do.
fn foundation(cand_type: CandidateType, transport_lc: &str, base_ip: IpAddr) -> String {
    let mut hasher = DefaultHasher::new();
    format!("{cand_type}-{transport_lc}-{base_ip}").hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

// RFC 8445 §5.1.2.1: 32-bit candidate priority.
const fn priority(cand_type: CandidateType, local_pref: u16, component_id: u8) -> u32 {
    (cand_type.type_preference() << TYPE_PREF_SHIFT)
        | ((local_pref as u32) << LOCAL_PREF_SHIFT)
        | (COMPONENT_OFFSET - component_id as u32)
}

impl fmt::Display for CandidateLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CANDIDATE_PREFIX}{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.transport,
            self.priority,
            self.address.ip(),
            self.address.port(),
            self.cand_type,
        )?;
        if let Some(r) = self.related_address {
            write!(f, " raddr {} rport {}", r.ip(), r.port())?;
        }
        Ok(())
    }
}

impl FromStr for CandidateLine {
    type Err = CandidateLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use CandidateLineError::{Invalid, MissingTyp, TooShort, UnknownType};

        let s = s.trim();
        let s = s.strip_prefix("a=").unwrap_or(s);
        let s = s.strip_prefix(CANDIDATE_PREFIX).unwrap_or(s);

        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() < MIN_FIELDS {
            return Err(TooShort(parts.len()));
        }

        let component: u8 = parts[1].parse().map_err(|_| Invalid("component"))?;
        let priority: u32 = parts[3].parse().map_err(|_| Invalid("priority"))?;
        let ip: IpAddr = parts[4].parse().map_err(|_| Invalid("address"))?;
        let port: u16 = parts[5].parse().map_err(|_| Invalid("port"))?;
        if parts[6] != "typ" {
            return Err(MissingTyp);
        }
        let cand_type: CandidateType = parts[7].parse().map_err(UnknownType)?;

        let mut raddr: Option<IpAddr> = None;
        let mut rport: Option<u16> = None;
        for kv in parts[MIN_FIELDS..].chunks_exact(2) {
            match kv {
                ["raddr", v] => raddr = Some(v.parse().map_err(|_| Invalid("raddr"))?),
                ["rport", v] => rport = Some(v.parse().map_err(|_| Invalid("rport"))?),
                // generation, ufrag, network-id and friends
                _ => {}
            }
        }

        Ok(Self {
            foundation: parts[0].to_owned(),
            component,
            transport: parts[2].to_ascii_lowercase(),
            priority,
            address: SocketAddr::new(ip, port),
            cand_type,
            related_address: raddr.map(|ip| SocketAddr::new(ip, rport.unwrap_or(0))),
        })
    }
}
