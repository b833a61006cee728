use std::{fmt, str::FromStr};

use crate::sdp::sdp_error::SdpError;

/// Address type token of `o=` and `c=` lines.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AddrType {
    /// IPv4
    IP4,
    /// IPv6
    IP6,
}

impl fmt::Display for AddrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IP4 => "IP4",
            Self::IP6 => "IP6",
        })
    }
}

impl FromStr for AddrType {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IP4" => Ok(Self::IP4),
            "IP6" => Ok(Self::IP6),
            _ => Err(SdpError::AddrType),
        }
    }
}
