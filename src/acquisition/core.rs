use std::{fmt::Display, net::{IpAddr, Ipv4Addr}, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acquisition::{credential::ConfigError, path::Path};

/// Transport-neutral copy of an SNMP value, detached from the response buffer it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectIdentifier(Path),
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Unsigned32(u32),
    Timeticks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    Boolean(bool),
    Null,

    // End-of-data exceptions
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,

    Unknown,
}

impl SnmpValue {
    /// True for the exception values an agent uses to say there is nothing (more) to return.
    pub fn is_end_of_data(&self) -> bool {
        matches!(
            self,
            SnmpValue::EndOfMibView | SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance
        )
    }

    pub fn octet_string(text: &str) -> Self {
        SnmpValue::OctetString(text.as_bytes().to_vec())
    }
}

fn is_printable(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.chars().all(|c| !c.is_control() || matches!(c, '\t' | '\r' | '\n')),
        Err(_) => false,
    }
}

/// Renders values the way SNMP tooling prints them. Octet strings that are not
/// printable text (MAC-based chassis ids, for instance) come out as `0x` hex.
impl Display for SnmpValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnmpValue::Integer(i) => write!(f, "{}", i),
            SnmpValue::OctetString(bytes) | SnmpValue::Opaque(bytes) => {
                if bytes.is_empty() || is_printable(bytes) {
                    write!(f, "{}", String::from_utf8_lossy(bytes))
                } else {
                    write!(f, "0x{}", hex::encode(bytes))
                }
            }
            SnmpValue::ObjectIdentifier(path) => write!(f, "{}", path),
            SnmpValue::IpAddress(ip) => write!(f, "{}", ip),
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) | SnmpValue::Timeticks(v) => {
                write!(f, "{}", v)
            }
            SnmpValue::Counter64(v) => write!(f, "{}", v),
            SnmpValue::Boolean(b) => write!(f, "{}", b),
            SnmpValue::Null => write!(f, ""),
            SnmpValue::NoSuchObject => write!(f, "No Such Object currently exists at this OID"),
            SnmpValue::NoSuchInstance => write!(f, "No Such Instance currently exists at this OID"),
            SnmpValue::EndOfMibView => write!(f, "No more variables left in this MIB View"),
            SnmpValue::Unknown => write!(f, "?"),
        }
    }
}

/// One (path, value) pair returned by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarBind {
    pub path: Path,
    pub value: SnmpValue,
}

impl VarBind {
    pub fn new(path: Path, value: SnmpValue) -> Self {
        Self { path, value }
    }
}

/// Failures of a single request/response exchange with a device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("device returned error status {status} (index {index}) at {path}")]
    Protocol { status: u32, index: u32, path: Path },
    #[error("device returned an empty response for {0}")]
    EmptyResponse(Path),
    #[error("cannot encode object identifier {0}")]
    InvalidPath(Path),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A management session bound to one device.
///
/// The walk engine only needs GETNEXT, which keeps simulated devices in tests small.
#[async_trait]
pub trait ManagementSession: Send {
    /// Returns the first binding that follows `path` in the device's ordering.
    ///
    /// Implementations report "nothing follows" as a binding whose value is one of the
    /// end-of-data exceptions rather than as an error.
    async fn get_next(&mut self, path: &Path) -> Result<VarBind, SessionError>;
}

/// Opens a fresh session for each device polled during a run.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: ManagementSession + 'static;

    async fn open(&self, address: IpAddr) -> Result<Self::Session, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octet_string_rendering() {
        assert_eq!(SnmpValue::octet_string("Gi0/1").to_string(), "Gi0/1");
        assert_eq!(SnmpValue::OctetString(vec![]).to_string(), "");
        assert_eq!(
            SnmpValue::OctetString(vec![0x00, 0x1b, 0x54, 0xaa, 0x01, 0xff]).to_string(),
            "0x001b54aa01ff"
        );
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(SnmpValue::Integer(-3).to_string(), "-3");
        assert_eq!(SnmpValue::IpAddress(Ipv4Addr::new(10, 0, 0, 1)).to_string(), "10.0.0.1");
        assert_eq!(
            SnmpValue::ObjectIdentifier("1.3.6.1".parse().unwrap()).to_string(),
            "1.3.6.1"
        );
    }

    #[test]
    fn test_end_of_data_values() {
        assert!(SnmpValue::EndOfMibView.is_end_of_data());
        assert!(SnmpValue::NoSuchInstance.is_end_of_data());
        assert!(SnmpValue::NoSuchObject.is_end_of_data());
        assert!(!SnmpValue::Null.is_end_of_data());
        assert!(!SnmpValue::Integer(0).is_end_of_data());
    }
}
