/*!
SNMP credentials.

A `Credential` can only be obtained through `Credential::new`, which checks that every field the
chosen security model needs is present. Raw, possibly half-filled options live in
`CredentialOptions` (the shape they arrive in from configuration).
*/

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported SNMP version {0}, expected 1, 2 or 3")]
    UnsupportedVersion(u8),
    #[error("SNMPv{version} requires a non-empty {field}")]
    MissingField { version: u8, field: &'static str },
    #[error("unknown authentication protocol '{0}'")]
    UnknownAuthProtocol(String),
    #[error("unknown privacy protocol '{0}'")]
    UnknownPrivProtocol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthProtocol {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl FromStr for AuthProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use AuthProtocol::*;
        let normalized = s.trim().to_ascii_uppercase().replace('-', "");
        match normalized.as_str() {
            "MD5" => Ok(Md5),
            "SHA" | "SHA1" => Ok(Sha1),
            "SHA224" => Ok(Sha224),
            "SHA256" => Ok(Sha256),
            "SHA384" => Ok(Sha384),
            "SHA512" => Ok(Sha512),
            _ => Err(ConfigError::UnknownAuthProtocol(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivProtocol {
    Des,
    Aes128,
    Aes192,
    Aes256,
}

impl FromStr for PrivProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use PrivProtocol::*;
        let normalized = s.trim().to_ascii_uppercase().replace('-', "");
        match normalized.as_str() {
            "DES" => Ok(Des),
            "AES" | "AES128" => Ok(Aes128),
            "AES192" => Ok(Aes192),
            "AES256" => Ok(Aes256),
            _ => Err(ConfigError::UnknownPrivProtocol(s.to_string())),
        }
    }
}

/// Community used when the configuration names none.
pub const DEFAULT_COMMUNITY: &str = "public";

fn default_community() -> Option<String> {
    Some(DEFAULT_COMMUNITY.to_string())
}

/// Credential fields as they appear in configuration. Any of them may be missing, except that
/// an absent `community` reads as `public`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialOptions {
    #[serde(default = "default_community")]
    pub community: Option<String>,
    pub user: Option<String>,
    pub auth_key: Option<String>,
    pub priv_key: Option<String>,
    pub auth_protocol: Option<String>,
    pub priv_protocol: Option<String>,
}

impl CredentialOptions {
    pub fn community(community: &str) -> Self {
        Self {
            community: Some(community.to_string()),
            ..Default::default()
        }
    }
}

/// Validated credential for one of the three SNMP security models.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    V1 {
        community: String,
    },
    V2c {
        community: String,
    },
    V3 {
        user: String,
        auth_key: String,
        priv_key: String,
        auth_protocol: AuthProtocol,
        priv_protocol: PrivProtocol,
    },
}

fn required(value: &Option<String>, version: u8, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(ConfigError::MissingField { version, field }),
    }
}

impl Credential {
    pub fn new(version: u8, options: &CredentialOptions) -> Result<Self, ConfigError> {
        match version {
            1 => Ok(Credential::V1 {
                community: required(&options.community, version, "community")?,
            }),
            2 => Ok(Credential::V2c {
                community: required(&options.community, version, "community")?,
            }),
            3 => {
                let user = required(&options.user, version, "user")?;
                let auth_key = required(&options.auth_key, version, "auth_key")?;
                let priv_key = required(&options.priv_key, version, "priv_key")?;
                let auth_protocol = required(&options.auth_protocol, version, "auth_protocol")?.parse()?;
                let priv_protocol = required(&options.priv_protocol, version, "priv_protocol")?.parse()?;
                Ok(Credential::V3 {
                    user,
                    auth_key,
                    priv_key,
                    auth_protocol,
                    priv_protocol,
                })
            }
            other => Err(ConfigError::UnsupportedVersion(other)),
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            Credential::V1 { .. } => 1,
            Credential::V2c { .. } => 2,
            Credential::V3 { .. } => 3,
        }
    }
}

// Secrets stay out of logs

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::V1 { .. } => f.debug_struct("V1").finish_non_exhaustive(),
            Credential::V2c { .. } => f.debug_struct("V2c").finish_non_exhaustive(),
            Credential::V3 { user, auth_protocol, priv_protocol, .. } => f
                .debug_struct("V3")
                .field("user", user)
                .field("auth_protocol", auth_protocol)
                .field("priv_protocol", priv_protocol)
                .finish_non_exhaustive(),
        }
    }
}

impl Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::V1 { .. } => write!(f, "SNMPv1 community"),
            Credential::V2c { .. } => write!(f, "SNMPv2c community"),
            Credential::V3 { user, .. } => write!(f, "SNMPv3 user {}", user),
        }
    }
}
