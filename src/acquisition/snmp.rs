use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snmp2::{
    AsyncSession, Oid, Value,
    v3::{Auth, Cipher, Security},
};
use tracing::{debug, trace};

use crate::{
    acquisition::{
        core::{ManagementSession, SessionError, SessionFactory, SnmpValue, VarBind},
        credential::{
            AuthProtocol, ConfigError, Credential, CredentialOptions, DEFAULT_COMMUNITY, PrivProtocol,
        },
        path::Path,
    },
    config::humantime_duration,
};

pub const DEFAULT_SNMP_PORT: u16 = 161;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRIES: u32 = 1;

/// SNMPv1 signals the end of the MIB view on GETNEXT with this error status.
const NO_SUCH_NAME: u32 = 2;

/// Everything needed to talk to one device.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub address: SocketAddr,
    pub credential: Credential,
    pub timeout: Duration,
    pub retries: u32,
}

impl SessionConfig {
    pub fn new(address: IpAddr, credential: Credential) -> Self {
        Self {
            address: SocketAddr::new(address, DEFAULT_SNMP_PORT),
            credential,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// SNMP options as configured, before the credential has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpOptions {
    pub version: u8,
    #[serde(flatten)]
    pub credentials: CredentialOptions,
    pub port: u16,
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for SnmpOptions {
    fn default() -> Self {
        Self {
            version: 2,
            credentials: CredentialOptions::community(DEFAULT_COMMUNITY),
            port: DEFAULT_SNMP_PORT,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl SnmpOptions {
    /// Validates the credential and binds the options to one device.
    pub fn session_config(&self, address: IpAddr) -> Result<SessionConfig, ConfigError> {
        let credential = Credential::new(self.version, &self.credentials)?;
        Ok(SessionConfig {
            address: SocketAddr::new(address, self.port),
            credential,
            timeout: self.timeout,
            retries: self.retries,
        })
    }
}

pub(crate) fn path_to_oid(path: &Path) -> Result<Oid<'static>, SessionError> {
    Oid::from(path.as_slice()).map_err(|_| SessionError::InvalidPath(path.clone()))
}

pub(crate) fn oid_to_path(oid: &Oid<'_>) -> Option<Path> {
    oid.iter().map(|components| Path::new(components.collect()))
}

impl From<&Value<'_>> for SnmpValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Integer(i) => SnmpValue::Integer(*i),
            Value::OctetString(s) => SnmpValue::OctetString(s.to_vec()),
            Value::ObjectIdentifier(oid) => oid_to_path(oid)
                .map(SnmpValue::ObjectIdentifier)
                .unwrap_or(SnmpValue::Unknown),
            Value::IpAddress(ip) => SnmpValue::IpAddress(Ipv4Addr::from(*ip)),
            Value::Counter32(c) => SnmpValue::Counter32(*c),
            Value::Unsigned32(u) => SnmpValue::Unsigned32(*u),
            Value::Timeticks(t) => SnmpValue::Timeticks(*t),
            Value::Counter64(c) => SnmpValue::Counter64(*c),
            Value::Opaque(bytes) => SnmpValue::Opaque(bytes.to_vec()),
            Value::Boolean(b) => SnmpValue::Boolean(*b),
            Value::Null => SnmpValue::Null,
            Value::NoSuchObject => SnmpValue::NoSuchObject,
            Value::NoSuchInstance => SnmpValue::NoSuchInstance,
            Value::EndOfMibView => SnmpValue::EndOfMibView,
            _ => SnmpValue::Unknown,
        }
    }
}

fn security_for(
    user: &str,
    auth_key: &str,
    priv_key: &str,
    auth_protocol: AuthProtocol,
    priv_protocol: PrivProtocol,
) -> Security {
    let auth_protocol = match auth_protocol {
        AuthProtocol::Md5 => snmp2::v3::AuthProtocol::Md5,
        AuthProtocol::Sha1 => snmp2::v3::AuthProtocol::Sha1,
        AuthProtocol::Sha224 => snmp2::v3::AuthProtocol::Sha224,
        AuthProtocol::Sha256 => snmp2::v3::AuthProtocol::Sha256,
        AuthProtocol::Sha384 => snmp2::v3::AuthProtocol::Sha384,
        AuthProtocol::Sha512 => snmp2::v3::AuthProtocol::Sha512,
    };
    let cipher = match priv_protocol {
        PrivProtocol::Des => Cipher::Des,
        PrivProtocol::Aes128 => Cipher::Aes128,
        PrivProtocol::Aes192 => Cipher::Aes192,
        PrivProtocol::Aes256 => Cipher::Aes256,
    };
    Security::new(user.as_bytes(), auth_key.as_bytes())
        .with_auth_protocol(auth_protocol)
        .with_auth(Auth::AuthPriv {
            cipher,
            privacy_password: priv_key.as_bytes().to_vec(),
        })
}

/// SNMP session against a single device, with per-request timeout and bounded retries.
///
/// The transport is replaced after every timeout. snmp2 only advances its request id when a
/// response arrives, so a late answer to a timed-out request would otherwise match the next one.
pub struct SnmpSession {
    config: SessionConfig,
    session: AsyncSession,
}

async fn open_transport(config: &SessionConfig) -> Result<AsyncSession, SessionError> {
    let transport = |e: std::io::Error| SessionError::Transport(e.to_string());
    let session = match &config.credential {
        Credential::V1 { community } => AsyncSession::new_v1(config.address, community.as_bytes(), 0)
            .await
            .map_err(transport)?,
        Credential::V2c { community } => {
            AsyncSession::new_v2c(config.address, community.as_bytes(), 0)
                .await
                .map_err(transport)?
        }
        Credential::V3 {
            user,
            auth_key,
            priv_key,
            auth_protocol,
            priv_protocol,
        } => {
            let security = security_for(user, auth_key, priv_key, *auth_protocol, *priv_protocol);
            let mut session = AsyncSession::new_v3(config.address, 0, security)
                .await
                .map_err(transport)?;
            // Engine discovery has to happen before the first authenticated request
            let mut attempt = 0;
            loop {
                match tokio::time::timeout(config.timeout, session.init()).await {
                    Ok(Ok(())) => break,
                    Ok(Err(e)) if attempt >= config.retries => {
                        return Err(SessionError::Transport(format!("{e:?}")));
                    }
                    Err(_) if attempt >= config.retries => {
                        return Err(SessionError::Timeout(config.timeout));
                    }
                    _ => attempt += 1,
                }
            }
            session
        }
    };
    Ok(session)
}

impl SnmpSession {
    pub async fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        let session = open_transport(&config).await?;
        debug!(address = %config.address, credential = %config.credential, "SNMP session opened");
        Ok(Self { config, session })
    }

    /// Drops the current socket, and with it any reply still in flight.
    async fn reconnect(&mut self) -> Result<(), SessionError> {
        self.session = open_transport(&self.config).await?;
        trace!(address = %self.config.address, "SNMP transport replaced");
        Ok(())
    }

    async fn exchange(&mut self, oid: &Oid<'_>, requested: &Path) -> Result<VarBind, SessionError> {
        let mut pdu = self
            .session
            .getnext(oid)
            .await
            .map_err(|e| SessionError::Transport(format!("{e:?}")))?;

        if pdu.error_status != 0 {
            if self.config.credential.version() == 1 && pdu.error_status == NO_SUCH_NAME {
                return Ok(VarBind::new(requested.clone(), SnmpValue::EndOfMibView));
            }
            return Err(SessionError::Protocol {
                status: pdu.error_status,
                index: pdu.error_index,
                path: requested.clone(),
            });
        }

        let (oid, value) = pdu
            .varbinds
            .next()
            .ok_or_else(|| SessionError::EmptyResponse(requested.clone()))?;
        let path = oid_to_path(&oid).ok_or_else(|| {
            SessionError::Transport(format!("undecodable object identifier after {}", requested))
        })?;
        Ok(VarBind::new(path, SnmpValue::from(&value)))
    }
}

#[async_trait]
impl ManagementSession for SnmpSession {
    async fn get_next(&mut self, path: &Path) -> Result<VarBind, SessionError> {
        let oid = path_to_oid(path)?;
        let timeout = self.config.timeout;
        let mut attempt = 0;
        loop {
            let error = match tokio::time::timeout(timeout, self.exchange(&oid, path)).await {
                Ok(Ok(varbind)) => return Ok(varbind),
                // The device answered; asking again will not change its mind
                Ok(Err(e @ SessionError::Protocol { .. })) => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => {
                    self.reconnect().await?;
                    SessionError::Timeout(timeout)
                }
            };
            if attempt >= self.config.retries {
                return Err(error);
            }
            attempt += 1;
            trace!(address = %self.config.address, path = %path, attempt, error = %error, "Retrying GETNEXT");
        }
    }
}

/// Opens SNMP sessions using default options and optional per-device overrides.
///
/// Credentials are validated at `open`, so a broken override costs only its device.
#[derive(Debug, Clone, Default)]
pub struct SnmpSessionFactory {
    defaults: SnmpOptions,
    overrides: HashMap<IpAddr, SnmpOptions>,
}

impl SnmpSessionFactory {
    pub fn new(defaults: SnmpOptions, overrides: HashMap<IpAddr, SnmpOptions>) -> Self {
        Self { defaults, overrides }
    }

    pub fn options_for(&self, address: &IpAddr) -> &SnmpOptions {
        self.overrides.get(address).unwrap_or(&self.defaults)
    }
}

#[async_trait]
impl SessionFactory for SnmpSessionFactory {
    type Session = SnmpSession;

    async fn open(&self, address: IpAddr) -> Result<SnmpSession, SessionError> {
        let config = self.options_for(&address).session_config(address)?;
        SnmpSession::connect(config).await
    }
}
