//! Simulated devices for tests. No sockets involved.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    net::IpAddr,
    time::Duration,
};

use async_trait::async_trait;

use crate::acquisition::{
    core::{ManagementSession, SessionError, SessionFactory, SnmpValue, VarBind},
    credential::ConfigError,
    path::Path,
};

/// Agent backed by an ordered table, answering GETNEXT the way a conformant device does.
#[derive(Debug, Clone, Default)]
pub struct MockAgent {
    table: BTreeMap<Path, SnmpValue>,
    failures: HashMap<Path, SessionError>,
    unresponsive: Option<SessionError>,
    requests: usize,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, value: &str) -> Self {
        self.with_value(path, SnmpValue::octet_string(value))
    }

    pub fn with_value(mut self, path: &str, value: SnmpValue) -> Self {
        self.table.insert(path.parse().expect("test path"), value);
        self
    }

    /// Fails any GETNEXT whose request path is exactly `path`.
    pub fn failing_at(mut self, path: &str, error: SessionError) -> Self {
        self.failures.insert(path.parse().expect("test path"), error);
        self
    }

    /// Times out every request.
    pub fn unresponsive() -> Self {
        Self {
            unresponsive: Some(SessionError::Timeout(Duration::from_secs(1))),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> usize {
        self.requests
    }
}

#[async_trait]
impl ManagementSession for MockAgent {
    async fn get_next(&mut self, path: &Path) -> Result<VarBind, SessionError> {
        self.requests += 1;
        if let Some(error) = self.unresponsive.as_ref().or_else(|| self.failures.get(path)) {
            return Err(error.clone());
        }
        let next = self
            .table
            .range((std::ops::Bound::Excluded(path.clone()), std::ops::Bound::Unbounded))
            .next();
        Ok(match next {
            Some((p, v)) => VarBind::new(p.clone(), v.clone()),
            None => VarBind::new(path.clone(), SnmpValue::EndOfMibView),
        })
    }
}

/// Session that replays a fixed list of responses, whatever is asked.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    responses: VecDeque<Result<VarBind, SessionError>>,
    requests: usize,
}

impl ScriptedSession {
    pub fn new(responses: Vec<Result<VarBind, SessionError>>) -> Self {
        Self {
            responses: responses.into(),
            requests: 0,
        }
    }

    pub fn requests(&self) -> usize {
        self.requests
    }
}

#[async_trait]
impl ManagementSession for ScriptedSession {
    async fn get_next(&mut self, path: &Path) -> Result<VarBind, SessionError> {
        self.requests += 1;
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(VarBind::new(path.clone(), SnmpValue::EndOfMibView)))
    }
}

/// Hands out a fresh copy of the configured agent for each address.
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    agents: HashMap<IpAddr, MockAgent>,
    misconfigured: HashMap<IpAddr, ConfigError>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, address: &str, agent: MockAgent) -> Self {
        self.agents.insert(address.parse().expect("test address"), agent);
        self
    }

    pub fn with_config_error(mut self, address: &str, error: ConfigError) -> Self {
        self.misconfigured.insert(address.parse().expect("test address"), error);
        self
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    type Session = MockAgent;

    async fn open(&self, address: IpAddr) -> Result<MockAgent, SessionError> {
        if let Some(error) = self.misconfigured.get(&address) {
            return Err(SessionError::Config(error.clone()));
        }
        self.agents
            .get(&address)
            .cloned()
            .ok_or_else(|| SessionError::Transport(format!("no route to {}", address)))
    }
}
