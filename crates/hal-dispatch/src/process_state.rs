//! Extracts "reload/restart required" signals from successful responses.

use std::collections::BTreeSet;
use std::fmt;

use hal_dmr::names::{
    HOST, PROCESS_STATE, RELOAD_REQUIRED, RESPONSE, RESPONSE_HEADERS, RESTART_REQUIRED,
    SERVER_GROUPS,
};
use hal_dmr::ModelNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Enumerates supported `State` values.
pub enum State {
    ReloadRequired,
    RestartRequired,
}

impl State {
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            RELOAD_REQUIRED => Some(State::ReloadRequired),
            RESTART_REQUIRED => Some(State::RestartRequired),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::ReloadRequired => RELOAD_REQUIRED,
            State::RestartRequired => RESTART_REQUIRED,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One server that needs a reload or restart. A standalone server has an empty host and server name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerState {
    pub host: String,
    pub server: String,
    pub state: State,
}

impl ServerState {
    pub fn new(host: impl Into<String>, server: impl Into<String>, state: State) -> Self {
        Self {
            host: host.into(),
            server: server.into(),
            state,
        }
    }

    pub fn is_standalone(&self) -> bool {
        self.host.is_empty() && self.server.is_empty()
    }
}

/// Set of servers with a pending reload or restart, recomputed per response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessState {
    servers: BTreeSet<ServerState>,
}

impl ProcessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, server: ServerState) {
        self.servers.insert(server);
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn contains(&self, server: &ServerState) -> bool {
        self.servers.contains(server)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerState> {
        self.servers.iter()
    }

    pub fn reload_required(&self) -> bool {
        self.servers
            .iter()
            .any(|server| server.state == State::ReloadRequired)
    }

    pub fn restart_required(&self) -> bool {
        self.servers
            .iter()
            .any(|server| server.state == State::RestartRequired)
    }
}

impl FromIterator<ServerState> for ProcessState {
    fn from_iter<I: IntoIterator<Item = ServerState>>(iter: I) -> Self {
        Self {
            servers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ProcessState {
    type Item = &'a ServerState;
    type IntoIter = std::collections::btree_set::Iter<'a, ServerState>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.iter()
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Public struct `ProcessStateProcessor` used across HAL components.
pub struct ProcessStateProcessor;

impl ProcessStateProcessor {
    /// Whether `response` can carry process-state headers at all.
    pub fn accepts(&self, response: &ModelNode) -> bool {
        response.has_defined(SERVER_GROUPS) || response.has_defined(RESPONSE_HEADERS)
    }

    /// Pure: the same response always yields the same set.
    pub fn process(&self, response: &ModelNode) -> ProcessState {
        let mut state = ProcessState::new();
        if let Some(groups) = response.get(SERVER_GROUPS).filter(|node| node.is_defined()) {
            for (_, group) in groups.as_property_list() {
                let Some(hosts) = group.get(HOST) else {
                    continue;
                };
                for (host, servers) in hosts.as_property_list() {
                    for (server, server_response) in servers.as_property_list() {
                        let header = server_response.get_path(&[RESPONSE, RESPONSE_HEADERS, PROCESS_STATE]);
                        if let Some(value) = header.and_then(header_state) {
                            state.add(ServerState::new(host, server, value));
                        }
                    }
                }
            }
        } else if let Some(value) = response
            .get_path(&[RESPONSE_HEADERS, PROCESS_STATE])
            .and_then(header_state)
        {
            state.add(ServerState::new("", "", value));
        }
        state
    }
}

fn header_state(header: &ModelNode) -> Option<State> {
    header.as_str().and_then(State::from_header)
}
