// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Diagnostics payloads of `/status` and `/nodes`.
//!
//! Every field is defaulted: sections or keys a server version does not
//! report decode as empty rather than failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node status as reported by `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    /// How the server binary was built.
    pub build: BuildStatus,
    /// Addresses this node advertises to the cluster.
    pub cluster: ClusterStatus,
    /// HTTP API listener.
    pub http: HttpStatus,
    /// Process start time and uptime.
    pub node: NodeStatus,
    /// Host operating system and process ids.
    pub os: OsStatus,
    /// Go runtime of the server.
    pub runtime: RuntimeStatus,
    /// Raft store, membership and leader.
    pub store: StoreStatus,
}

/// Build information of the server binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildStatus {
    /// Source branch.
    pub branch: String,
    /// Build timestamp, as formatted by the server.
    pub build_time: String,
    /// Source commit hash.
    pub commit: String,
    /// Compiler used for the build.
    pub compiler: String,
    /// Release version, e.g. `v6.7.0`.
    pub version: String,
}

/// Cluster-facing addresses of the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterStatus {
    /// Raft address.
    pub addr: String,
    /// HTTP API address advertised to peers.
    pub api_addr: String,
    /// `"true"` or `"false"`; the server reports it as a string.
    pub https: String,
}

/// HTTP API listener settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStatus {
    /// `"true"` when basic auth is enabled.
    pub auth: String,
    /// Address the API listens on.
    pub bind_addr: String,
}

/// Process lifetime of the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    /// When the process started.
    pub start_time: String,
    /// Time since start, as a Go duration string.
    pub uptime: String,
}

/// Operating system view of the server process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsStatus {
    /// Path of the running binary.
    pub executable: String,
    /// Host name of the machine.
    pub hostname: String,
    /// Memory page size in bytes.
    pub page_size: i64,
    /// Process id.
    pub pid: i64,
    /// Parent process id.
    pub ppid: i64,
}

/// Go runtime details of the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeStatus {
    /// Target architecture.
    #[serde(rename = "GOARCH")]
    pub goarch: String,
    /// Maximum number of OS threads running Go code.
    #[serde(rename = "GOMAXPROCS")]
    pub gomaxprocs: i64,
    /// Target operating system.
    #[serde(rename = "GOOS")]
    pub goos: String,
    /// Logical CPUs visible to the process.
    pub num_cpu: i64,
    /// Live goroutines at the time of the request.
    pub num_goroutine: i64,
    /// Go toolchain version.
    pub version: String,
}

/// Raft store of the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreStatus {
    /// Raft address of this node.
    pub addr: String,
    /// Timeout for applying a log entry.
    pub apply_timeout: String,
    /// Last log index applied to the database.
    pub db_applied_index: u64,
    /// Data directory.
    pub dir: String,
    /// Size of the data directory in bytes.
    pub dir_size: u64,
    /// Raft election timeout.
    pub election_timeout: String,
    /// Last log index applied to the state machine.
    pub fsm_index: u64,
    /// Raft heartbeat timeout.
    pub heartbeat_timeout: String,
    /// Current leader as seen by this node.
    pub leader: LeaderStatus,
    /// Id of this node.
    pub node_id: String,
    /// Raft configuration as seen by this node.
    pub nodes: Vec<StoreNode>,
    /// Raft counters.
    pub raft: RaftStatus,
}

impl StoreStatus {
    /// Whether this node believes it is the leader.
    pub fn is_leader(&self) -> bool {
        !self.node_id.is_empty() && self.leader.node_id == self.node_id
    }
}

/// Leader reference inside [`StoreStatus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderStatus {
    /// Raft address of the leader.
    pub addr: String,
    /// Id of the leader; empty during an election.
    pub node_id: String,
}

/// Member of the Raft configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreNode {
    /// Raft address.
    pub addr: String,
    /// Node id.
    pub id: String,
    /// `Voter` or `Nonvoter`.
    pub suffrage: String,
}

/// Raft counters of the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftStatus {
    /// Last index applied to the state machine.
    pub applied_index: u64,
    /// Last index known to be committed.
    pub commit_index: u64,
    /// Time since the last contact with the leader.
    pub last_contact: String,
    /// Index of the last log entry.
    pub last_log_index: u64,
    /// Term of the last log entry.
    pub last_log_term: u64,
    /// Number of other voters.
    pub num_peers: u64,
    /// `Leader`, `Follower` or `Candidate`.
    pub state: String,
    /// Current term.
    pub term: u64,
}

/// One entry of `GET /nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    /// HTTP API address.
    pub api_addr: String,
    /// Raft address.
    pub addr: String,
    /// Whether the serving node could contact it.
    pub reachable: bool,
    /// Whether it is the leader.
    pub leader: bool,
    /// Seconds taken to contact the node.
    pub time: f64,
    /// Why the node could not be reached.
    pub error: String,
}

/// Cluster membership keyed by node id, as reported by `GET /nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nodes(pub BTreeMap<String, NodeInfo>);

impl Nodes {
    /// The node currently reported as leader.
    pub fn leader(&self) -> Option<(&str, &NodeInfo)> {
        self.0
            .iter()
            .find(|(_, node)| node.leader)
            .map(|(id, node)| (id.as_str(), node))
    }

    /// Nodes that could not be contacted.
    pub fn unreachable(&self) -> impl Iterator<Item = (&str, &NodeInfo)> {
        self.0
            .iter()
            .filter(|(_, node)| !node.reachable)
            .map(|(id, node)| (id.as_str(), node))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no nodes were reported.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&NodeInfo> {
        self.0.get(id)
    }
}
