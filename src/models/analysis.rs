//! Analysis result records
//!
//! Payloads produced by the external dump analysis plugins. The cache stores
//! them as opaque values; they only need to be cloneable.

use serde::{Deserialize, Serialize};

/// One process found in a memory dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub threads: u32,
}

/// Command line of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLineInfo {
    pub pid: u32,
    pub process_name: String,
    pub command_line: String,
}

/// A module loaded into a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DllInfo {
    pub pid: u32,
    pub process_name: String,
    pub base_address: u64,
    pub size: u64,
    pub name: String,
    pub path: String,
}

/// A socket recovered from a dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConnectionInfo {
    pub protocol: String,
    pub local_address: String,
    pub local_port: u16,
    pub remote_address: String,
    pub remote_port: u16,
    pub state: String,
    pub pid: u32,
    pub owner: String,
}

/// A suspicious finding reported by a malware scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalwareDetection {
    pub pid: u32,
    pub process_name: String,
    pub detection_type: String,
    pub severity: String,
    pub confidence: f32,
    #[serde(default)]
    pub indicators: Vec<String>,
}
