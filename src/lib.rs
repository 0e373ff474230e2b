//! SNMP neighbor topology discovery.
//!
//! Sweeps subnets for live hosts, walks each host's LLDP/CDP neighbor tables and builds one
//! device graph from what they report.

pub mod acquisition;
pub mod config;
pub mod neighbors;
pub mod network;
pub mod scanner;
pub mod topology;
