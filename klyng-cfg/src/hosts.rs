//  HOSTS.rs
//    by Lut99
//
//  Created:
//    14 Feb 2023, 11:45:50
//  Last edited:
//    01 Mar 2023, 14:22:07
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the hosts file, which describes on which machines a job
//!   may spawn its processes (and how many).
//

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FResult};
use std::fs::File;
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

pub use crate::errors::HostsError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;


    #[test]
    fn parse_fills_in_defaults() {
        let hosts = HostsTopology::parse(&json!({ "local": { "max_procs": 4 }, "node1": { "port": 3000 } })).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts.get("local"), Some(&NodeSpec::Local{ max_procs: MaxProcs::Bounded(4) }));
        assert_eq!(hosts.get("node1:3000"), Some(&NodeSpec::Remote{ host: "node1".into(), port: 3000, max_procs: MaxProcs::Unbounded, credential: String::new() }));
    }

    #[test]
    fn parse_defaults_remote_port_and_password() {
        let hosts = HostsTopology::parse(&json!({ "node2": {} })).unwrap();
        let node: &NodeSpec = hosts.get("node2:2222").unwrap();
        assert_eq!(node.max_procs(), MaxProcs::Unbounded);
        assert_eq!(node.port(), Some(DEFAULT_PORT));
        assert_eq!(node.credential(), Some(""));
    }

    #[test]
    fn parse_treats_null_as_absent() {
        let hosts = HostsTopology::parse(&json!({ "node3": { "max_procs": null, "port": null, "passwd": null } })).unwrap();
        assert_eq!(hosts.get("node3:2222"), Some(&NodeSpec::Remote{ host: "node3".into(), port: 2222, max_procs: MaxProcs::Unbounded, credential: String::new() }));
    }

    #[test]
    fn parse_local_never_carries_port_or_password() {
        let hosts = HostsTopology::parse(&json!({ "local": { "port": "not even a number", "passwd": 42 } })).unwrap();
        let local: &NodeSpec = hosts.local().unwrap();
        assert!(local.is_local());
        assert_eq!(local.port(), None);
        assert_eq!(local.credential(), None);
    }

    #[test]
    fn parse_keys_multiple_listeners_apart() {
        let hosts = HostsTopology::parse(&json!({
            "node1": { "port": 3000, "passwd": "a" },
            "node1:4000": { "port": 4000, "passwd": "b" },
        })).unwrap();
        assert_eq!(hosts.remotes().count(), 2);
        assert_eq!(hosts.get("node1:3000").and_then(NodeSpec::credential), Some("a"));
        assert_eq!(hosts.get("node1:4000").and_then(NodeSpec::credential), Some("b"));
    }

    #[test]
    fn parse_rejects_entries_for_same_node() {
        let res = HostsTopology::parse(&json!({
            "a": { "port": 3000, "passwd": "x" },
            "a:3000": { "port": 3000, "passwd": "y" },
        }));
        match res {
            Err(Error::DuplicateNode{ id, key }) => {
                assert_eq!(id, "a:3000");
                assert_eq!(key, "a:3000");
            },
            other => panic!("Expected DuplicateNode, got {:?}", other),
        }
    }

    #[test]
    fn parse_checks_entries_in_file_order() {
        let raw: Value = serde_json::from_str(r#"{ "z": { "max_procs": 0 }, "a": 5 }"#).unwrap();
        match HostsTopology::parse(&raw) {
            Err(Error::MaxProcsTooSmall{ id, .. }) => assert_eq!(id, "z"),
            other => panic!("Expected MaxProcsTooSmall for 'z', got {:?}", other),
        }
    }

    #[test]
    fn parse_accepts_empty_and_remote_only() {
        assert!(HostsTopology::parse(&json!({})).unwrap().is_empty());

        let hosts = HostsTopology::parse(&json!({ "node1": {}, "node2": { "max_procs": 2 } })).unwrap();
        assert!(hosts.local().is_none());
        assert_eq!(hosts.remotes().count(), 2);
    }

    #[test]
    fn parse_rejects_non_object_entry() {
        assert!(matches!(HostsTopology::parse(&json!({ "local": 4 })), Err(Error::EntryNotAnObject{ .. })));
        assert!(matches!(HostsTopology::parse(&json!({ "node1": "node1" })), Err(Error::EntryNotAnObject{ .. })));
        assert!(matches!(HostsTopology::parse(&json!([ "node1" ])), Err(Error::NotAMap{ .. })));
    }

    #[test]
    fn parse_rejects_bad_max_procs() {
        assert!(matches!(HostsTopology::parse(&json!({ "local": { "max_procs": "4" } })), Err(Error::MaxProcsNotANumber{ .. })));
        assert!(matches!(HostsTopology::parse(&json!({ "local": { "max_procs": 0 } })), Err(Error::MaxProcsTooSmall{ .. })));
        assert!(matches!(HostsTopology::parse(&json!({ "node1": { "max_procs": -2 } })), Err(Error::MaxProcsTooSmall{ .. })));
        assert!(matches!(HostsTopology::parse(&json!({ "node1": { "max_procs": 0.5 } })), Err(Error::MaxProcsTooSmall{ .. })));
    }

    #[test]
    fn parse_truncates_fractional_max_procs() {
        let hosts = HostsTopology::parse(&json!({ "local": { "max_procs": 2.5 } })).unwrap();
        assert_eq!(hosts.local().map(NodeSpec::max_procs), Some(MaxProcs::Bounded(2)));
    }

    #[test]
    fn parse_rejects_bad_remote_fields() {
        assert!(matches!(HostsTopology::parse(&json!({ "node1": { "port": "3000" } })), Err(Error::PortNotANumber{ .. })));
        assert!(matches!(HostsTopology::parse(&json!({ "node1": { "port": 70000 } })), Err(Error::PortNotANumber{ .. })));
        assert!(matches!(HostsTopology::parse(&json!({ "node1": { "passwd": 1234 } })), Err(Error::PasswordNotAString{ .. })));
    }

    #[test]
    fn parse_is_all_or_nothing() {
        // The valid entries before (and after) the faulty one do not survive in any form
        let res = HostsTopology::parse(&json!({ "a": { "max_procs": 2 }, "b": { "max_procs": 0 }, "c": {} }));
        match res {
            Err(Error::MaxProcsTooSmall{ id, .. }) => assert_eq!(id, "b"),
            other => panic!("Expected MaxProcsTooSmall for 'b', got {:?}", other),
        }
    }

    #[test]
    fn reparse_is_idempotent() {
        let raw = json!({
            "local": { "max_procs": 4 },
            "node1": { "port": 3000 },
            "node2": { "max_procs": 8, "passwd": "hunter2" },
        });
        let hosts: HostsTopology = HostsTopology::parse(&raw).unwrap();
        let again: HostsTopology = HostsTopology::parse(&hosts.to_raw()).unwrap();
        assert_eq!(hosts, again);
        assert_eq!(hosts.to_raw(), again.to_raw());
    }

    #[test]
    fn local_only_is_unbounded() {
        let hosts = HostsTopology::local_only();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts.local().map(NodeSpec::max_procs), Some(MaxProcs::Unbounded));
        assert_eq!(hosts.to_raw(), json!({ "local": {} }));
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"local\": {{ \"max_procs\": 2 }}, \"10.0.0.5\": {{ \"port\": 2223, \"passwd\": \"x\" }} }}").unwrap();

        let hosts = HostsTopology::from_path(file.path()).unwrap();
        assert_eq!(hosts.local().map(NodeSpec::max_procs), Some(MaxProcs::Bounded(2)));
        assert!(hosts.get("10.0.0.5:2223").is_some());
    }

    #[test]
    fn from_path_reports_syntax_and_missing_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"local\": ").unwrap();
        assert!(matches!(HostsTopology::from_path(file.path()), Err(Error::FileParseError{ .. })));
        assert!(matches!(HostsTopology::from_path("/this/path/does/not/exist.json"), Err(Error::FileOpenError{ .. })));
    }
}





/***** CONSTANTS *****/
/// The identifier reserved for the machine that invokes klyng.
pub const LOCAL: &str = "local";
/// The port assumed for remote entries that do not specify one.
pub const DEFAULT_PORT: u16 = 2222;





/***** HELPER FUNCTIONS *****/
/// Returns a human-readable name for the type of the given JSON value.
#[inline]
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

/// Returns the given field of an entry, treating `null` the same as an absent field.
#[inline]
fn field<'e>(entry: &'e Map<String, Value>, name: &str) -> Option<&'e Value> {
    match entry.get(name) {
        None | Some(Value::Null) => None,
        Some(value)              => Some(value),
    }
}

/// Validates the `max_procs` field of an entry.
fn parse_max_procs(id: &str, raw: Option<&Value>) -> Result<MaxProcs, Error> {
    let raw: &Value = match raw {
        Some(raw) => raw,
        None      => { return Ok(MaxProcs::Unbounded); },
    };

    // Must be a number
    let count: f64 = match raw.as_f64() {
        Some(count) => count,
        None        => { return Err(Error::MaxProcsNotANumber{ id: id.into(), got: json_type(raw) }); },
    };

    // Must be at least one
    if count < 1.0 { return Err(Error::MaxProcsTooSmall{ id: id.into(), raw: raw.to_string() }); }
    match raw.as_u64() {
        Some(count) => Ok(MaxProcs::Bounded(count)),
        None        => Ok(MaxProcs::Bounded(count.trunc() as u64)),
    }
}

/// Validates the `port` field of a remote entry.
fn parse_port(id: &str, raw: Option<&Value>) -> Result<u16, Error> {
    let raw: &Value = match raw {
        Some(raw) => raw,
        None      => { return Ok(DEFAULT_PORT); },
    };
    match raw.as_u64() {
        Some(port) if port <= u16::MAX as u64 => Ok(port as u16),
        _                                     => Err(Error::PortNotANumber{ id: id.into(), raw: raw.to_string() }),
    }
}

/// Validates the `passwd` field of a remote entry.
fn parse_credential(id: &str, raw: Option<&Value>) -> Result<String, Error> {
    match raw {
        Some(Value::String(passwd)) => Ok(passwd.clone()),
        Some(raw)                   => Err(Error::PasswordNotAString{ id: id.into(), got: json_type(raw) }),
        None                        => Ok(String::new()),
    }
}





/***** LIBRARY *****/
/// Defines how many processes a node may host.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MaxProcs {
    /// At most this many (always at least one).
    Bounded(u64),
    /// As many as the job needs.
    Unbounded,
}

impl Display for MaxProcs {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        match self {
            MaxProcs::Bounded(max) => write!(f, "{}", max),
            MaxProcs::Unbounded    => write!(f, "unbounded"),
        }
    }
}



/// Defines a single, validated entry in the hosts file.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum NodeSpec {
    /// The machine that invokes klyng.
    Local {
        /// The number of processes this machine may host.
        max_procs : MaxProcs,
    },
    /// Some other machine, reached through its own beacon.
    Remote {
        /// The hostname or address of the machine.
        host       : String,
        /// The port on which the machine's beacon listens.
        port       : u16,
        /// The number of processes this machine may host.
        max_procs  : MaxProcs,
        /// The password with which we authenticate to the remote beacon.
        credential : String,
    },
}

impl NodeSpec {
    /// Validates a single raw entry of the hosts file.
    ///
    /// # Arguments
    /// - `id`: The identifier under which the entry was found.
    /// - `raw`: The raw entry itself.
    ///
    /// # Returns
    /// The key under which the node is stored together with its validated NodeSpec.
    ///
    /// # Errors
    /// This function errors with the first rule that the entry violates.
    pub fn from_entry(id: &str, raw: &Value) -> Result<(String, Self), Error> {
        let entry: &Map<String, Value> = match raw {
            Value::Object(entry) => entry,
            raw                  => { return Err(Error::EntryNotAnObject{ id: id.into(), got: json_type(raw) }); },
        };

        let max_procs: MaxProcs = parse_max_procs(id, field(entry, "max_procs"))?;
        if id == LOCAL { return Ok((LOCAL.into(), Self::Local{ max_procs })); }

        let port       : u16    = parse_port(id, field(entry, "port"))?;
        let credential : String = parse_credential(id, field(entry, "passwd"))?;

        // An identifier that is already qualified with its port is not qualified twice
        let suffix : String = format!(":{}", port);
        let host   : &str   = id.strip_suffix(suffix.as_str()).unwrap_or(id);
        Ok((format!("{}:{}", host, port), Self::Remote{ host: host.into(), port, max_procs, credential }))
    }

    /// Serializes this NodeSpec back to an entry in the hosts file format.
    pub fn to_raw(&self) -> Value {
        let mut entry: Map<String, Value> = Map::new();
        if let MaxProcs::Bounded(max) = self.max_procs() { entry.insert("max_procs".into(), Value::from(max)); }
        if let Self::Remote{ port, credential, .. } = self {
            entry.insert("port".into(), Value::from(*port));
            entry.insert("passwd".into(), Value::from(credential.as_str()));
        }
        Value::Object(entry)
    }



    /// Returns whether this is the local machine.
    #[inline]
    pub fn is_local(&self) -> bool { matches!(self, Self::Local{ .. }) }

    /// Returns the number of processes this node may host.
    #[inline]
    pub fn max_procs(&self) -> MaxProcs {
        match self {
            Self::Local{ max_procs }      => *max_procs,
            Self::Remote{ max_procs, .. } => *max_procs,
        }
    }

    /// Returns the port of the node's beacon, if it's remote.
    #[inline]
    pub fn port(&self) -> Option<u16> { if let Self::Remote{ port, .. } = self { Some(*port) } else { None } }

    /// Returns the credential for the node's beacon, if it's remote.
    #[inline]
    pub fn credential(&self) -> Option<&str> { if let Self::Remote{ credential, .. } = self { Some(credential.as_str()) } else { None } }
}



/// Defines the validated contents of a hosts file.
///
/// The local machine is stored under `local`, remote machines under `<host>:<port>`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HostsTopology {
    /// The nodes, by key.
    nodes : BTreeMap<String, NodeSpec>,
}

impl HostsTopology {
    /// Returns a topology with only the local machine, which may host any number of processes.
    #[inline]
    pub fn local_only() -> Self {
        Self {
            nodes : BTreeMap::from([ (LOCAL.into(), NodeSpec::Local{ max_procs: MaxProcs::Unbounded }) ]),
        }
    }

    /// Reads the hosts file at the given path.
    ///
    /// # Arguments
    /// - `path`: The path of the (JSON) hosts file.
    ///
    /// # Returns
    /// A new HostsTopology with the validated contents of the file.
    ///
    /// # Errors
    /// This function errors if we failed to read the file, if it's not valid JSON or if any of its entries are invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();

        // Open the file
        let handle: File = match File::open(path) {
            Ok(handle) => handle,
            Err(err)   => { return Err(Error::FileOpenError{ path: path.into(), err }); },
        };

        // Run it through serde
        let raw: Value = match serde_json::from_reader(handle) {
            Ok(raw)  => raw,
            Err(err) => { return Err(Error::FileParseError{ path: path.into(), err }); },
        };

        debug!("Validating hosts file '{}'...", path.display());
        Self::parse(&raw)
    }

    /// Validates the given raw hosts file contents.
    ///
    /// Missing `max_procs` become unbounded, missing `port`s become `2222` and missing `passwd`s become empty.
    ///
    /// # Arguments
    /// - `raw`: The parsed JSON of the hosts file.
    ///
    /// # Returns
    /// A new HostsTopology with the validated entries.
    ///
    /// # Errors
    /// This function errors on the first entry (in file order) that violates a rule, or that describes a node already described by an earlier entry. Nothing of the other entries is kept in that case.
    pub fn parse(raw: &Value) -> Result<Self, Error> {
        let entries: &Map<String, Value> = match raw {
            Value::Object(entries) => entries,
            raw                    => { return Err(Error::NotAMap{ got: json_type(raw) }); },
        };

        let mut nodes: BTreeMap<String, NodeSpec> = BTreeMap::new();
        for (id, entry) in entries {
            let (key, node): (String, NodeSpec) = NodeSpec::from_entry(id, entry)?;
            if nodes.contains_key(&key) { return Err(Error::DuplicateNode{ id: id.clone(), key }); }
            debug!("Hosts entry '{}' -> '{}' (max_procs: {})", id, key, node.max_procs());
            nodes.insert(key, node);
        }
        Ok(Self { nodes })
    }

    /// Serializes the topology back to the hosts file format.
    ///
    /// Parsing the result again yields the same topology.
    pub fn to_raw(&self) -> Value {
        Value::Object(self.nodes.iter().map(|(key, node)| (key.clone(), node.to_raw())).collect())
    }



    /// Returns the node stored under the given key (`local` or `<host>:<port>`).
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&NodeSpec> { self.nodes.get(key.as_ref()) }

    /// Returns the local node, if any.
    #[inline]
    pub fn local(&self) -> Option<&NodeSpec> { self.nodes.get(LOCAL) }

    /// Returns an iterator over the remote nodes.
    #[inline]
    pub fn remotes(&self) -> impl Iterator<Item = (&String, &NodeSpec)> { self.nodes.iter().filter(|(_, node)| !node.is_local()) }

    /// Returns the number of nodes.
    #[inline]
    pub fn len(&self) -> usize { self.nodes.len() }

    /// Returns whether there are no nodes at all.
    #[inline]
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Returns an iterator-by-reference over the nodes.
    #[inline]
    pub fn iter(&self) -> std::collections::btree_map::Iter<String, NodeSpec> { self.nodes.iter() }
}

impl<'a> IntoIterator for &'a HostsTopology {
    type Item     = (&'a String, &'a NodeSpec);
    type IntoIter = std::collections::btree_map::Iter<'a, String, NodeSpec>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
