//  ERRORS.rs
//    by Lut99
//
//  Created:
//    14 Feb 2023, 11:31:17
//  Last edited:
//    27 Feb 2023, 10:02:36
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `klyng-cfg` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;


/***** LIBRARY *****/
/// Errors that relate to reading and validating a hosts file.
///
/// Any of the validation errors means that none of the file is used.
#[derive(Debug)]
pub enum HostsError {
    /// Failed to open the given file.
    FileOpenError{ path: PathBuf, err: std::io::Error },
    /// Failed to read/parse the given file as JSON.
    FileParseError{ path: PathBuf, err: serde_json::Error },

    /// The toplevel value was not a map of entries.
    NotAMap{ got: &'static str },
    /// An entry in the file was not an object.
    EntryNotAnObject{ id: String, got: &'static str },
    /// An entry's `max_procs` was given but not a number.
    MaxProcsNotANumber{ id: String, got: &'static str },
    /// An entry's `max_procs` was smaller than one.
    MaxProcsTooSmall{ id: String, raw: String },
    /// A remote entry's `port` was given but not a (port) number.
    PortNotANumber{ id: String, raw: String },
    /// A remote entry's `passwd` was given but not a string.
    PasswordNotAString{ id: String, got: &'static str },
    /// Two entries describe the same node.
    DuplicateNode{ id: String, key: String },
}

impl Display for HostsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use HostsError::*;
        match self {
            FileOpenError{ path, err }  => write!(f, "Failed to open hosts file '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse hosts file '{}' as JSON: {}", path.display(), err),

            NotAMap{ got }                => write!(f, "INVALID: the hosts file is not an object of entries (got {})", got),
            EntryNotAnObject{ id, got }   => write!(f, "INVALID: entry '{}' in hosts file is not an object (got {})", id, got),
            MaxProcsNotANumber{ id, got } => write!(f, "INVALID: the processes count of entry '{}' is not a number (got {})", id, got),
            MaxProcsTooSmall{ id, raw }   => write!(f, "INVALID: the processes count of entry '{}' is less than one (got {})", id, raw),
            PortNotANumber{ id, raw }     => write!(f, "INVALID: the port number of entry '{}' is not a number (got {})", id, raw),
            PasswordNotAString{ id, got } => write!(f, "INVALID: the password of entry '{}' is not a string (got {})", id, got),
            DuplicateNode{ id, key }      => write!(f, "INVALID: entry '{}' describes node '{}', which is already described by another entry", id, key),
        }
    }
}

impl Error for HostsError {}



/// Errors that relate to the BeaconConfig struct.
#[derive(Debug)]
pub enum BeaconConfigError {
    /// Failed to open the given file.
    FileOpenError{ path: PathBuf, err: std::io::Error },
    /// Failed to read the given file.
    FileReadError{ path: PathBuf, err: std::io::Error },
    /// Failed to parse the given file as YAML.
    FileParseError{ path: PathBuf, err: serde_yaml::Error },
}

impl Display for BeaconConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use BeaconConfigError::*;
        match self {
            FileOpenError{ path, err }  => write!(f, "Failed to open beacon config file '{}': {}", path.display(), err),
            FileReadError{ path, err }  => write!(f, "Failed to read beacon config file '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse beacon config file '{}' as YAML: {}", path.display(), err),
        }
    }
}

impl Error for BeaconConfigError {}
