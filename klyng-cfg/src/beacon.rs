//  BEACON.rs
//    by Lut99
//
//  Created:
//    20 Feb 2023, 13:02:44
//  Last edited:
//    27 Feb 2023, 09:55:12
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the `beacon.yml` file, which tells the client where to find
//!   the beacon and how to start it if it isn't running.
//

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::errors::BeaconConfigError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;


    #[test]
    fn defaults_match_ipc_settings() {
        let config = BeaconConfig::default();
        assert_eq!(config.address, "http://127.0.0.1:5647");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_interval(), Duration::from_millis(600));
        assert_eq!(config.timeout(), Duration::from_millis(2000));
        assert_eq!(config.executable, PathBuf::from("klyng-beacon"));
        assert!(config.args.is_empty());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "address: http://10.0.0.2:6000").unwrap();
        writeln!(file, "max_retries: 5").unwrap();

        let config = BeaconConfig::from_path(file.path()).unwrap();
        assert_eq!(config.address, "http://10.0.0.2:6000");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_interval, 600);
    }

    #[test]
    fn load_without_path_is_default() {
        let config = BeaconConfig::load(None::<&Path>).unwrap();
        assert_eq!(config.address, BeaconConfig::default().address);
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retries: [ nope").unwrap();
        assert!(matches!(BeaconConfig::from_path(file.path()), Err(Error::FileParseError{ .. })));
    }
}





/***** DEFAULTS *****/
/// The default address of the beacon.
#[inline]
fn default_address() -> String { "http://127.0.0.1:5647".into() }

/// The default number of times we retry connecting to the beacon.
#[inline]
fn default_max_retries() -> u32 { 3 }

/// The default number of milliseconds between connection attempts.
#[inline]
fn default_retry_interval() -> u64 { 600 }

/// The default number of milliseconds a single request to the beacon may take.
#[inline]
fn default_timeout() -> u64 { 2000 }

/// The default beacon executable.
#[inline]
fn default_executable() -> PathBuf { "klyng-beacon".into() }





/***** LIBRARY *****/
/// Defines how the client finds and starts the beacon.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BeaconConfig {
    /// The gRPC address of the beacon.
    #[serde(default = "default_address")]
    pub address        : String,
    /// The number of times connecting is retried before the beacon is considered unreachable.
    #[serde(default = "default_max_retries")]
    pub max_retries    : u32,
    /// The time (in milliseconds) between two connection attempts.
    #[serde(default = "default_retry_interval")]
    pub retry_interval : u64,
    /// The time (in milliseconds) after which a single connection attempt or request is given up on.
    #[serde(default = "default_timeout")]
    pub timeout        : u64,

    /// The executable that runs the beacon.
    #[serde(default = "default_executable")]
    pub executable : PathBuf,
    /// Any arguments to pass to the executable.
    #[serde(default)]
    pub args       : Vec<String>,
}

impl Default for BeaconConfig {
    #[inline]
    fn default() -> Self {
        Self {
            address        : default_address(),
            max_retries    : default_max_retries(),
            retry_interval : default_retry_interval(),
            timeout        : default_timeout(),

            executable : default_executable(),
            args       : vec![],
        }
    }
}

impl BeaconConfig {
    /// Loads the BeaconConfig from the given path, or uses the defaults if there is none.
    ///
    /// # Errors
    /// This function errors if a path is given but it cannot be read or has an invalid format.
    #[inline]
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self, Error> {
        match path {
            Some(path) => Self::from_path(path),
            None       => Ok(Self::default()),
        }
    }

    /// Constructor for the BeaconConfig that reads it from the given path.
    ///
    /// # Arguments
    /// - `path`: The path to read the BeaconConfig from.
    ///
    /// # Returns
    /// A new BeaconConfig instance with the contents defined in the file. Any field not in the file gets its default value.
    ///
    /// # Errors
    /// This function errors if the given file cannot be read or has an invalid format.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();

        // Get the raw file to parse
        let mut raw: String = String::new();
        {
            let mut handle: File = match File::open(path) {
                Ok(handle) => handle,
                Err(err)   => { return Err(Error::FileOpenError{ path: path.into(), err }); },
            };
            if let Err(err) = handle.read_to_string(&mut raw) { return Err(Error::FileReadError{ path: path.into(), err }); }
        }

        // Parse with serde
        match serde_yaml::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(err)   => Err(Error::FileParseError{ path: path.into(), err }),
        }
    }



    /// Returns the time between two connection attempts.
    #[inline]
    pub fn retry_interval(&self) -> Duration { Duration::from_millis(self.retry_interval) }

    /// Returns the time after which a single connection attempt or request is given up on.
    #[inline]
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout) }
}
