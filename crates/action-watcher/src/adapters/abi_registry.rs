//! # ABI Registry
//!
//! In-memory [`AbiDecoder`]: one [`AbiSerializer`] per account, loaded from
//! ABI JSON. A directory load reads every `<account>.abi.json` file in it.

use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{Abi, AbiError, AbiSerializer, Action, Name, NameError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::DecodeError;
use crate::ports::AbiDecoder;

const ABI_FILE_SUFFIX: &str = ".abi.json";

/// Errors loading ABIs into the registry.
#[derive(Debug, Error)]
pub enum AbiLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse abi {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// File name does not start with a valid account name.
    #[error("abi file {path} is not named after an account: {source}")]
    InvalidAccount { path: PathBuf, source: NameError },

    #[error("abi for {account} rejected: {source}")]
    Abi { account: Name, source: AbiError },
}

#[derive(Default)]
pub struct AbiRegistry {
    serializers: RwLock<HashMap<Name, Arc<AbiSerializer>>>,
}

impl AbiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the ABI for `account`.
    pub fn set_abi(&self, account: Name, abi: Abi) -> Result<(), AbiLoadError> {
        let serializer =
            AbiSerializer::new(abi).map_err(|source| AbiLoadError::Abi { account, source })?;
        self.serializers.write().insert(account, Arc::new(serializer));
        debug!(%account, "ABI registered");
        Ok(())
    }

    /// Forget `account`'s ABI. Returns whether one was registered.
    pub fn remove(&self, account: Name) -> bool {
        self.serializers.write().remove(&account).is_some()
    }

    pub fn contains(&self, account: Name) -> bool {
        self.serializers.read().contains_key(&account)
    }

    pub fn len(&self) -> usize {
        self.serializers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.serializers.read().is_empty()
    }

    /// Load every `<account>.abi.json` in `dir`. Other files are ignored.
    ///
    /// Returns how many ABIs were loaded. Stops at the first bad file.
    pub fn load_dir(&self, dir: &Path) -> Result<usize, AbiLoadError> {
        let io_err = |source| AbiLoadError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()
            .map_err(io_err)?;
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            let Some(account) = file_name.strip_suffix(ABI_FILE_SUFFIX) else {
                continue;
            };
            let account: Name = account
                .parse()
                .map_err(|source| AbiLoadError::InvalidAccount {
                    path: path.clone(),
                    source,
                })?;

            self.set_abi(account, read_abi(&path)?)?;
            loaded += 1;
        }

        info!(dir = %dir.display(), loaded, "ABI directory loaded");
        Ok(loaded)
    }
}

fn read_abi(path: &Path) -> Result<Abi, AbiLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| AbiLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AbiLoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl AbiDecoder for AbiRegistry {
    fn decode_action(&self, action: &Action, max_time: Duration) -> Result<Value, DecodeError> {
        let account = action.account;
        let serializer = self
            .serializers
            .read()
            .get(&account)
            .cloned()
            .ok_or(DecodeError::NoSchema { account })?;

        let type_name = serializer
            .get_action_type(action.name)
            .ok_or(DecodeError::UnknownAction {
                account,
                action: action.name,
            })?;

        serializer
            .binary_to_value(type_name, &action.data, max_time)
            .map_err(|e| match e {
                AbiError::Timeout(_) => DecodeError::Timeout {
                    account,
                    action: action.name,
                },
                other => DecodeError::Malformed {
                    account,
                    action: action.name,
                    reason: other.to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOTE_ABI: &str = r#"{
        "version": "eosio::abi/1.1",
        "structs": [
            { "name": "vote", "base": "", "fields": [
                { "name": "voter", "type": "name" },
                { "name": "weight", "type": "uint16" }
            ] }
        ],
        "actions": [{ "name": "vote", "type": "vote", "ricardian_contract": "" }]
    }"#;

    fn n(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn vote_action(account: &str, name: &str, data: Vec<u8>) -> Action {
        Action {
            account: n(account),
            name: n(name),
            authorization: vec![],
            data,
        }
    }

    fn vote_bytes(voter: &str, weight: u16) -> Vec<u8> {
        let mut data = n(voter).as_u64().to_le_bytes().to_vec();
        data.extend_from_slice(&weight.to_le_bytes());
        data
    }

    fn registry() -> AbiRegistry {
        let registry = AbiRegistry::new();
        registry
            .set_abi(n("bob"), serde_json::from_str(VOTE_ABI).unwrap())
            .unwrap();
        registry
    }

    #[test]
    fn test_decode_registered_action() {
        let value = registry()
            .decode_action(
                &vote_action("bob", "vote", vote_bytes("carol", 7)),
                Duration::from_secs(5),
            )
            .unwrap();
        assert_eq!(value, serde_json::json!({ "voter": "carol", "weight": 7 }));
    }

    #[test]
    fn test_decode_errors() {
        let registry = registry();
        let budget = Duration::from_secs(5);

        assert_eq!(
            registry.decode_action(&vote_action("alice", "vote", vec![]), budget),
            Err(DecodeError::NoSchema { account: n("alice") })
        );
        assert_eq!(
            registry.decode_action(&vote_action("bob", "unvote", vec![]), budget),
            Err(DecodeError::UnknownAction {
                account: n("bob"),
                action: n("unvote"),
            })
        );
        assert!(matches!(
            registry.decode_action(&vote_action("bob", "vote", vec![1, 2]), budget),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_remove() {
        let registry = registry();
        assert!(registry.contains(n("bob")));
        assert!(registry.remove(n("bob")));
        assert!(!registry.remove(n("bob")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bob.abi.json"), VOTE_ABI).unwrap();
        std::fs::write(dir.path().join("eosio.token.abi.json"), r#"{"version":"eosio::abi/1.0"}"#)
            .unwrap();
        std::fs::write(dir.path().join("README.md"), "not an abi").unwrap();

        let registry = AbiRegistry::new();
        assert_eq!(registry.load_dir(dir.path()).unwrap(), 2);
        assert!(registry.contains(n("bob")));
        assert!(registry.contains(n("eosio.token")));
    }

    #[test]
    fn test_load_dir_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bob.abi.json"), "{ not json").unwrap();
        assert!(matches!(
            AbiRegistry::new().load_dir(dir.path()),
            Err(AbiLoadError::Json { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Bob.abi.json"), VOTE_ABI).unwrap();
        assert!(matches!(
            AbiRegistry::new().load_dir(dir.path()),
            Err(AbiLoadError::InvalidAccount { .. })
        ));

        assert!(matches!(
            AbiRegistry::new().load_dir(Path::new("/definitely/not/here")),
            Err(AbiLoadError::Io { .. })
        ));
    }
}
