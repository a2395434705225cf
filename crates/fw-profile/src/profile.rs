//! Top-level profile: a device's identity, network context, standalone
//! policies, and interactions. `Profile::load` is the single entry
//! point — read, include-expand, then build typed policies/interactions
//! (spec §2, §4.1).

use crate::device::DeviceInfo;
use crate::error::{ProfileError, Result, UnsupportedProtocol};
use crate::include;
use crate::interaction::Interaction;
use crate::network::NetworkInfo;
use crate::policy::{self, Policy};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Profile {
    pub device: DeviceInfo,
    pub network: NetworkInfo,
    pub single_policies: Vec<Policy>,
    pub interactions: Vec<Interaction>,
}

fn as_mapping(value: &Value, path: &Path, what: &str) -> Result<Mapping> {
    match value {
        Value::Mapping(m) => Ok(m.clone()),
        _ => Err(ProfileError::UnresolvedInclude {
            path: path.to_path_buf(),
            directive: what.to_string(),
            reason: "expected a mapping".to_string(),
        }),
    }
}

impl Profile {
    /// Loads and fully resolves a profile document: reads `path`,
    /// expands every `!include` directive relative to the file's parent
    /// directory, then builds the typed device/network/policy tree.
    /// Protocol clauses naming an unregistered protocol are recorded in
    /// the returned `unsupported` list rather than failing the load
    /// (spec §7).
    pub fn load(path: &Path) -> Result<(Profile, Vec<UnsupportedProtocol>)> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: Value = serde_yaml::from_str(&text).map_err(|source| ProfileError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let expanded = include::expand(root, base_dir, path)?;
        let top = as_mapping(&expanded, path, "document root")?;

        let device_value = top
            .get(Value::String("device-info".to_string()))
            .ok_or_else(|| ProfileError::MissingDeviceInfo {
                path: path.to_path_buf(),
            })?;
        let device: DeviceInfo = serde_yaml::from_value(device_value.clone())
            .map_err(|source| ProfileError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;

        let network = match top.get(Value::String("network-info".to_string())) {
            Some(v) => serde_yaml::from_value(v.clone()).map_err(|source| ProfileError::Yaml {
                path: path.to_path_buf(),
                source,
            })?,
            None => NetworkInfo::default(),
        };

        let mut single_policies = Vec::new();
        if let Some(Value::Sequence(seq)) = top.get(Value::String("single-policies".to_string())) {
            for (idx, item) in seq.iter().enumerate() {
                let map = as_mapping(item, path, "single-policies[]")?;
                let name = map
                    .get(Value::String("name".to_string()))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("single-{idx}"));
                single_policies.push(policy::from_mapping(&name, &map)?);
            }
        }

        let mut interactions = Vec::new();
        if let Some(Value::Sequence(seq)) = top.get(Value::String("interactions".to_string())) {
            for (idx, item) in seq.iter().enumerate() {
                let map = as_mapping(item, path, "interactions[]")?;
                let name = map
                    .get(Value::String("name".to_string()))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("interaction-{idx}"));
                let Some(Value::Sequence(policy_seq)) =
                    map.get(Value::String("policies".to_string()))
                else {
                    continue;
                };
                let raw_steps: Vec<Mapping> = policy_seq
                    .iter()
                    .map(|p| as_mapping(p, path, "interactions[].policies[]"))
                    .collect::<Result<_>>()?;
                interactions.push(Interaction::flatten(&name, &raw_steps)?);
            }
        }

        let mut unsupported = Vec::new();
        for policy in single_policies.iter().chain(
            interactions
                .iter()
                .flat_map(|i| i.steps.iter().map(|s| &s.policy)),
        ) {
            for clause in &policy.clauses {
                if crate::protocols::Protocol::from_name(&clause.name).is_none() {
                    unsupported.push(UnsupportedProtocol(clause.name.clone()));
                }
            }
        }

        Ok((
            Profile {
                device,
                network,
                single_policies,
                interactions,
            },
            unsupported,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_profile_with_single_policy_and_interaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            b"device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
single-policies:\n  - name: dns-query\n    ipv4:\n      dst: self\n\
interactions:\n  - name: handshake\n    policies:\n      - name: syn\n        ipv4:\n          dst: self\n",
        )
        .unwrap();

        let (profile, unsupported) = Profile::load(&path).unwrap();
        assert_eq!(profile.device.name, "bulb");
        assert_eq!(profile.single_policies.len(), 1);
        assert_eq!(profile.interactions.len(), 1);
        assert_eq!(profile.interactions[0].len(), 1);
        assert!(unsupported.is_empty());
    }

    #[test]
    fn missing_device_info_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"single-policies: []\n").unwrap();
        assert!(Profile::load(&path).is_err());
    }

    #[test]
    fn unregistered_protocol_is_collected_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            b"device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n\
single-policies:\n  - name: weird\n    sctp:\n      dst: self\n",
        )
        .unwrap();
        let (_profile, unsupported) = Profile::load(&path).unwrap();
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].0, "sctp");
    }
}
