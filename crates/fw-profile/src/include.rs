//! Resolves `!include` directives over a raw `serde_yaml::Value` tree
//! before typed deserialization. A pure bottom-up tree rewrite —
//! grounded on `original_source/src/translator/yaml_loaders/IncludeLoader.py`,
//! replacing its custom PyYAML constructor hook with one recursive pass
//! (spec §9 REDESIGN FLAG). The literal `self` in ARP `sha`/`tha` and
//! IPv4/IPv6 `src`/`dst` fields is resolved later, once typed protocol
//! clauses exist, by `protocols::{arp, dhcp, ip}` via `ParseContext`.
//!
//! An include directive is written `!include path#member?key=value,...`:
//! - `path` is a document path relative to the profile root; the bare
//!   keyword `self` means "this same document".
//! - `#member` (optional, dotted) walks into the referenced document.
//! - `?key=value,...` (optional) overrides scalar leaves by dotted key
//!   after the member has been resolved.

use crate::error::{ProfileError, Result};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const INCLUDE_TAG: &str = "!include";

struct Directive {
    path: String,
    member: Vec<String>,
    overrides: HashMap<String, String>,
}

fn parse_directive(raw: &str) -> Directive {
    let (head, query) = match raw.split_once('?') {
        Some((h, q)) => (h, Some(q)),
        None => (raw, None),
    };
    let (path, member) = match head.split_once('#') {
        Some((p, m)) => (p.to_string(), m.split('.').map(str::to_string).collect()),
        None => (head.to_string(), Vec::new()),
    };
    let mut overrides = HashMap::new();
    if let Some(query) = query {
        for pair in query.split(',') {
            if let Some((k, v)) = pair.split_once('=') {
                overrides.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }
    Directive {
        path,
        member,
        overrides,
    }
}

fn walk_member(value: Value, member: &[String], path: &str) -> Result<Value> {
    let mut current = value;
    for key in member {
        current = match current {
            Value::Mapping(map) => map
                .get(Value::String(key.clone()))
                .cloned()
                .ok_or_else(|| ProfileError::UnresolvedInclude {
                    path: PathBuf::from(path),
                    directive: member.join("."),
                    reason: format!("no member {key:?}"),
                })?,
            _ => {
                return Err(ProfileError::UnresolvedInclude {
                    path: PathBuf::from(path),
                    directive: member.join("."),
                    reason: "cannot descend into a non-mapping".to_string(),
                })
            }
        };
    }
    Ok(current)
}

fn apply_overrides(value: &mut Value, overrides: &HashMap<String, String>) {
    for (dotted_key, raw_value) in overrides {
        set_dotted(value, dotted_key, raw_value);
    }
}

fn set_dotted(value: &mut Value, dotted_key: &str, raw_value: &str) {
    let mut segments = dotted_key.split('.');
    let Some(first) = segments.next() else { return };
    let rest: Vec<&str> = segments.collect();
    if let Value::Mapping(map) = value {
        let key = Value::String(first.to_string());
        if rest.is_empty() {
            map.insert(key, Value::String(raw_value.to_string()));
        } else if let Some(child) = map.get_mut(&key) {
            set_dotted(child, &rest.join("."), raw_value);
        }
    }
}

/// Resolves every `!include` directive in `root`, reading referenced
/// documents relative to `base_dir`. `self_values` supplies the literal
/// substitutions for a directive whose resolved scalar is exactly
/// `"self"` (restricted by the caller to ARP `sha`/`tha` and IPv4/IPv6
/// `src`/`dst`, per the original's narrower self-substitution scope);
/// pass an empty map to disable substitution entirely.
pub fn expand(root: Value, base_dir: &Path, profile_path: &Path) -> Result<Value> {
    expand_value(root, base_dir, profile_path, &root_for_self(profile_path, base_dir)?)
}

fn root_for_self(profile_path: &Path, base_dir: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(profile_path).map_err(|source| ProfileError::Io {
        path: profile_path.to_path_buf(),
        source,
    })?;
    let _ = base_dir;
    serde_yaml::from_str(&text).map_err(|source| ProfileError::Yaml {
        path: profile_path.to_path_buf(),
        source,
    })
}

fn expand_value(value: Value, base_dir: &Path, profile_path: &Path, self_doc: &Value) -> Result<Value> {
    match value {
        Value::Tagged(tagged) if tagged.tag.to_string() == INCLUDE_TAG => {
            let raw = match &tagged.value {
                Value::String(s) => s.clone(),
                other => crate::protocols::value_to_string(other),
            };
            resolve_include(&raw, base_dir, profile_path, self_doc)
        }
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                let expanded = expand_value(v, base_dir, profile_path, self_doc)?;
                out.insert(k, expanded);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for item in seq {
                out.push(expand_value(item, base_dir, profile_path, self_doc)?);
            }
            Ok(Value::Sequence(out))
        }
        other => Ok(other),
    }
}

fn resolve_include(raw: &str, base_dir: &Path, profile_path: &Path, self_doc: &Value) -> Result<Value> {
    let directive = parse_directive(raw);

    let mut resolved = if directive.path == "self" {
        self_doc.clone()
    } else {
        let full_path = base_dir.join(&directive.path);
        let text = std::fs::read_to_string(&full_path).map_err(|source| ProfileError::Io {
            path: full_path.clone(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ProfileError::Yaml {
            path: full_path,
            source,
        })?
    };

    if !directive.member.is_empty() {
        resolved = walk_member(resolved, &directive.member, &directive.path)?;
    }

    // Included subtrees can themselves contain further directives.
    resolved = expand_value(resolved, base_dir, profile_path, self_doc)?;

    if !directive.overrides.is_empty() {
        apply_overrides(&mut resolved, &directive.overrides);
    }

    Ok(resolved)
}
