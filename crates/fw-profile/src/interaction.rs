//! An ordered sequence of policy steps representing one protocol
//! exchange (spec §3 `interactions`). A bidirectional step is expanded
//! into its own synthetic backward sibling immediately after the
//! forward step, preserving document order — grounded on
//! `original_source/src/translator/translator.py`'s interaction walk.

use crate::error::Result;
use crate::policy::{self, Policy};
use serde_yaml::{Mapping, Value};

/// One expanded step of an interaction: the policy itself, plus whether
/// this step is the synthetic backward leg of a bidirectional policy.
#[derive(Debug, Clone)]
pub struct Step {
    pub policy: Policy,
    pub is_backward: bool,
}

#[derive(Debug, Clone)]
pub struct Interaction {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Interaction {
    /// Builds the flattened step list from an interaction's raw policy
    /// list: a bidirectional policy contributes two steps (forward then
    /// backward), everything else contributes one.
    pub fn flatten(name: &str, raw_steps: &[Mapping]) -> Result<Interaction> {
        let mut steps = Vec::with_capacity(raw_steps.len());
        for (idx, raw) in raw_steps.iter().enumerate() {
            let step_name = raw
                .get(Value::String("name".to_string()))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{name}-{idx}"));
            let policy = policy::from_mapping(&step_name, raw)?;
            let bidirectional = policy.is_bidirectional;
            steps.push(Step {
                policy: policy.clone(),
                is_backward: false,
            });
            if bidirectional {
                let mut backward = policy;
                backward.name = format!("{step_name}-backward");
                steps.push(Step {
                    policy: backward,
                    is_backward: true,
                });
            }
        }
        Ok(Interaction {
            name: name.to_string(),
            steps,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_from_yaml(yaml: &str) -> Mapping {
        match serde_yaml::from_str(yaml).unwrap() {
            Value::Mapping(m) => m,
            _ => panic!("expected mapping"),
        }
    }

    #[test]
    fn bidirectional_step_inserts_backward_sibling_in_place() {
        let steps = vec![
            mapping_from_yaml("name: query\nipv4:\n  dst: self\n"),
            mapping_from_yaml("name: response\nbidirectional: true\nipv4:\n  dst: self\n"),
            mapping_from_yaml("name: ack\nipv4:\n  dst: self\n"),
        ];
        let interaction = Interaction::flatten("handshake", &steps).unwrap();
        assert_eq!(interaction.len(), 4);
        assert_eq!(interaction.steps[0].policy.name, "query");
        assert!(!interaction.steps[0].is_backward);
        assert_eq!(interaction.steps[1].policy.name, "response");
        assert!(!interaction.steps[1].is_backward);
        assert_eq!(interaction.steps[2].policy.name, "response-backward");
        assert!(interaction.steps[2].is_backward);
        assert_eq!(interaction.steps[3].policy.name, "ack");
    }
}
