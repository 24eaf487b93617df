//! Runtime phase lists for multiphase models.

use std::collections::HashSet;

use crate::error::{ModelError, ModelResult};

/// Ordered, non-empty list of distinct phase names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseList {
    names: Vec<String>,
}

impl PhaseList {
    pub fn new<I, S>(names: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ModelError::InvalidPhases {
                what: "at least one phase is required".into(),
            });
        }
        let mut seen = HashSet::new();
        for name in &names {
            if name.is_empty() {
                return Err(ModelError::InvalidPhases {
                    what: "phase names must not be empty".into(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(ModelError::InvalidPhases {
                    what: format!("phase {name} listed twice"),
                });
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, phase: &str) -> bool {
        self.names.iter().any(|n| n == phase)
    }
}

/// Name of the per-phase quantity `<prefix>_<phase><suffix>`, e.g. `z_liquid_in`.
pub fn phase_quantity_name(prefix: &str, phase: &str, suffix: &str) -> String {
    format!("{prefix}_{phase}{suffix}")
}
