//! Run options.

use ef_block::ProblemType;
use ef_core::linspace;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimOptions {
    /// Start of the time grid.
    pub initial_time: f64,
    /// End of the time grid. Required for differential problems.
    pub end_time: Option<f64>,
    /// Intervals between `initial_time` and `end_time`.
    pub number_of_time_steps: usize,
    /// Time variable name handed to problems that declare none.
    pub time_variable_name: String,
    /// Skip inference and treat the problem as this type.
    pub problem_type: Option<ProblemType>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            initial_time: 0.0,
            end_time: None,
            number_of_time_steps: 100,
            time_variable_name: "t".to_owned(),
            problem_type: None,
        }
    }
}

impl SimOptions {
    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        let options: SimOptions = serde_yaml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_yaml_string(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.initial_time.is_finite() {
            return Err(SimError::InvalidArg {
                what: "initial_time must be finite",
            });
        }
        if let Some(end) = self.end_time {
            if !end.is_finite() || end <= self.initial_time {
                return Err(SimError::InvalidArg {
                    what: "end_time must be finite and after initial_time",
                });
            }
        }
        if self.number_of_time_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "number_of_time_steps must be positive",
            });
        }
        if self.time_variable_name.is_empty() {
            return Err(SimError::InvalidArg {
                what: "time_variable_name must not be empty",
            });
        }
        Ok(())
    }

    /// `number_of_time_steps + 1` evenly spaced points, both ends included.
    pub fn time_grid(&self) -> SimResult<Vec<f64>> {
        let end = self
            .end_time
            .ok_or_else(|| SimError::absent("end_time for a differential problem"))?;
        Ok(linspace(
            self.initial_time,
            end,
            self.number_of_time_steps + 1,
        ))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn grid_is_strictly_increasing(
            start in -10.0f64..10.0,
            span in 0.1f64..100.0,
            steps in 1usize..200
        ) {
            let opts = SimOptions {
                initial_time: start,
                end_time: Some(start + span),
                number_of_time_steps: steps,
                ..SimOptions::default()
            };
            prop_assert!(opts.validate().is_ok());
            let grid = opts.time_grid().unwrap();
            prop_assert_eq!(grid.len(), steps + 1);
            prop_assert_eq!(grid[0], start);
            prop_assert_eq!(grid[steps], start + span);
            prop_assert!(grid.windows(2).all(|w| w[1] > w[0]));
        }
    }
}
