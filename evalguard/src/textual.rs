//! A small text format recording one evaluation of one residual block,
//! so that failures can be replayed outside the solver.
//!
//! ```text
//! # block
//! residuals 2
//! parameters 3, 1
//!
//! # evaluation
//! cost = 2.5
//! residuals = [1.0, unset]
//! p0 = [1.0, 2.0, 3.0]
//! p1 = [4.0]
//! j0 = [0.1, 0.2, 0.3, 0.4, 0.5, nan]
//! j1 = constant
//! ```
//!
//! `unset` stands for an entry the routine never wrote.
//! If no `j` line is given, Jacobians were not requested; otherwise a parameter
//! block without one is held constant. Arrays may be shorter than the block
//! requires, to record buffers with entries missing altogether.

mod parser;

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use winnow::Parser;

use crate::{BlockShape, Config, Evaluation, ResidualBlock, textual::parser::parse_recording};

/// One recorded evaluation.
#[derive(Debug, Clone)]
pub struct Recording {
    /// The block that was evaluated.
    pub shape: BlockShape,
    /// Where it was evaluated, one entry per parameter block.
    pub parameters: Vec<Vec<f64>>,
    /// Cost written by the routine.
    pub cost: f64,
    /// Residuals written by the routine. May be shorter than the block requires.
    pub residuals: Vec<f64>,
    /// `None` if Jacobians were not requested, inner `None` for constant blocks.
    pub jacobians: Option<Vec<Option<Vec<f64>>>>,
}

impl FromStr for Recording {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = parse_recording.parse(s).map_err(|e| e.to_string())?;
        Self::from_raw(raw)
    }
}

/// What the parser read, before checking it against the block's shape.
#[derive(Debug)]
struct RawRecording {
    num_residuals: usize,
    parameter_block_sizes: Vec<usize>,
    assignments: Vec<(Target, Value)>,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Target {
    Cost,
    Residuals,
    Parameter(usize),
    Jacobian(usize),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Cost => write!(f, "cost"),
            Target::Residuals => write!(f, "residuals"),
            Target::Parameter(i) => write!(f, "p{i}"),
            Target::Jacobian(i) => write!(f, "j{i}"),
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Scalar(f64),
    Array(Vec<f64>),
    Constant,
}

impl Recording {
    fn from_raw(raw: RawRecording) -> Result<Self, String> {
        let shape = BlockShape::new(raw.num_residuals, raw.parameter_block_sizes)
            .map_err(|e| e.to_string())?;
        let num_blocks = shape.num_parameter_blocks();

        let mut values = IndexMap::with_capacity(raw.assignments.len());
        for (target, value) in raw.assignments {
            let index = match target {
                Target::Parameter(i) | Target::Jacobian(i) => Some(i),
                Target::Cost | Target::Residuals => None,
            };
            if index.is_some_and(|i| i >= num_blocks) {
                return Err(format!(
                    "{target} is out of range, the block has {num_blocks} parameter blocks"
                ));
            }
            if values.insert(target, value).is_some() {
                return Err(format!("{target} is assigned more than once"));
            }
        }

        let cost = match values.get(&Target::Cost) {
            Some(Value::Scalar(cost)) => *cost,
            Some(_) => return Err("cost must be a single number".to_owned()),
            None => return Err("missing `cost = ...`".to_owned()),
        };
        let residuals = match values.get(&Target::Residuals) {
            Some(value) => expect_array(Target::Residuals, value)?,
            None => return Err("missing `residuals = [...]`".to_owned()),
        };

        let mut parameters = Vec::with_capacity(num_blocks);
        for (i, &size) in shape.parameter_block_sizes().iter().enumerate() {
            let target = Target::Parameter(i);
            let Some(value) = values.get(&target) else {
                return Err(format!("missing `{target} = [...]`"));
            };
            let block = expect_array(target, value)?;
            if block.len() != size {
                return Err(format!(
                    "{target} has {} values but parameter block {i} has size {size}",
                    block.len()
                ));
            }
            parameters.push(block);
        }

        let jacobians_requested = values.keys().any(|t| matches!(t, Target::Jacobian(_)));
        let jacobians = if jacobians_requested {
            let jacobians = (0..num_blocks)
                .map(|i| match values.get(&Target::Jacobian(i)) {
                    None | Some(Value::Constant) => Ok(None),
                    Some(value) => expect_array(Target::Jacobian(i), value).map(Some),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(jacobians)
        } else {
            None
        };

        Ok(Self {
            shape,
            parameters,
            cost,
            residuals,
            jacobians,
        })
    }

    /// Parameter blocks, borrowed the way the validators take them.
    pub fn parameter_slices(&self) -> Vec<&[f64]> {
        self.parameters.iter().map(Vec::as_slice).collect()
    }

    /// Jacobians, borrowed the way the validators take them.
    pub fn jacobian_slices(&self) -> Option<Vec<Option<&[f64]>>> {
        self.jacobians
            .as_ref()
            .map(|jacobians| jacobians.iter().map(Option::as_deref).collect())
    }

    /// See [`crate::is_evaluation_valid`].
    pub fn is_valid(&self) -> bool {
        let jacobians = self.jacobian_slices();
        crate::is_evaluation_valid(&self.shape, &self.residuals, jacobians.as_deref())
    }

    /// See [`crate::render_full_dump`].
    pub fn render_full_dump(&self) -> String {
        let parameters = self.parameter_slices();
        let jacobians = self.jacobian_slices();
        Evaluation::new(
            &self.shape,
            &parameters,
            self.cost,
            &self.residuals,
            jacobians.as_deref(),
        )
        .render_full_dump()
    }

    /// See [`crate::render_error_report_with_config`].
    pub fn render_error_report(&self, config: &Config) -> String {
        let parameters = self.parameter_slices();
        let jacobians = self.jacobian_slices();
        Evaluation::new(
            &self.shape,
            &parameters,
            self.cost,
            &self.residuals,
            jacobians.as_deref(),
        )
        .with_config(*config)
        .render_error_report()
    }
}

fn expect_array(target: Target, value: &Value) -> Result<Vec<f64>, String> {
    match value {
        Value::Array(values) => Ok(values.clone()),
        Value::Scalar(_) => Err(format!("{target} must be a list like `[1.0, 2.0]`")),
        Value::Constant => Err(format!("only Jacobians can be `constant`, not {target}")),
    }
}
