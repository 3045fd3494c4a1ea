//! Running a user's evaluation routine between poisoning and validation,
//! the way a solver evaluates one residual block.

use tracing::{debug, warn};

use crate::{
    Config, EvaluationError, ResidualBlock, ShapeError,
    classify::is_array_valid,
    evaluation::jacobians_valid,
    render_error_report_with_config, render_full_dump,
    sentinel::{poison_array, poison_jacobians},
};

/// Owned output storage for evaluating one residual block.
///
/// Allocate once per residual block and reuse it for every evaluation;
/// [`evaluate`] re-poisons it each time, so values from a previous call
/// can never pass for values written by the current one.
#[derive(Debug, Clone)]
pub struct EvaluationBuffers {
    cost: f64,
    residuals: Vec<f64>,
    /// `None` when no Jacobians are requested.
    /// Inner `None` for parameter blocks held constant.
    jacobians: Option<Vec<Option<Vec<f64>>>>,
    parameter_block_sizes: Vec<usize>,
}

impl EvaluationBuffers {
    /// Storage for the cost and residuals only.
    pub fn residuals_only<B: ResidualBlock + ?Sized>(block: &B) -> Self {
        Self {
            cost: 0.0,
            residuals: vec![0.0; block.num_residuals()],
            jacobians: None,
            parameter_block_sizes: block.parameter_block_sizes().to_vec(),
        }
    }

    /// Storage for the cost, residuals, and the Jacobian of every parameter block.
    pub fn with_all_jacobians<B: ResidualBlock + ?Sized>(block: &B) -> Self {
        let jacobians = (0..block.num_parameter_blocks())
            .map(|i| Some(vec![0.0; block.jacobian_len(i)]))
            .collect();
        Self {
            jacobians: Some(jacobians),
            ..Self::residuals_only(block)
        }
    }

    /// Storage for the cost, residuals, and the Jacobian of every parameter block
    /// not marked as held constant in `constant`.
    pub fn with_jacobians<B: ResidualBlock + ?Sized>(
        block: &B,
        constant: &[bool],
    ) -> Result<Self, ShapeError> {
        if constant.len() != block.num_parameter_blocks() {
            return Err(ShapeError::ConstantMaskMismatch {
                expected: block.num_parameter_blocks(),
                found: constant.len(),
            });
        }
        let jacobians = constant
            .iter()
            .enumerate()
            .map(|(i, &is_constant)| (!is_constant).then(|| vec![0.0; block.jacobian_len(i)]))
            .collect();
        Ok(Self {
            jacobians: Some(jacobians),
            ..Self::residuals_only(block)
        })
    }

    /// The cost written by the last evaluation.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// The residuals written by the last evaluation.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Were Jacobians requested at all?
    pub fn jacobians_requested(&self) -> bool {
        self.jacobians.is_some()
    }

    /// The Jacobian of parameter block `i` written by the last evaluation,
    /// or `None` if it wasn't requested.
    pub fn jacobian(&self, i: usize) -> Option<&[f64]> {
        self.jacobians.as_ref()?.get(i)?.as_deref()
    }

    /// Borrowed Jacobians, in the shape the free functions of this crate take.
    pub fn jacobian_views(&self) -> Option<Vec<Option<&[f64]>>> {
        self.jacobians
            .as_ref()
            .map(|jacobians| jacobians.iter().map(Option::as_deref).collect())
    }

    /// Were these buffers sized for `block`?
    pub fn fits<B: ResidualBlock + ?Sized>(&self, block: &B) -> bool {
        self.residuals.len() == block.num_residuals()
            && self.parameter_block_sizes == block.parameter_block_sizes()
    }

    /// Poison every buffer.
    pub fn poison<B: ResidualBlock + ?Sized>(&mut self, block: &B) {
        self.cost = crate::SENTINEL;
        poison_array(block.num_residuals(), &mut self.residuals);
        if let Some(jacobians) = &mut self.jacobians {
            poison_jacobians(block, jacobians);
        }
    }

    /// See [`crate::is_evaluation_valid`]. Never allocates.
    pub fn is_valid<B: ResidualBlock + ?Sized>(&self, block: &B) -> bool {
        is_array_valid(block.num_residuals(), Some(&self.residuals))
            && self
                .jacobians
                .as_ref()
                .is_none_or(|jacobians| jacobians_valid(block, jacobians))
    }

    /// See [`crate::render_full_dump`].
    pub fn render_full_dump<B: ResidualBlock + ?Sized>(
        &self,
        block: &B,
        parameters: &[&[f64]],
    ) -> String {
        let jacobians = self.jacobian_views();
        render_full_dump(
            block,
            parameters,
            self.cost,
            &self.residuals,
            jacobians.as_deref(),
        )
    }

    /// See [`crate::render_error_report_with_config`].
    pub fn render_error_report<B: ResidualBlock + ?Sized>(
        &self,
        block: &B,
        parameters: &[&[f64]],
        config: &Config,
    ) -> String {
        let jacobians = self.jacobian_views();
        render_error_report_with_config(
            block,
            parameters,
            self.cost,
            &self.residuals,
            jacobians.as_deref(),
            config,
        )
    }
}

/// Check that `parameters` has one block of the right size per parameter block.
pub fn check_parameters<B: ResidualBlock + ?Sized>(
    block: &B,
    parameters: &[&[f64]],
) -> Result<(), ShapeError> {
    if parameters.len() != block.num_parameter_blocks() {
        return Err(ShapeError::ParameterCountMismatch {
            expected: block.num_parameter_blocks(),
            found: parameters.len(),
        });
    }
    for (index, (values, &expected)) in parameters
        .iter()
        .zip(block.parameter_block_sizes())
        .enumerate()
    {
        if values.len() != expected {
            return Err(ShapeError::ParameterSizeMismatch {
                index,
                expected,
                found: values.len(),
            });
        }
    }
    Ok(())
}

/// Evaluate `block` at `parameters` with the user's `routine`, and check what it wrote.
///
/// The routine gets the parameters, then the cost, residuals and (if requested)
/// Jacobians to fill in, and returns whether it could evaluate at this point.
/// All outputs are poisoned with [`crate::SENTINEL`] beforehand.
///
/// If the routine leaves anything unwritten or non-finite, the error report is
/// rendered, logged at `warn` level (unless [`Config::log_reports`] is off) and
/// returned in [`EvaluationError::InvalidOutput`].
pub fn evaluate<B, F>(
    block: &B,
    parameters: &[&[f64]],
    buffers: &mut EvaluationBuffers,
    config: &Config,
    routine: F,
) -> Result<(), EvaluationError>
where
    B: ResidualBlock + ?Sized,
    F: FnOnce(&[&[f64]], &mut f64, &mut [f64], Option<&mut [Option<&mut [f64]>]>) -> bool,
{
    check_parameters(block, parameters)?;
    if !buffers.fits(block) {
        return Err(ShapeError::BuffersDoNotMatchBlock.into());
    }
    buffers.poison(block);

    let succeeded = {
        let EvaluationBuffers {
            cost,
            residuals,
            jacobians,
            ..
        } = &mut *buffers;
        let mut jacobian_views: Option<Vec<Option<&mut [f64]>>> = jacobians
            .as_mut()
            .map(|jacobians| jacobians.iter_mut().map(Option::as_deref_mut).collect());
        routine(
            parameters,
            cost,
            residuals.as_mut_slice(),
            jacobian_views.as_deref_mut(),
        )
    };
    if !succeeded {
        debug!(
            num_residuals = block.num_residuals(),
            num_parameter_blocks = block.num_parameter_blocks(),
            "evaluation routine reported failure"
        );
        return Err(EvaluationError::RoutineFailed);
    }

    if buffers.is_valid(block) {
        return Ok(());
    }
    let report = buffers.render_error_report(block, parameters, config);
    if config.log_reports {
        warn!(
            num_residuals = block.num_residuals(),
            num_parameter_blocks = block.num_parameter_blocks(),
            "evaluation routine returned invalid values\n{report}"
        );
    }
    Err(EvaluationError::InvalidOutput { report })
}
