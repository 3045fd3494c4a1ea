use crate::{
    Config, EvaluationError, ResidualBlock,
    classify::{classify, is_array_valid},
};

/// Did the user's routine produce a usable evaluation of `block`?
///
/// Valid iff all `num_residuals` residuals are written and finite, and, when
/// Jacobians were requested, every requested Jacobian block is too.
/// A `None` Jacobian block means that parameter block is held constant,
/// which is never an error by itself. A Jacobian array with fewer entries
/// than there are parameter blocks is.
///
/// The cost is not part of this check, see [`is_cost_valid`].
/// Never allocates.
pub fn is_evaluation_valid<B: ResidualBlock + ?Sized>(
    block: &B,
    residuals: &[f64],
    jacobians: Option<&[Option<&[f64]>]>,
) -> bool {
    if !is_array_valid(block.num_residuals(), Some(residuals)) {
        return false;
    }
    match jacobians {
        Some(jacobians) => jacobians_valid(block, jacobians),
        None => true,
    }
}

/// Is the cost a written, finite value?
pub fn is_cost_valid(cost: f64) -> bool {
    classify(cost).is_ok()
}

/// The Jacobian half of [`is_evaluation_valid`], over any storage.
pub(crate) fn jacobians_valid<B, J>(block: &B, jacobians: &[Option<J>]) -> bool
where
    B: ResidualBlock + ?Sized,
    J: AsRef<[f64]>,
{
    if jacobians.len() < block.num_parameter_blocks() {
        return false;
    }
    (0..block.num_parameter_blocks()).all(|i| {
        let jacobian = jacobians[i].as_ref().map(<J as AsRef<[f64]>>::as_ref);
        is_jacobian_block_valid(block, i, jacobian)
    })
}

/// Is the Jacobian for parameter block `i` valid? Absent blocks are.
pub(crate) fn is_jacobian_block_valid<B: ResidualBlock + ?Sized>(
    block: &B,
    i: usize,
    jacobian: Option<&[f64]>,
) -> bool {
    jacobian.is_none() || is_array_valid(block.jacobian_len(i), jacobian)
}

/// Everything one call of a user's evaluation routine read and wrote,
/// borrowed from the solver that owns it.
///
/// Bundles the free functions of this crate for callers that want to pass
/// the evaluation around as one value.
pub struct Evaluation<'a, B: ?Sized> {
    block: &'a B,
    parameters: &'a [&'a [f64]],
    cost: f64,
    residuals: &'a [f64],
    jacobians: Option<&'a [Option<&'a [f64]>]>,
    config: Config,
}

impl<'a, B: ResidualBlock + ?Sized> Evaluation<'a, B> {
    /// Borrow one evaluation of `block`.
    pub fn new(
        block: &'a B,
        parameters: &'a [&'a [f64]],
        cost: f64,
        residuals: &'a [f64],
        jacobians: Option<&'a [Option<&'a [f64]>]>,
    ) -> Self {
        Self {
            block,
            parameters,
            cost,
            residuals,
            jacobians,
            config: Config::default(),
        }
    }

    /// Use this config when rendering reports.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// See [`is_evaluation_valid`].
    pub fn is_valid(&self) -> bool {
        is_evaluation_valid(self.block, self.residuals, self.jacobians)
    }

    /// See [`is_cost_valid`].
    pub fn is_cost_valid(&self) -> bool {
        is_cost_valid(self.cost)
    }

    /// See [`crate::render_full_dump`].
    pub fn render_full_dump(&self) -> String {
        crate::render_full_dump(
            self.block,
            self.parameters,
            self.cost,
            self.residuals,
            self.jacobians,
        )
    }

    /// See [`crate::render_error_report`].
    pub fn render_error_report(&self) -> String {
        crate::render_error_report_with_config(
            self.block,
            self.parameters,
            self.cost,
            self.residuals,
            self.jacobians,
            &self.config,
        )
    }

    /// Validate, rendering the error report only if the evaluation is invalid.
    pub fn check(&self) -> Result<(), EvaluationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(EvaluationError::InvalidOutput {
                report: self.render_error_report(),
            })
        }
    }
}
