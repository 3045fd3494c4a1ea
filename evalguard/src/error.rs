/// The shape metadata, or buffers sized from it, don't fit together.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum ShapeError {
    /// Every residual block must produce at least one residual.
    #[error("A residual block must have at least 1 residual")]
    NoResiduals,
    /// Every parameter block must hold at least one scalar.
    #[error("Parameter block {index} has size 0, but needs at least 1 scalar")]
    EmptyParameterBlock {
        /// Which parameter block was empty.
        index: usize,
    },
    /// The Jacobian entries of the residual block can't be counted in a `usize`.
    #[error("Parameter block {index} makes the Jacobian too large to address")]
    TooLarge {
        /// The parameter block whose Jacobian length overflowed.
        index: usize,
    },
    /// The wrong number of parameter blocks was given.
    #[error("Residual block has {expected} parameter blocks, but {found} were given")]
    ParameterCountMismatch {
        /// How many the residual block has.
        expected: usize,
        /// How many were given.
        found: usize,
    },
    /// A parameter block had the wrong number of scalars.
    #[error("Parameter block {index} should have {expected} values, but {found} were given")]
    ParameterSizeMismatch {
        /// Which parameter block.
        index: usize,
        /// Its size according to the residual block.
        expected: usize,
        /// How many values were given.
        found: usize,
    },
    /// The "held constant" mask doesn't have one flag per parameter block.
    #[error("Expected one constant flag per parameter block ({expected}), but got {found}")]
    ConstantMaskMismatch {
        /// How many parameter blocks there are.
        expected: usize,
        /// How many flags were given.
        found: usize,
    },
    /// Evaluation buffers were sized for a different residual block.
    #[error("Evaluation buffers were allocated for a different residual block")]
    BuffersDoNotMatchBlock,
}

/// Errors from running a user evaluation routine through [`crate::guard::evaluate`],
/// or from checking an [`crate::Evaluation`].
#[derive(thiserror::Error, Debug)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum EvaluationError {
    /// The inputs didn't match the residual block.
    #[error("{0}")]
    Shape(#[from] ShapeError),
    /// The user's routine reported that it could not evaluate at this point.
    #[error("User evaluation routine reported failure")]
    RoutineFailed,
    /// The user's routine returned, but left unwritten or non-finite values.
    #[error("User evaluation routine returned unwritten or non-finite values")]
    InvalidOutput {
        /// Full explanation of what went wrong, see [`crate::render_error_report`].
        report: String,
    },
}

impl EvaluationError {
    /// The rendered error report, if the output itself was invalid.
    pub fn report(&self) -> Option<&str> {
        match self {
            EvaluationError::InvalidOutput { report } => Some(report),
            _ => None,
        }
    }
}
