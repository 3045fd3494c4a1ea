use crate::ShapeError;

/// Shape of one residual block, as seen by the solver that owns it.
///
/// Solvers implement this for their own residual block type, so that
/// poisoning, validation and reporting can size every buffer without
/// copying the block's metadata.
pub trait ResidualBlock {
    /// Number of residuals this block produces. At least 1.
    fn num_residuals(&self) -> usize;

    /// Number of scalars in each parameter block, in order. Each is at least 1.
    fn parameter_block_sizes(&self) -> &[usize];

    /// How many parameter blocks the residual depends on.
    fn num_parameter_blocks(&self) -> usize {
        self.parameter_block_sizes().len()
    }

    /// Number of entries in the Jacobian block for parameter block `i`,
    /// i.e. `num_residuals * size_i`.
    fn jacobian_len(&self, i: usize) -> usize {
        self.num_residuals() * self.parameter_block_sizes()[i]
    }
}

impl<B: ResidualBlock + ?Sized> ResidualBlock for &B {
    fn num_residuals(&self) -> usize {
        (**self).num_residuals()
    }

    fn parameter_block_sizes(&self) -> &[usize] {
        (**self).parameter_block_sizes()
    }

    fn num_parameter_blocks(&self) -> usize {
        (**self).num_parameter_blocks()
    }

    fn jacobian_len(&self, i: usize) -> usize {
        (**self).jacobian_len(i)
    }
}

/// A concrete residual block shape whose invariants were checked on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockShape {
    num_residuals: usize,
    parameter_block_sizes: Vec<usize>,
}

impl BlockShape {
    /// Create a shape with `num_residuals` residuals depending on parameter
    /// blocks of the given sizes.
    pub fn new(
        num_residuals: usize,
        parameter_block_sizes: impl Into<Vec<usize>>,
    ) -> Result<Self, ShapeError> {
        let parameter_block_sizes = parameter_block_sizes.into();
        if num_residuals == 0 {
            return Err(ShapeError::NoResiduals);
        }
        if let Some(index) = parameter_block_sizes.iter().position(|&size| size == 0) {
            return Err(ShapeError::EmptyParameterBlock { index });
        }
        // Every Jacobian length, and their total, must fit in a usize.
        let mut total = 0usize;
        for (index, &size) in parameter_block_sizes.iter().enumerate() {
            total = num_residuals
                .checked_mul(size)
                .and_then(|len| total.checked_add(len))
                .ok_or(ShapeError::TooLarge { index })?;
        }
        Ok(Self {
            num_residuals,
            parameter_block_sizes,
        })
    }

    /// Total number of Jacobian entries across every parameter block.
    pub fn total_jacobian_len(&self) -> usize {
        self.parameter_block_sizes.iter().sum::<usize>() * self.num_residuals
    }
}

impl ResidualBlock for BlockShape {
    fn num_residuals(&self) -> usize {
        self.num_residuals
    }

    fn parameter_block_sizes(&self) -> &[usize] {
        &self.parameter_block_sizes
    }
}

impl std::fmt::Display for BlockShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} parameter blocks x {} residuals",
            self.parameter_block_sizes.len(),
            self.num_residuals
        )
    }
}

// Generates only well-formed shapes, small enough to keep fuzz inputs cheap.
#[cfg(feature = "fuzz")]
impl<'a> arbitrary::Arbitrary<'a> for BlockShape {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let num_residuals = u.int_in_range(1..=16)?;
        let num_parameter_blocks = u.int_in_range(0..=4)?;
        let parameter_block_sizes = (0..num_parameter_blocks)
            .map(|_| u.int_in_range(1..=8))
            .collect::<arbitrary::Result<Vec<usize>>>()?;
        Ok(Self {
            num_residuals,
            parameter_block_sizes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_shapes() {
        assert!(matches!(
            BlockShape::new(0, vec![3]),
            Err(ShapeError::NoResiduals)
        ));
        assert!(matches!(
            BlockShape::new(2, vec![3, 0, 1]),
            Err(ShapeError::EmptyParameterBlock { index: 1 })
        ));
    }

    #[test]
    fn rejects_shapes_whose_jacobians_overflow() {
        assert_eq!(
            BlockShape::new(usize::MAX / 2 + 1, vec![2]),
            Err(ShapeError::TooLarge { index: 0 })
        );
        // Each block fits on its own, but not both together.
        let half = usize::MAX / 2;
        assert_eq!(
            BlockShape::new(1, vec![2, half, half]),
            Err(ShapeError::TooLarge { index: 2 })
        );
        let shape = BlockShape::new(usize::MAX / 2, vec![1, 1]).unwrap();
        assert_eq!(shape.jacobian_len(1), usize::MAX / 2);
        assert_eq!(shape.total_jacobian_len(), usize::MAX - 1);
    }

    #[test]
    fn jacobian_lengths() {
        let shape = BlockShape::new(2, vec![3, 1]).unwrap();
        assert_eq!(shape.num_parameter_blocks(), 2);
        assert_eq!(shape.jacobian_len(0), 6);
        assert_eq!(shape.jacobian_len(1), 2);
        assert_eq!(shape.total_jacobian_len(), 8);
        assert_eq!(shape.to_string(), "2 parameter blocks x 2 residuals");
    }

    #[test]
    fn no_parameter_blocks_is_allowed() {
        let shape = BlockShape::new(1, Vec::new()).unwrap();
        assert_eq!(shape.num_parameter_blocks(), 0);
        assert_eq!(shape.total_jacobian_len(), 0);
    }

    #[test]
    fn references_are_blocks_too() {
        fn residuals_of(block: impl ResidualBlock) -> usize {
            block.num_residuals()
        }
        let shape = BlockShape::new(4, vec![2]).unwrap();
        assert_eq!(residuals_of(&shape), 4);
        assert_eq!((&shape).jacobian_len(0), 8);
    }

    /// A solver block that stores its Jacobian lengths instead of multiplying.
    struct Precomputed {
        sizes: Vec<usize>,
        jacobian_lens: Vec<usize>,
    }

    impl ResidualBlock for Precomputed {
        fn num_residuals(&self) -> usize {
            3
        }

        fn parameter_block_sizes(&self) -> &[usize] {
            &self.sizes
        }

        fn num_parameter_blocks(&self) -> usize {
            self.jacobian_lens.len()
        }

        fn jacobian_len(&self, i: usize) -> usize {
            self.jacobian_lens[i]
        }
    }

    #[test]
    fn references_keep_overridden_methods() {
        let block = Precomputed {
            sizes: vec![2, 4],
            jacobian_lens: vec![7, 11, 13],
        };
        let by_ref = &block;
        assert_eq!(by_ref.num_parameter_blocks(), 3);
        assert_eq!(by_ref.jacobian_len(1), 11);
    }
}
