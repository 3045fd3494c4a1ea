//! Pre-filling output buffers with a value no evaluation should ever produce,
//! so that entries the user's routine never wrote can be told apart afterwards.

use crate::ResidualBlock;

/// Marks an output entry as "not yet written".
///
/// Finite, so it never collides with the non-finite failure class, and far
/// outside anything a residual or derivative plausibly evaluates to.
pub const SENTINEL: f64 = 1e302;

/// Is `x` exactly the sentinel? This is a marker, not a measurement,
/// so no tolerance is applied.
#[inline(always)]
pub fn is_sentinel(x: f64) -> bool {
    x.to_bits() == SENTINEL.to_bits()
}

/// Overwrite the first `len` entries of `buffer` with [`SENTINEL`].
/// Entries past `len` are left alone. If the buffer is shorter than `len`,
/// the whole buffer is poisoned.
pub fn poison_array(len: usize, buffer: &mut [f64]) {
    let end = len.min(buffer.len());
    buffer[..end].fill(SENTINEL);
}

/// Poison every output buffer of one evaluation of `block`.
///
/// `jacobians` is `None` when no derivatives were requested. Individual
/// entries are `None` for parameter blocks held constant, and are skipped.
pub fn poison<B: ResidualBlock + ?Sized>(
    block: &B,
    cost: &mut f64,
    residuals: &mut [f64],
    jacobians: Option<&mut [Option<&mut [f64]>]>,
) {
    *cost = SENTINEL;
    poison_array(block.num_residuals(), residuals);
    if let Some(jacobians) = jacobians {
        poison_jacobians(block, jacobians);
    }
}

/// Like [`poison`]'s Jacobian half, but for any mutable storage,
/// e.g. owned `Vec<f64>` blocks.
pub(crate) fn poison_jacobians<B, J>(block: &B, jacobians: &mut [Option<J>])
where
    B: ResidualBlock + ?Sized,
    J: AsMut<[f64]>,
{
    for (i, jacobian) in jacobians
        .iter_mut()
        .enumerate()
        .take(block.num_parameter_blocks())
    {
        if let Some(jacobian) = jacobian {
            poison_array(block.jacobian_len(i), jacobian.as_mut());
        }
    }
}
