use burn::tensor::{activation::log_sigmoid, activation::sigmoid, backend::Backend, ElementConversion, Tensor};

use crate::error::{CganError, Result};

/// Binary cross-entropy on raw logits, averaged over the batch.
///
/// Uses `log_sigmoid` on both branches so large logits of either sign stay
/// finite. `target` is the label every element is compared against (1 for
/// real, 0 for fake).
pub fn bce_with_logits<B: Backend>(logits: Tensor<B, 2>, target: f32) -> Tensor<B, 1> {
    let positive = log_sigmoid(logits.clone()) * target;
    let negative = log_sigmoid(logits.neg()) * (1.0 - target);
    (positive + negative).neg().mean()
}

/// Mean of `sigmoid(logits)`, the discriminator's average belief that its
/// inputs are real.
pub fn mean_probability<B: Backend>(logits: Tensor<B, 2>) -> f32 {
    sigmoid(logits).mean().into_scalar().elem::<f32>()
}

/// Read a scalar loss back to the host.
pub fn loss_value<B: Backend>(loss: &Tensor<B, 1>) -> f32 {
    loss.clone().into_scalar().elem::<f32>()
}

/// Validate loss value for training stability.
///
/// Non-finite values are logged. When `halt` is set they are also turned into
/// [`CganError::NonFiniteLoss`]; otherwise training carries on with the
/// value as-is.
pub fn validate_loss_value(tag: &'static str, value: f32, iteration: usize, halt: bool) -> Result<()> {
    if value.is_finite() {
        return Ok(());
    }
    log::warn!("{} is {} at iteration {}", tag, value, iteration);
    if halt {
        return Err(CganError::NonFiniteLoss { tag, value, iteration });
    }
    Ok(())
}
