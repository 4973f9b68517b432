//! Image-quality statistics over features from a pretrained network.
//!
//! The network itself is supplied by the caller through [`FeatureExtractor`];
//! this module only prepares its input and reduces its outputs to IS, FID and
//! KID.

use burn::tensor::{backend::Backend, Tensor};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::{rngs::StdRng, seq::index::sample};

use crate::error::{CganError, Result};

/// Per-image outputs of the extractor, one row per image.
#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    /// Pooled activations used by FID and KID.
    pub pool: DMatrix<f64>,
    /// Class logits used by IS.
    pub logits: DMatrix<f64>,
}

/// Pretrained image network, e.g. Inception-v3.
///
/// Receives `[B, 3, H, W]` images with values in `[0, 255]`.
pub trait FeatureExtractor<B: Backend> {
    fn extract(&self, images: Tensor<B, 4>) -> Result<ExtractedFeatures>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricScores {
    pub inception_score: f64,
    pub fid: f64,
    pub kid: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricOptions {
    pub is_splits: usize,
    pub kid_subsets: usize,
    pub kid_subset_size: usize,
}

impl MetricOptions {
    pub fn for_batch(batch_size: usize) -> Self {
        Self {
            is_splits: 10,
            kid_subsets: 100,
            kid_subset_size: batch_size,
        }
    }
}

/// Map generator-range images `[-1, 1]` to `[0, 255]` with three channels.
pub fn prepare_for_extractor<B: Backend>(images: Tensor<B, 4>) -> Tensor<B, 4> {
    let scaled = ((images + 1.0) * 127.5).clamp(0.0, 255.0);
    if scaled.dims()[1] == 1 {
        scaled.repeat_dim(1, 3)
    } else {
        scaled
    }
}

/// Run the extractor on a real and a fake batch and reduce to all three scores.
pub fn evaluate<B: Backend>(
    extractor: &dyn FeatureExtractor<B>,
    real: Tensor<B, 4>,
    fake: Tensor<B, 4>,
    options: MetricOptions,
    rng: &mut StdRng,
) -> Result<MetricScores> {
    let real = extractor.extract(prepare_for_extractor(real))?;
    let fake = extractor.extract(prepare_for_extractor(fake))?;
    Ok(MetricScores {
        inception_score: inception_score(&fake.logits, options.is_splits)?,
        fid: frechet_distance(&real.pool, &fake.pool)?,
        kid: kernel_inception_distance(
            &real.pool,
            &fake.pool,
            options.kid_subsets,
            options.kid_subset_size,
            rng,
        )?,
    })
}

fn softmax_rows(logits: &DMatrix<f64>) -> DMatrix<f64> {
    let mut probs = logits.clone();
    for mut row in probs.row_iter_mut() {
        let max = row.max();
        row.apply(|v| *v = (*v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    probs
}

/// Mean over `splits` chunks of `exp(E_x[KL(p(y|x) || p(y))])`.
pub fn inception_score(logits: &DMatrix<f64>, splits: usize) -> Result<f64> {
    let n = logits.nrows();
    if n == 0 {
        return Err(CganError::InvalidConfig("inception score needs at least one image".to_string()));
    }
    let probs = softmax_rows(logits);
    let splits = splits.clamp(1, n);
    let chunk = n.div_ceil(splits);

    let mut scores = Vec::with_capacity(splits);
    for start in (0..n).step_by(chunk) {
        let part = probs.rows(start, chunk.min(n - start));
        let marginal = part.row_mean();
        let mut kl_sum = 0.0;
        for row in part.row_iter() {
            for (p, q) in row.iter().zip(marginal.iter()) {
                if *p > 0.0 {
                    kl_sum += p * (p.ln() - q.ln());
                }
            }
        }
        scores.push((kl_sum / part.nrows() as f64).exp());
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

fn mean_and_covariance(features: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let n = features.nrows();
    let mean = features.row_mean().transpose();
    let mut centered = features.clone();
    for mut row in centered.row_iter_mut() {
        row -= mean.transpose();
    }
    let cov = centered.transpose() * &centered / (n as f64 - 1.0);
    (mean, cov)
}

fn psd_sqrt(matrix: DMatrix<f64>) -> DMatrix<f64> {
    let eigen = SymmetricEigen::new(matrix);
    let roots = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    &eigen.eigenvectors * DMatrix::from_diagonal(&roots) * eigen.eigenvectors.transpose()
}

/// `||mu1 - mu2||^2 + Tr(S1 + S2 - 2 (S1 S2)^(1/2))`.
pub fn frechet_distance(real: &DMatrix<f64>, fake: &DMatrix<f64>) -> Result<f64> {
    if real.nrows() < 2 || fake.nrows() < 2 {
        return Err(CganError::InvalidConfig("FID needs at least two images per side".to_string()));
    }
    if real.ncols() != fake.ncols() {
        return Err(CganError::InvalidConfig(format!(
            "feature widths differ: {} vs {}",
            real.ncols(),
            fake.ncols()
        )));
    }
    let (mu1, sigma1) = mean_and_covariance(real);
    let (mu2, sigma2) = mean_and_covariance(fake);

    // Tr((S1 S2)^(1/2)) = Tr((sqrt(S1) S2 sqrt(S1))^(1/2)), the latter symmetric
    let root1 = psd_sqrt(sigma1.clone());
    let inner = &root1 * &sigma2 * &root1;
    let inner = (&inner + inner.transpose()) * 0.5;
    let trace_sqrt: f64 = SymmetricEigen::new(inner)
        .eigenvalues
        .iter()
        .map(|v| v.max(0.0).sqrt())
        .sum();

    let diff = mu1 - mu2;
    Ok(diff.dot(&diff) + sigma1.trace() + sigma2.trace() - 2.0 * trace_sqrt)
}

fn polynomial_kernel(x: &DMatrix<f64>, y: &DMatrix<f64>) -> DMatrix<f64> {
    let d = x.ncols() as f64;
    (x * y.transpose()).map(|v| (v / d + 1.0).powi(3))
}

/// Unbiased MMD^2 between two equally sized feature sets.
fn polynomial_mmd(x: &DMatrix<f64>, y: &DMatrix<f64>) -> f64 {
    let m = x.nrows() as f64;
    let k_xx = polynomial_kernel(x, x);
    let k_yy = polynomial_kernel(y, y);
    let k_xy = polynomial_kernel(x, y);
    let xx = k_xx.sum() - k_xx.trace();
    let yy = k_yy.sum() - k_yy.trace();
    (xx + yy) / (m * (m - 1.0)) - 2.0 * k_xy.sum() / (m * m)
}

/// Mean polynomial-kernel MMD^2 over `subsets` random subsets.
pub fn kernel_inception_distance(
    real: &DMatrix<f64>,
    fake: &DMatrix<f64>,
    subsets: usize,
    subset_size: usize,
    rng: &mut StdRng,
) -> Result<f64> {
    let n = real.nrows().min(fake.nrows());
    if subset_size < 2 || subset_size > n {
        return Err(CganError::InvalidConfig(format!(
            "KID subset size {} must be within [2, {}]",
            subset_size, n
        )));
    }
    let subsets = subsets.max(1);
    let mut total = 0.0;
    for _ in 0..subsets {
        let xi = sample(rng, real.nrows(), subset_size).into_vec();
        let yi = sample(rng, fake.nrows(), subset_size).into_vec();
        total += polynomial_mmd(&real.select_rows(xi.iter()), &fake.select_rows(yi.iter()));
    }
    Ok(total / subsets as f64)
}
