// train.rs - conditional GAN training loop
use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor, TensorData,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::architectures::{Discriminator, Generator, ModelConfig};
use super::data::{condition_map, one_hot, Batch, BatchLoader, LabeledImageDataset};
use super::loss_utils::{bce_with_logits, loss_value, mean_probability, validate_loss_value};
use super::metrics::{evaluate, FeatureExtractor, MetricOptions};
use super::sink::{
    self, iteration_dir, load_discriminator, load_generator, save_checkpoints, save_grid, CheckpointPaths,
    ScalarSink,
};
use crate::error::{self, CganError};

/// Where the sample grid's conditional noise comes from at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
    /// Per-class noise drawn once at start-up.
    Fixed,
    /// The first `grid_size` rows of the current batch's conditional noise.
    Batch,
}

/// Training configuration for the conditional GAN
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Model configuration
    pub model: ModelConfig,
    #[config(default = 5)]
    pub epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    /// Generator learning rate.
    #[config(default = 2e-4)]
    pub lr: f64,
    /// Discriminator learning rate is `lr * lr_ratio`.
    #[config(default = 1.0)]
    pub lr_ratio: f64,
    #[config(default = 0.5)]
    pub beta1: f32,
    #[config(default = 0.999)]
    pub beta2: f32,
    /// Batches between save events.
    #[config(default = 50)]
    pub save_frequency: usize,
    #[config(default = 1)]
    pub seed: u64,
    #[config(default = false)]
    pub dry_run: bool,
    #[config(default = 100)]
    pub grid_size: usize,
    #[config(default = "SampleSource::Fixed")]
    pub sample_source: SampleSource,
    #[config(default = false)]
    pub compute_metrics: bool,
    #[config(default = false)]
    pub halt_on_non_finite_loss: bool,
    #[config(default = 1)]
    pub num_workers: usize,
    /// Generator checkpoint to resume from.
    pub net_g: Option<String>,
    /// Discriminator checkpoint to resume from.
    pub net_d: Option<String>,
}

impl TrainingConfig {
    pub fn validate(&self) -> error::Result<()> {
        if self.batch_size == 0 {
            return Err(CganError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if self.save_frequency == 0 {
            return Err(CganError::InvalidConfig("save_frequency must be positive".to_string()));
        }
        if !(self.lr > 0.0 && self.lr_ratio > 0.0) {
            return Err(CganError::InvalidConfig(format!(
                "learning rates must be positive (lr={}, lr_ratio={})",
                self.lr, self.lr_ratio
            )));
        }
        self.model.geometry()?;
        Ok(())
    }

    pub fn generator_lr(&self) -> f64 {
        self.lr
    }

    pub fn discriminator_lr(&self) -> f64 {
        self.lr * self.lr_ratio
    }

    fn adam(&self) -> AdamConfig {
        AdamConfig::new().with_beta_1(self.beta1).with_beta_2(self.beta2)
    }
}

/// Targets the losses compare against; fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdversarialLabels {
    pub real: f32,
    pub fake: f32,
}

impl Default for AdversarialLabels {
    fn default() -> Self {
        Self { real: 1.0, fake: 0.0 }
    }
}

/// Mutable bookkeeping threaded through every step.
#[derive(Debug, Clone)]
pub struct RunState {
    pub rng: StdRng,
    pub labels: AdversarialLabels,
    pub iteration: usize,
}

impl RunState {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            labels: AdversarialLabels::default(),
            iteration: 0,
        }
    }
}

/// `[rows, nz]` standard normal noise drawn from `rng`.
pub fn sample_noise<B: Backend>(rng: &mut StdRng, rows: usize, nz: usize, device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = (0..rows * nz).map(|_| rng.sample(StandardNormal)).collect();
    Tensor::from_data(TensorData::new(values, [rows, nz]), device)
}

/// Noise concatenated with conditions along the feature axis.
pub fn conditional_noise<B: Backend>(noise: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
    Tensor::cat(vec![noise, conditions], 1)
}

/// `max(1, grid_size / num_classes)` noise vectors per class, each paired with
/// the one-hot condition of its class, grouped by class.
pub fn fixed_sample_noise<B: Backend>(
    rng: &mut StdRng,
    num_classes: usize,
    nz: usize,
    grid_size: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let per_class = (grid_size / num_classes.max(1)).max(1);
    let rows = per_class * num_classes;
    let noise = sample_noise::<B>(rng, rows, nz, device);

    let conditions: Vec<f32> = (0..num_classes)
        .flat_map(|c| std::iter::repeat(one_hot(c, num_classes)).take(per_class))
        .flatten()
        .collect();
    let conditions = Tensor::from_data(TensorData::new(conditions, [rows, num_classes]), device);
    conditional_noise(noise, conditions)
}

/// Inputs shared by both halves of one adversarial step.
#[derive(Debug, Clone)]
pub struct StepInputs<B: Backend> {
    pub real: Tensor<B, 4>,
    pub conditional_noise: Tensor<B, 2>,
    pub condition_map: Tensor<B, 4>,
}

#[derive(Debug, Clone)]
pub struct DiscriminatorReport<B: Backend> {
    pub loss: f32,
    /// Mean D output on real images.
    pub d_x: f32,
    /// Mean D output on fakes, before the update.
    pub d_g_z1: f32,
    /// Generator output, still attached to the generator graph.
    pub fake: Tensor<B, 4>,
}

#[derive(Debug, Clone, Copy)]
pub struct GeneratorReport {
    pub loss: f32,
    /// Mean D output on fakes, after the discriminator update.
    pub d_g_z2: f32,
}

/// Update the discriminator on a real batch (label real) and a detached fake
/// batch (label fake). Generator parameters receive no gradient.
pub fn discriminator_step<B, O>(
    discriminator: Discriminator<B>,
    optimizer: &mut O,
    lr: f64,
    generator: &Generator<B>,
    inputs: &StepInputs<B>,
    labels: &AdversarialLabels,
) -> (Discriminator<B>, DiscriminatorReport<B>)
where
    B: AutodiffBackend,
    O: Optimizer<Discriminator<B>, B>,
{
    let real_logits = discriminator.forward(Tensor::cat(
        vec![inputs.real.clone(), inputs.condition_map.clone()],
        1,
    ));
    let loss_real = bce_with_logits(real_logits.clone(), labels.real);

    let fake = generator.forward(inputs.conditional_noise.clone());
    let fake_logits = discriminator.forward(Tensor::cat(
        vec![fake.clone().detach(), inputs.condition_map.clone()],
        1,
    ));
    let loss_fake = bce_with_logits(fake_logits.clone(), labels.fake);

    let loss = loss_real + loss_fake;
    let report = DiscriminatorReport {
        loss: loss_value(&loss),
        d_x: mean_probability(real_logits),
        d_g_z1: mean_probability(fake_logits),
        fake,
    };

    let grads = GradientsParams::from_grads(loss.backward(), &discriminator);
    (optimizer.step(lr, discriminator, grads), report)
}

/// Update the generator so the (already updated) discriminator labels its
/// output real.
pub fn generator_step<B, O>(
    generator: Generator<B>,
    optimizer: &mut O,
    lr: f64,
    discriminator: &Discriminator<B>,
    fake: Tensor<B, 4>,
    condition_map: Tensor<B, 4>,
    labels: &AdversarialLabels,
) -> (Generator<B>, GeneratorReport)
where
    B: AutodiffBackend,
    O: Optimizer<Generator<B>, B>,
{
    let logits = discriminator.forward(Tensor::cat(vec![fake, condition_map], 1));
    let loss = bce_with_logits(logits.clone(), labels.real);
    let report = GeneratorReport {
        loss: loss_value(&loss),
        d_g_z2: mean_probability(logits),
    };

    let grads = GradientsParams::from_grads(loss.backward(), &generator);
    (optimizer.step(lr, generator, grads), report)
}

/// Everything recorded about one batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchReport {
    pub loss_d: f32,
    pub loss_g: f32,
    pub d_x: f32,
    pub d_g_z1: f32,
    pub d_g_z2: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingSummary {
    pub discriminator_steps: usize,
    pub generator_steps: usize,
    pub progress_lines: Vec<String>,
    pub checkpoints: Vec<CheckpointPaths>,
    /// Iteration of the last processed batch.
    pub last_iteration: usize,
}

/// `[{epoch}/{epochs}][{step}/{batches}] ({iteration})` followed by losses and
/// mean discriminator outputs.
pub fn progress_line(
    epoch: usize,
    epochs: usize,
    i_step: usize,
    num_batches: usize,
    iteration: usize,
    report: &BatchReport,
) -> String {
    format!(
        "[{}/{}][{:>3}/{}] ({:>4})   Loss_D: {:.3}   Loss_G {:.3}   D(x): {:.3}   D(g(z)): {:.3} -> {:.3}",
        epoch,
        epochs,
        i_step,
        num_batches,
        iteration,
        report.loss_d,
        report.loss_g,
        report.d_x,
        report.d_g_z1,
        report.d_g_z2
    )
}

/// Conditional GAN training state: both networks, their optimizers and the
/// run bookkeeping.
pub struct Trainer<B: AutodiffBackend> {
    pub config: TrainingConfig,
    pub generator: Generator<B>,
    pub discriminator: Discriminator<B>,
    pub state: RunState,
    optim_g: OptimizerAdaptor<Adam, Generator<B>, B>,
    optim_d: OptimizerAdaptor<Adam, Discriminator<B>, B>,
    fixed_noise: Tensor<B::InnerBackend, 2>,
    extractor: Option<Box<dyn FeatureExtractor<B::InnerBackend>>>,
    run_dir: PathBuf,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Build both networks, seed every RNG from `config.seed`, load resume
    /// checkpoints and persist the configuration to `<run_dir>/config.json`.
    pub fn new(config: TrainingConfig, run_dir: impl AsRef<Path>, device: &B::Device) -> error::Result<Self> {
        config.validate()?;
        let run_dir = run_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&run_dir)?;
        config.save(run_dir.join("config.json"))?;

        B::seed(config.seed);
        let mut state = RunState::new(config.seed);

        let mut generator = config.model.init_generator::<B>(device)?;
        let mut discriminator = config.model.init_discriminator::<B>(device)?;
        if let Some(path) = &config.net_g {
            generator = load_generator(generator, Path::new(path), device)?;
        }
        if let Some(path) = &config.net_d {
            discriminator = load_discriminator(discriminator, Path::new(path), device)?;
        }

        let optim_g = config.adam().init::<B, Generator<B>>();
        let optim_d = config.adam().init::<B, Discriminator<B>>();

        let fixed_noise = fixed_sample_noise::<B::InnerBackend>(
            &mut state.rng,
            config.model.num_classes,
            config.model.nz,
            config.grid_size,
            device,
        );

        log::info!(
            "trainer ready: seed={} image_size={} classes={} lr_g={} lr_d={} run_dir={}",
            config.seed,
            config.model.image_size,
            config.model.num_classes,
            config.generator_lr(),
            config.discriminator_lr(),
            run_dir.display()
        );

        Ok(Self {
            config,
            generator,
            discriminator,
            state,
            optim_g,
            optim_d,
            fixed_noise,
            extractor: None,
            run_dir,
            device: device.clone(),
        })
    }

    /// Feature extractor used for IS, FID and KID at save events.
    pub fn with_extractor(mut self, extractor: Box<dyn FeatureExtractor<B::InnerBackend>>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn check_dataset(&self, dataset: &dyn LabeledImageDataset) -> error::Result<()> {
        let model = &self.config.model;
        if dataset.is_empty() {
            return Err(CganError::EmptyDataset);
        }
        if dataset.num_classes() != model.num_classes
            || dataset.num_channels() != model.num_channels
            || dataset.image_size() != model.image_size
        {
            return Err(CganError::InvalidConfig(format!(
                "dataset provides {} classes, {} channels, {}px images but the model expects {}, {}, {}px",
                dataset.num_classes(),
                dataset.num_channels(),
                dataset.image_size(),
                model.num_classes,
                model.num_channels,
                model.image_size
            )));
        }
        Ok(())
    }

    /// One discriminator step then one generator step on `batch`.
    pub fn train_batch(&mut self, batch: Batch<B>) -> error::Result<(BatchReport, StepInputs<B>, Tensor<B, 4>)> {
        let [b, c, h, w] = batch.images.dims();
        let model = &self.config.model;
        if [c, h, w] != [model.num_channels, model.image_size, model.image_size] {
            return Err(CganError::ModelShapeMismatch {
                expected: [model.num_channels, model.image_size, model.image_size],
                found: [c, h, w],
            });
        }
        let noise = sample_noise::<B>(&mut self.state.rng, b, self.config.model.nz, &self.device);
        let inputs = StepInputs {
            conditional_noise: conditional_noise(noise, batch.conditions.clone()),
            condition_map: condition_map(batch.conditions, h, w),
            real: batch.images,
        };

        let (discriminator, d_report) = discriminator_step(
            self.discriminator.clone(),
            &mut self.optim_d,
            self.config.discriminator_lr(),
            &self.generator,
            &inputs,
            &self.state.labels,
        );
        self.discriminator = discriminator;

        let fake = d_report.fake.clone();
        let (generator, g_report) = generator_step(
            self.generator.clone(),
            &mut self.optim_g,
            self.config.generator_lr(),
            &self.discriminator,
            d_report.fake,
            inputs.condition_map.clone(),
            &self.state.labels,
        );
        self.generator = generator;

        let halt = self.config.halt_on_non_finite_loss;
        validate_loss_value(sink::LOSS_D, d_report.loss, self.state.iteration, halt)?;
        validate_loss_value(sink::LOSS_G, g_report.loss, self.state.iteration, halt)?;

        let report = BatchReport {
            loss_d: d_report.loss,
            loss_g: g_report.loss,
            d_x: d_report.d_x,
            d_g_z1: d_report.d_g_z1,
            d_g_z2: g_report.d_g_z2,
        };
        Ok((report, inputs, fake.detach()))
    }

    /// Train for `epochs` passes over `dataset` (one batch of one epoch in
    /// dry-run mode).
    pub fn train(&mut self, dataset: &dyn LabeledImageDataset, scalars: &mut dyn ScalarSink) -> error::Result<TrainingSummary> {
        self.check_dataset(dataset)?;
        if self.config.compute_metrics && self.extractor.is_none() {
            log::warn!("compute_metrics is set but no feature extractor was supplied; metrics are skipped");
        }

        let loader = BatchLoader::new(self.config.batch_size, self.config.num_workers)?;
        let epochs = if self.config.dry_run { 1 } else { self.config.epochs };
        let mut summary = TrainingSummary::default();

        for epoch in 1..=epochs {
            let batches = loader.epoch(dataset.len(), &mut self.state.rng);
            let num_batches = batches.len();
            log::debug!("epoch {}/{}: {} batches", epoch, epochs, num_batches);

            for (i_step, indices) in batches.iter().enumerate() {
                let iteration = (epoch - 1) * num_batches + i_step;
                self.state.iteration = iteration;

                let batch = loader.load::<B>(dataset, indices, &mut self.state.rng, &self.device)?;
                let (report, inputs, fake) = self.train_batch(batch)?;
                summary.discriminator_steps += 1;
                summary.generator_steps += 1;
                summary.last_iteration = iteration;

                scalars.add_scalar(sink::LOSS_D, report.loss_d, iteration)?;
                scalars.add_scalar(sink::LOSS_G, report.loss_g, iteration)?;
                scalars.add_scalar(sink::PROB_REAL, report.d_x, iteration)?;
                scalars.add_scalar(sink::PROB_FAKE_BEFORE, report.d_g_z1, iteration)?;
                scalars.add_scalar(sink::PROB_FAKE_AFTER, report.d_g_z2, iteration)?;

                if i_step % self.config.save_frequency == 0 {
                    let line = progress_line(epoch, epochs, i_step, num_batches, iteration, &report);
                    log::info!("{}", line);
                    summary.progress_lines.push(line);

                    let paths = self.save_event(iteration, &inputs, fake, scalars)?;
                    summary.checkpoints.push(paths);
                }

                if self.config.dry_run {
                    break;
                }
            }
        }

        scalars.flush()?;
        log::info!(
            "training finished: {} discriminator steps, {} generator steps",
            summary.discriminator_steps,
            summary.generator_steps
        );
        Ok(summary)
    }

    /// Metrics, sample grid and checkpoints for `iteration`, in that order.
    fn save_event(
        &mut self,
        iteration: usize,
        inputs: &StepInputs<B>,
        fake: Tensor<B, 4>,
        scalars: &mut dyn ScalarSink,
    ) -> error::Result<CheckpointPaths> {
        if self.config.compute_metrics {
            if let Some(extractor) = &self.extractor {
                let batch_size = fake.dims()[0];
                if batch_size < 2 {
                    log::debug!("skipping metrics for a batch of {}", batch_size);
                } else {
                    let scores = evaluate(
                        extractor.as_ref(),
                        inputs.real.clone().inner(),
                        fake.inner(),
                        MetricOptions::for_batch(batch_size),
                        &mut self.state.rng,
                    )?;
                    scalars.add_scalar(sink::METRIC_IS, scores.inception_score as f32, iteration)?;
                    scalars.add_scalar(sink::METRIC_FID, scores.fid as f32, iteration)?;
                    scalars.add_scalar(sink::METRIC_KID, scores.kid as f32, iteration)?;
                }
            }
        }

        let dir = iteration_dir(&self.run_dir, iteration);
        let noise = match self.config.sample_source {
            SampleSource::Fixed => self.fixed_noise.clone(),
            SampleSource::Batch => {
                let [rows, dim] = inputs.conditional_noise.dims();
                inputs
                    .conditional_noise
                    .clone()
                    .inner()
                    .slice([0..rows.min(self.config.grid_size.max(1)), 0..dim])
            }
        };
        let samples = self.generator.valid().forward(noise);
        save_grid(samples, &dir.join(format!("iteration{}.png", iteration)))?;

        let paths = save_checkpoints(&self.generator, &self.discriminator, &dir)?;
        scalars.flush()?;
        Ok(paths)
    }
}

/// Build a trainer from `config` and run it over `dataset`, logging scalars to
/// `scalars`.
pub fn train<B: AutodiffBackend>(
    config: TrainingConfig,
    dataset: &dyn LabeledImageDataset,
    run_dir: impl AsRef<Path>,
    device: &B::Device,
    scalars: &mut dyn ScalarSink,
) -> error::Result<TrainingSummary> {
    let mut trainer = Trainer::<B>::new(config, run_dir, device)?;
    trainer.train(dataset, scalars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgan::data::{ImageData, InMemoryDataset, Sample};
    use crate::cgan::sink::MemoryScalarSink;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn tiny_config() -> TrainingConfig {
        TrainingConfig::new(ModelConfig::new(2, 1, 8).with_nz(4).with_ngf(4).with_ndf(4))
            .with_batch_size(2)
            .with_grid_size(4)
    }

    fn tiny_dataset(n: usize) -> InMemoryDataset {
        let samples = (0..n)
            .map(|i| Sample {
                image: ImageData::filled(if i % 2 == 0 { 0.5 } else { -0.5 }, 1, 8, 8),
                condition: one_hot(i % 2, 2),
            })
            .collect();
        InMemoryDataset::new(samples, 2).unwrap()
    }

    #[test]
    fn test_fixed_sample_noise_groups_by_class() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(0);
        let noise = fixed_sample_noise::<NdArray<f32>>(&mut rng, 10, 3, 100, &device);
        assert_eq!(noise.dims(), [100, 13]);

        let values: Vec<f32> = noise.into_data().to_vec().unwrap();
        // rows 0..10 carry class 0, rows 90..100 class 9
        assert_eq!(values[3], 1.0);
        assert_eq!(values[9 * 13 + 3], 1.0);
        assert_eq!(values[10 * 13 + 4], 1.0);
        assert_eq!(values[99 * 13 + 12], 1.0);
    }

    #[test]
    fn test_fixed_sample_noise_has_one_row_per_class_minimum() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(fixed_sample_noise::<NdArray<f32>>(&mut rng, 40, 2, 100, &device).dims(), [80, 42]);
        assert_eq!(fixed_sample_noise::<NdArray<f32>>(&mut rng, 40, 2, 10, &device).dims(), [40, 42]);
    }

    #[test]
    fn test_sample_noise_is_seeded() {
        let device = Default::default();
        let a = sample_noise::<NdArray<f32>>(&mut StdRng::seed_from_u64(5), 2, 3, &device);
        let b = sample_noise::<NdArray<f32>>(&mut StdRng::seed_from_u64(5), 2, 3, &device);
        let a: Vec<f32> = a.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_line_format() {
        let report = BatchReport {
            loss_d: 1.38629,
            loss_g: 0.6931,
            d_x: 0.5,
            d_g_z1: 0.49,
            d_g_z2: 0.51,
        };
        assert_eq!(
            progress_line(1, 5, 0, 12, 0, &report),
            "[1/5][  0/12] (   0)   Loss_D: 1.386   Loss_G 0.693   D(x): 0.500   D(g(z)): 0.490 -> 0.510"
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(tiny_config().validate().is_ok());
        assert!(tiny_config().with_save_frequency(0).validate().is_err());
        assert!(TrainingConfig::new(ModelConfig::new(2, 1, 27)).validate().is_err());
        let config = tiny_config().with_lr(0.001).with_lr_ratio(4.0);
        assert_eq!(config.generator_lr(), 0.001);
        assert_eq!(config.discriminator_lr(), 0.004);
    }

    #[test]
    fn test_iteration_and_save_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = tiny_config().with_epochs(2).with_save_frequency(2);
        let mut scalars = MemoryScalarSink::new();

        // 6 samples / batch 2 = 3 batches per epoch, saves at i_step 0 and 2
        let summary = train::<TestBackend>(config, &tiny_dataset(6), dir.path(), &device, &mut scalars).unwrap();
        assert_eq!(summary.discriminator_steps, 6);
        assert_eq!(summary.progress_lines.len(), 4);
        assert_eq!(summary.last_iteration, 5);

        let steps: Vec<usize> = scalars.records.iter().filter(|r| r.tag == sink::LOSS_D).map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4, 5]);
        for iteration in [0, 2, 3, 5] {
            let path = iteration_dir(dir.path(), iteration);
            assert!(path.join(format!("iteration{}.png", iteration)).exists());
            assert!(path.join("netG.mpk").exists());
        }
        assert!(!iteration_dir(dir.path(), 1).exists());
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn test_rejects_mismatched_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = TrainingConfig::new(ModelConfig::new(3, 1, 8).with_nz(4).with_ngf(4).with_ndf(4));
        let mut scalars = MemoryScalarSink::new();
        let result = train::<TestBackend>(config, &tiny_dataset(2), dir.path(), &device, &mut scalars);
        assert!(matches!(result, Err(CganError::InvalidConfig(_))));
    }
}
