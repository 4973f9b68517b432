use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn::backend::Autodiff;
use cgan_rs::cgan::sink::JsonlScalarSink;
use cgan_rs::cgan::{Settings, Trainer};

#[cfg(not(feature = "wgpu"))]
type TrainBackend = Autodiff<burn_ndarray::NdArray<f32>>;
#[cfg(feature = "wgpu")]
type TrainBackend = Autodiff<burn_wgpu::Wgpu>;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::new().context("failed to load settings")?;
    let seed = settings.resolve_seed();
    log::info!("Random Seed: {}", seed);

    let dataset = settings
        .open_dataset(seed)
        .with_context(|| format!("failed to open dataset under {}", settings.dataset.root.display()))?;
    let config = settings.training_config(dataset.as_ref(), seed);
    let run_dir = settings.run_dir();

    let device = <TrainBackend as Backend>::Device::default();
    log::info!("backend: {}", std::any::type_name::<TrainBackend>());

    let mut scalars = JsonlScalarSink::create(&run_dir)
        .with_context(|| format!("failed to open scalar log in {}", run_dir.display()))?;
    let mut trainer = Trainer::<TrainBackend>::new(config, &run_dir, &device).context("failed to build trainer")?;
    let summary = trainer
        .train(dataset.as_ref(), &mut scalars)
        .context("training failed")?;

    log::info!(
        "done: {} iterations, {} checkpoints in {}",
        summary.last_iteration + 1,
        summary.checkpoints.len(),
        run_dir.display()
    );
    Ok(())
}
