//! cgan-rs: conditional GAN training on labeled image datasets with Burn.

pub mod cgan;
pub mod error;

pub use cgan::settings::Settings;
pub use error::{CganError, Result};

/// Fixture builders shared by unit tests, integration tests and benches.
pub mod test_utils;
