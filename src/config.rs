//! Gradient computation configuration.
//!
//! Built with the `bon` builder and validated at build time:
//!
//! ```
//! use boosters_grad::{GradientConfig, Loss};
//!
//! let config = GradientConfig::builder()
//!     .loss(Loss::CategoricalCrossEntropy { n_classes: 3 })
//!     .n_threads(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.n_threads, 4);
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::executor::Executor;
use crate::objectives::Loss;

/// Loss and threading settings for a training run.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct GradientConfig {
    /// Loss to differentiate. Default: squared error.
    #[builder(default)]
    #[serde(default)]
    pub loss: Loss,

    /// Worker threads. `0` = auto, `1` = sequential. Default: 0.
    #[builder(default)]
    #[serde(default)]
    pub n_threads: usize,
}

impl<S: gradient_config_builder::IsComplete> GradientConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidClassCount`] if a categorical loss has
    /// fewer than two classes.
    pub fn build(self) -> std::result::Result<GradientConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is always valid")
    }
}

impl GradientConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.loss.validate()
    }

    /// Parse and validate a JSON configuration.
    ///
    /// ```
    /// use boosters_grad::{GradientConfig, Loss};
    ///
    /// let config = GradientConfig::from_json(r#"{"loss": {"loss": "poisson"}, "n_threads": 2}"#).unwrap();
    /// assert_eq!(config.loss, Loss::Poisson);
    /// ```
    pub fn from_json(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Executor sized by `n_threads`.
    pub fn executor(&self) -> Result<Executor> {
        Executor::new(self.n_threads)
    }
}
