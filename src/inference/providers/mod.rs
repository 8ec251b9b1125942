pub mod moonshot;

use std::sync::Arc;

use log::info;

pub use moonshot::MoonshotProvider;

use crate::ProviderKind;
use crate::core::config::ProviderConfig;
use crate::inference::{CompletionProvider, ProviderError};

/// Creates the provider for the configured kind.
/// Only Moonshot is implemented; other kinds are rejected up front.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    match config.provider() {
        ProviderKind::Moonshot => {
            info!("Using Moonshot provider with model {}", config.model_name());
            Ok(Arc::new(MoonshotProvider::new(config.clone())))
        }
        other => Err(ProviderError::Unsupported(other)),
    }
}
