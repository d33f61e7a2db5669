pub mod decrypt;
pub mod demo;
pub mod encrypt;
pub mod round;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as AnyhowContext;
use tracing::debug;

use timevault_core::{fetch_chain_parameters, ChainParameters, DrandLock, Settings};

/// Global context passed to all commands
pub struct Context {
    pub json_output: bool,
    pub config_path: PathBuf,
    pub quicknet: bool,
}

impl Context {
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings = if self.quicknet {
            Settings::load_over_quicknet(&self.config_path)
        } else {
            Settings::load_from(&self.config_path)
        };
        settings.with_context(|| {
            format!(
                "Failed to load beacon configuration from {} and TIMEVAULT_* (use --quicknet for drand quicknet defaults)",
                self.config_path.display()
            )
        })
    }

    /// Chain parameters, asking the beacon for timing when not configured.
    pub async fn chain(&self) -> anyhow::Result<Arc<ChainParameters>> {
        let settings = self.settings()?;
        let chain = fetch_chain_parameters(&settings.chain_config())
            .await
            .context("Failed to resolve beacon chain parameters")?;
        debug!(
            chain_hash = %chain.chain_hash_hex(),
            period = chain.period(),
            "using beacon chain"
        );
        Ok(Arc::new(chain))
    }

    pub async fn lock(&self) -> anyhow::Result<DrandLock> {
        Ok(DrandLock::drand(self.chain().await?))
    }
}
