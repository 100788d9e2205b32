use anyhow::Result;

use lode_core::InstallConfig;

pub struct CacheHandler;

impl CacheHandler {
    pub fn handle_clean() -> Result<()> {
        let config = InstallConfig::default();
        lode_core::clean_caches(&config)?;
        lode_logger::success("cache cleaned");
        Ok(())
    }
}
