use anyhow::Result;
use owo_colors::OwoColorize;

use lode_core::InstallConfig;

pub struct StoreHandler;

impl StoreHandler {
    pub fn handle_list() -> Result<()> {
        let config = InstallConfig::default();
        let entries = lode_core::list_store(&config);

        if entries.is_empty() {
            lode_logger::info("store is empty");
            return Ok(());
        }

        for entry in &entries {
            println!(
                "{}@{}  {}",
                entry.name.bright_white(),
                entry.version.bright_cyan(),
                entry.path.display().to_string().bright_black()
            );
        }
        println!();
        lode_logger::info(&format!("{} packages in store", entries.len()));
        Ok(())
    }
}
