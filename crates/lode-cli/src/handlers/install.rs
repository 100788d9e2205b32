use anyhow::Result;
use owo_colors::OwoColorize;

use lode_core::InstallConfig;

pub struct InstallHandler;

impl InstallHandler {
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn handle_install_all(
        production: bool,
        frozen: bool,
        offline: bool,
        prefer_offline: bool,
        registry: Option<&str>,
        token: Option<&str>,
        strict_peer_dependencies: bool,
        debug: bool,
    ) -> Result<()> {
        println!(
            "{} {}",
            "lode".bright_cyan().bold(),
            "install".bright_white()
        );

        let mut config = InstallConfig {
            production,
            frozen,
            offline,
            prefer_offline,
            strict_peer_dependencies,
            ..InstallConfig::default()
        };
        if let Some(registry) = registry {
            config.registry = registry.to_string();
        }
        if let Some(token) = token {
            config.token = Some(token.to_string());
        }

        lode_core::install_all_deps(".", config, debug)
    }
}
