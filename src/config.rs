use serde::Deserialize;
use std::time::Duration;
use wallet_health_types::NetworkMode;

pub const DEFAULT_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_MAINNET_RPC_URL: &str = "https://rpc.ankr.com/solana";
pub const DEFAULT_JUPITER_API_URL: &str = "https://lite-api.jup.ag";
pub const DEFAULT_STRICT_TOKEN_LIST_URL: &str = "https://token.jup.ag/strict";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    // Network selection
    pub network_mode: NetworkMode,

    // Solana RPC per network mode
    pub devnet_rpc_url: String,
    pub mainnet_rpc_url: String,

    // Aggregator API per network mode
    pub jupiter_api_url_devnet: String,
    pub jupiter_api_url_mainnet: String,
    pub strict_token_list_url: String,

    // Local signer used by the CLI; the library only needs a WalletSigner
    pub wallet_private_key: Option<String>,

    // Logging
    pub log_level: Option<String>,
    pub log_dir: String,

    // Classification & swap parameters
    pub dust_threshold_usd: f64,
    pub slippage_bps: u16,

    // Timers
    pub order_poll_interval_secs: u64,
    pub sweep_delay_ms: u64,
    pub burn_delay_ms: u64,
    pub refuel_delay_ms: u64,
    pub dca_delay_ms: u64,

    // No timeout unless set
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network_mode: NetworkMode::Devnet,
            devnet_rpc_url: DEFAULT_DEVNET_RPC_URL.to_string(),
            mainnet_rpc_url: DEFAULT_MAINNET_RPC_URL.to_string(),
            jupiter_api_url_devnet: DEFAULT_JUPITER_API_URL.to_string(),
            jupiter_api_url_mainnet: DEFAULT_JUPITER_API_URL.to_string(),
            strict_token_list_url: DEFAULT_STRICT_TOKEN_LIST_URL.to_string(),
            wallet_private_key: None,
            log_level: None,
            log_dir: "./logs".to_string(),
            dust_threshold_usd: 0.5,
            slippage_bps: 50,
            order_poll_interval_secs: 15,
            sweep_delay_ms: 1500,
            burn_delay_ms: 1500,
            refuel_delay_ms: 2000,
            dca_delay_ms: 1500,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load optional .env file
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded configuration from .env file");
        }

        let defaults = Settings::default();
        let config_builder = config::Config::builder()
            .set_default("network_mode", defaults.network_mode.as_str())?
            .set_default("devnet_rpc_url", defaults.devnet_rpc_url)?
            .set_default("mainnet_rpc_url", defaults.mainnet_rpc_url)?
            .set_default("jupiter_api_url_devnet", defaults.jupiter_api_url_devnet)?
            .set_default("jupiter_api_url_mainnet", defaults.jupiter_api_url_mainnet)?
            .set_default("strict_token_list_url", defaults.strict_token_list_url)?
            .set_default("log_dir", defaults.log_dir)?
            .set_default("dust_threshold_usd", defaults.dust_threshold_usd)?
            .set_default("slippage_bps", defaults.slippage_bps as i64)?
            .set_default("order_poll_interval_secs", defaults.order_poll_interval_secs)?
            .set_default("sweep_delay_ms", defaults.sweep_delay_ms)?
            .set_default("burn_delay_ms", defaults.burn_delay_ms)?
            .set_default("refuel_delay_ms", defaults.refuel_delay_ms)?
            .set_default("dca_delay_ms", defaults.dca_delay_ms)?
            .add_source(config::Environment::default().try_parsing(true));

        let settings: Settings = config_builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(self.dust_threshold_usd > 0.0) {
            return Err(config::ConfigError::Message(format!(
                "dust_threshold_usd must be positive, got {}",
                self.dust_threshold_usd
            )));
        }
        if self.order_poll_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "order_poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// RPC endpoint for the given mode; the network toggle switches this and
    /// the aggregator URL together.
    pub fn rpc_url(&self, mode: NetworkMode) -> &str {
        match mode {
            NetworkMode::Devnet => &self.devnet_rpc_url,
            NetworkMode::MainnetBeta => &self.mainnet_rpc_url,
        }
    }

    pub fn jupiter_api_url(&self, mode: NetworkMode) -> &str {
        match mode {
            NetworkMode::Devnet => &self.jupiter_api_url_devnet,
            NetworkMode::MainnetBeta => &self.jupiter_api_url_mainnet,
        }
    }

    pub fn order_poll_interval(&self) -> Duration {
        Duration::from_secs(self.order_poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn console_log_level(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| "info".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_env() {
        std::env::set_var("NETWORK_MODE", "mainnet-beta");
        std::env::set_var("MAINNET_RPC_URL", "https://test.solana.com");
        std::env::set_var("JUPITER_API_URL_MAINNET", "https://test.jup.ag");
        std::env::set_var("DUST_THRESHOLD_USD", "0.75");
        std::env::set_var("ORDER_POLL_INTERVAL_SECS", "30");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.network_mode, NetworkMode::MainnetBeta);
        assert_eq!(settings.rpc_url(NetworkMode::MainnetBeta), "https://test.solana.com");
        assert_eq!(settings.jupiter_api_url(NetworkMode::MainnetBeta), "https://test.jup.ag");
        assert_eq!(settings.rpc_url(NetworkMode::Devnet), DEFAULT_DEVNET_RPC_URL);
        assert_eq!(settings.dust_threshold_usd, 0.75);
        assert_eq!(settings.order_poll_interval(), Duration::from_secs(30));
        assert_eq!(settings.slippage_bps, 50);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.network_mode, NetworkMode::Devnet);
        assert_eq!(settings.dust_threshold_usd, 0.5);
        assert_eq!(settings.order_poll_interval(), Duration::from_secs(15));
        assert_eq!(settings.request_timeout(), None);
        assert_eq!(settings.console_log_level(), "info");
    }
}
