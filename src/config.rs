use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

/// Process configuration, read once at startup and injected into every
/// component that needs it. Gateways never read the environment themselves.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub diagnostics_token: String,
    pub orange: OrangeConfig,
    pub wave: WaveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrangeConfig {
    pub base_url: String,
    pub access_token: String,
    pub retailer_msisdn: String,
    /// Retailer PIN, pre-encrypted under the operator key out of band.
    pub retailer_pin: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WaveConfig {
    pub base_url: String,
    pub manager_msisdn: String,
    pub manager_pin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            diagnostics_token: env::var("DIAGNOSTICS_TOKEN")?,
            orange: OrangeConfig {
                base_url: env::var("ORANGE_API_BASE_URL")?,
                access_token: env::var("ORANGE_ACCESS_TOKEN")?,
                retailer_msisdn: env::var("ORANGE_RETAILER_MSISDN")?,
                retailer_pin: env::var("ORANGE_RETAILER_ENCRYPTED_PIN")?,
            },
            wave: WaveConfig {
                base_url: env::var("WAVE_API_BASE_URL")?,
                manager_msisdn: env::var("WAVE_MANAGER_MSISDN")?,
                manager_pin: env::var("WAVE_MANAGER_PIN")?,
            },
        })
    }
}
