use crate::config::Config;
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::time::Duration;

pub struct ValidationReport {
    pub environment: bool,
    pub database: bool,
    pub orange: bool,
    pub wave: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Environment and database are hard requirements; operator endpoints
    /// may be down without preventing boot.
    pub fn is_valid(&self) -> bool {
        self.environment && self.database
    }

    pub fn operators_reachable(&self) -> bool {
        self.orange && self.wave
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Database Connectivity: {}", status(self.database));
        println!("Orange API:            {}", status(self.orange));
        println!("Wave API:              {}", status(self.wave));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!(
            "\nOverall Status: {}",
            if self.is_valid() { "✅ PASS" } else { "❌ FAIL" }
        );
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config, pool: &PgPool) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        environment: true,
        database: true,
        orange: true,
        wave: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    if let Err(e) = validate_database(pool).await {
        report.database = false;
        report.errors.push(format!("Database: {}", e));
    }

    if let Err(e) = validate_operator_endpoint(&config.orange.base_url).await {
        report.orange = false;
        report.errors.push(format!("Orange: {}", e));
    }

    if let Err(e) = validate_operator_endpoint(&config.wave.base_url).await {
        report.wave = false;
        report.errors.push(format!("Wave: {}", e));
    }

    Ok(report)
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL is empty");
    }
    if config.diagnostics_token.is_empty() {
        anyhow::bail!("DIAGNOSTICS_TOKEN is empty");
    }
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }

    url::Url::parse(&config.orange.base_url)
        .context("ORANGE_API_BASE_URL is not a valid URL")?;
    url::Url::parse(&config.wave.base_url).context("WAVE_API_BASE_URL is not a valid URL")?;

    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied");
    }

    Ok(())
}

/// Any HTTP answer counts as reachable; only a connection failure is an
/// error. Operators routinely 404 on their base path.
async fn validate_operator_endpoint(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    client
        .get(base_url)
        .send()
        .await
        .context("Failed to connect")?;

    Ok(())
}
