use std::time::Duration;

/// Everything the Pipefy client and the intake workflow need.
#[derive(Debug, Clone)]
pub struct PipefyConfig {
    pub api_url: String,
    pub auth_token: String,
    /// "Consumidores" table.
    pub customers_table_id: String,
    /// "Corretores" table.
    pub sales_agents_table_id: String,
    /// "Vendas" pipe.
    pub sales_pipe_id: String,
    pub timeout_secs: u64,
}

impl PipefyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub pipefy: PipefyConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: parse_or_default("PORT", 3000)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            rate_limit_per_second: parse_or_default("RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: parse_or_default("RATE_LIMIT_BURST", 20)?,
            pipefy: PipefyConfig {
                api_url: required("PIPEFY_API_URL").and_then(|url| {
                    validate_api_url(&url)?;
                    Ok(url)
                })?,
                auth_token: required("PIPEFY_AUTH_TOKEN")?,
                customers_table_id: required("PIPEFY_CONSUMIDORES_TABLE_ID")?,
                sales_agents_table_id: required("PIPEFY_CORRETORES_TABLE_ID")?,
                sales_pipe_id: required("PIPEFY_VENDAS_PIPE_ID")?,
                timeout_secs: parse_or_default("PIPEFY_TIMEOUT_SECS", 30).and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("PIPEFY_TIMEOUT_SECS must be greater than 0");
                    }
                    Ok(secs)
                })?,
            },
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Pipefy API URL: {}", config.pipefy.api_url);
        tracing::debug!(
            "Customers table: {}, sales agents table: {}, sales pipe: {}",
            config.pipefy.customers_table_id,
            config.pipefy.sales_agents_table_id,
            config.pipefy.sales_pipe_id
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(value)
}

fn parse_or_default<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}

fn validate_api_url(raw: &str) -> anyhow::Result<()> {
    let url = url::Url::parse(raw)
        .map_err(|e| anyhow::anyhow!("PIPEFY_API_URL is not a valid URL: {}", e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("PIPEFY_API_URL must start with http:// or https://");
    }
    Ok(())
}
