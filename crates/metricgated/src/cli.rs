//! Command-line interface and its merge into `GatewayConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use metricgate_core::GatewayConfig;

#[derive(Parser)]
#[command(name = "metricgated", about = "metricgate daemon", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway: HTTP API, catalogue, and remote-write export.
    Serve(ServeArgs),
}

/// Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to metricgate.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address the API listens on, e.g. 0.0.0.0:9091.
    #[arg(long)]
    pub listen: Option<String>,

    /// Data directory for metricgate.redb.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Seconds between remote-write exports.
    #[arg(long)]
    pub export_interval: Option<u64>,

    /// Remote-write endpoint. Export is disabled when unset.
    #[arg(long, env = "REMOTE_WRITE_URL")]
    pub remote_write_url: Option<String>,

    #[arg(long, env = "REMOTE_WRITE_USERNAME")]
    pub remote_write_username: Option<String>,

    #[arg(long, env = "REMOTE_WRITE_PASSWORD", hide_env_values = true)]
    pub remote_write_password: Option<String>,
}

impl ServeArgs {
    /// Load the config file (or defaults), apply the flags, and validate.
    pub fn load_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)?,
            None => GatewayConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        if let Some(secs) = self.export_interval {
            config.export.interval_secs = secs;
        }
        if let Some(url) = &self.remote_write_url {
            config.export.url = Some(url.clone());
        }
        if let Some(username) = &self.remote_write_username {
            config.export.username = Some(username.clone());
        }
        if let Some(password) = &self.remote_write_password {
            config.export.password = Some(password.clone());
        }
    }
}
