//! `voco` - inspect client configuration and request session grants
//!
//! ```text
//! voco config show                 # effective configuration as TOML
//! voco config validate -c file     # check a configuration file
//! voco token --scenario 42         # request a session grant
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use voco_client_core::{
    ClientConfig, EnvSecretStore, HttpTokenService, SecretStore, TokenService, VERSION,
};
use voco_infra_common::{log_welcome, setup_logging, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "voco", author, version, about = "Voice conversation client tooling", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file (defaults to <config dir>/voco/config.toml when present)
    #[arg(short, long, global = true, env = "VOCO_CONFIG")]
    config: Option<PathBuf>,

    /// Real-time server URL, overriding the configuration file
    #[arg(long, global = true, env = "VOCO_SERVER_URL")]
    server_url: Option<String>,

    /// Token endpoint base URL, overriding the configuration file
    #[arg(long, global = true, env = "VOCO_TOKEN_ENDPOINT")]
    token_endpoint: Option<String>,

    /// Default log level; `VOCO_LOG` directives refine it
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect client configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Request a session grant from the token endpoint
    Token {
        /// Scenario to open a session for
        #[arg(short, long)]
        scenario: u64,

        /// Access credential (falls back to the environment secret store)
        #[arg(long, env = "VOCO_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// Print the full grant as JSON, token included
        #[arg(long)]
        reveal: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the configuration and report problems
    Validate,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("voco").join("config.toml"))
        .filter(|path| path.is_file())
}

fn load_config(global: &GlobalArgs) -> Result<ClientConfig> {
    let mut config = match global.config.clone().or_else(default_config_path) {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            ClientConfig::from_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Some(url) = &global.server_url {
        config = config.with_server_url(url.clone());
    }
    if let Some(endpoint) = &global.token_endpoint {
        config = config.with_token_endpoint(endpoint.clone());
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn request_token(
    config: &ClientConfig,
    scenario: u64,
    access_token: Option<String>,
    reveal: bool,
) -> Result<()> {
    let credential = match access_token.filter(|t| !t.trim().is_empty()) {
        Some(token) => token,
        None => match EnvSecretStore::new().access_credential().await? {
            Some(token) => token,
            None => bail!("no access credential: pass --access-token or set VOCO_ACCESS_TOKEN"),
        },
    };

    let service = HttpTokenService::new(&config.token)?;
    info!(endpoint = service.endpoint(), scenario_id = scenario, "requesting session grant");
    let grant = service
        .request_session(&credential, scenario)
        .await?
        .into_grant()?;

    if reveal {
        let body = serde_json::json!({
            "roomName": grant.room_name,
            "token": grant.token,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("room: {}", grant.room_name);
        println!("token: <{} bytes, use --reveal to print>", grant.token.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::new(cli.global.log_level.clone(), "voco");
    if cli.global.json_logs {
        logging = logging.with_json();
    }
    setup_logging(&logging)?;
    log_welcome(&logging.app_name, VERSION);

    let config = load_config(&cli.global)?;

    match cli.command {
        Command::Config(ConfigCommand::Show) => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Command::Config(ConfigCommand::Validate) => {
            println!("configuration ok (server {})", config.server_url);
        }
        Command::Token {
            scenario,
            access_token,
            reveal,
        } => request_token(&config, scenario, access_token, reveal).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_token_subcommand() {
        let cli = Cli::try_parse_from(["voco", "token", "--scenario", "42"]).unwrap();
        match cli.command {
            Command::Token { scenario, .. } => assert_eq!(scenario, 42),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn flags_override_configuration() {
        let global = GlobalArgs {
            config: None,
            server_url: Some("wss://rtc.example.com".to_string()),
            token_endpoint: Some("https://api.example.com".to_string()),
            log_level: "warn".to_string(),
            json_logs: false,
        };
        let config = load_config(&global).unwrap();
        assert_eq!(config.server_url, "wss://rtc.example.com");
        assert_eq!(config.token.base_url, "https://api.example.com");
    }
}
