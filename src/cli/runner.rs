//! CLI runner - executes commands

use crate::api::{DashboardApi, ListObject, ListQuery};
use crate::auth::{FileTokenStore, LayeredTokenStore, TokenStore};
use crate::cli::commands::{Cli, Commands, ListsCommand, StreaksCommand, TokenCommand};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::AuthenticatedHttpClient;
use crate::types::{StringMap, Token};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let file_store = config.token_file.clone().map(FileTokenStore::new);
        let store: Arc<dyn TokenStore> = match &file_store {
            Some(file) => Arc::new(LayeredTokenStore::with_durable(Arc::new(file.clone()))),
            None => Arc::new(LayeredTokenStore::in_memory()),
        };

        debug!("Using base URL {}", config.base_url());
        let client = AuthenticatedHttpClient::new(config, store)?;
        let api = DashboardApi::new(client.clone());

        let output = match &self.cli.command {
            Commands::Get { path, query } => {
                let params: StringMap = query.iter().cloned().collect();
                api.get(path, &params).await?
            }
            Commands::Post { path, action, data } => {
                let data: Value = serde_json::from_str(data)?;
                api.post_action(path, action, &data).await?
            }
            Commands::Refresh => {
                let token = client.refresh_token().await?;
                json!({ "refreshed": token.is_some() })
            }
            Commands::Token(cmd) => token_command(cmd, &client, file_store.as_ref())?,
            Commands::Lists(ListsCommand::Get {
                title,
                parent_page,
                date,
            }) => {
                let query = match (title, parent_page, date) {
                    (Some(title), _, _) => ListQuery::Title(title.clone()),
                    (None, Some(parent_page), Some(date)) => ListQuery::Filter {
                        parent_page: parent_page.clone(),
                        date: date.clone(),
                    },
                    _ => {
                        return Err(Error::Other(
                            "either --title or --parent-page with --date is required".to_string(),
                        ))
                    }
                };
                api.get_list(query).await?
            }
            Commands::Lists(ListsCommand::Create { file }) => {
                let contents = std::fs::read_to_string(file)?;
                let list: ListObject = serde_json::from_str(&contents)?;
                api.create_list(&list).await?
            }
            Commands::Streaks(StreaksCommand::Get) => api.get_streaks().await?,
            Commands::Streaks(StreaksCommand::Update) => api.update_streak().await?,
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Config file (if any) with command-line overrides applied
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(origin) = &self.cli.origin {
            config.origin.clone_from(origin);
            config.base_url = None;
        }
        if let Some(path) = &self.cli.token_file {
            config.token_file = Some(path.clone());
        }
        if config.token_file.is_none() {
            config.token_file = default_token_file();
        }

        config.validate()?;
        Ok(config)
    }
}

fn token_command(
    cmd: &TokenCommand,
    client: &AuthenticatedHttpClient,
    file_store: Option<&FileTokenStore>,
) -> Result<Value> {
    match cmd {
        TokenCommand::Show { reveal } => {
            let token = client.token_store().get_token();
            let mut out = json!({
                "present": token.is_some(),
                "updated_at": file_store.and_then(FileTokenStore::updated_at),
            });
            if *reveal {
                out["token"] = json!(token.map(Token::into_inner));
            }
            Ok(out)
        }
        TokenCommand::Set { value } => {
            let token = Token::new(value.clone())
                .ok_or_else(|| Error::invalid_value("token", "must not be empty"))?;
            client.token_store().set_token(token);
            Ok(json!({ "stored": true }))
        }
    }
}

/// `$HOME/.config/tokenflight/token.json`, when a home directory is known
fn default_token_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("tokenflight")
            .join("token.json")
    })
}
