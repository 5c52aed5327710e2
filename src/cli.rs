use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::Term;
use log::info;
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::{Config, ConfigStore};
use crate::output;
use crate::providers::gitlab::{GitLabProvider, StateFilter};
use crate::report::MergeRequestReport;

#[derive(Parser, Debug)]
#[command(name = "fulgens")]
#[command(author, version, about = "GitLab merge request report", long_about = None)]
pub struct Cli {
    #[arg(value_enum)]
    command: Command,

    /// Include merge requests in every state, not only opened ones
    #[arg(long, default_value_t = false)]
    include_closed: bool,

    /// GitLab private token
    #[arg(short, long, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitLab instance url
    #[arg(short, long)]
    url: Option<String>,

    /// Save provided config data
    #[arg(short, long, default_value_t = false)]
    save_configuration: bool,

    /// Directory holding config.json (defaults to ~/.config/fulgens)
    #[arg(short, long, env = "FULGENS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(short, long, default_value_t = false, requires = "json")]
    pretty: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Store a GitLab private token in the config file
    SetToken,
    /// Report merge requests grouped by project
    ReportMrs,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        self.execute_with(prompt_token).await
    }

    /// Runs the command, asking `prompt` for a token when one is needed and
    /// none is configured.
    async fn execute_with(&self, prompt: impl FnOnce() -> Result<Token>) -> Result<()> {
        let store = ConfigStore::locate(self.config_dir.as_deref())?;
        let mut config = store.load()?;
        config.apply_overrides(self.token.as_deref(), self.url.as_deref());

        if self.save_configuration {
            store.save(&config)?;
        }

        match self.command {
            Command::SetToken => self.execute_set_token(&store, config, prompt),
            Command::ReportMrs => self.execute_report(&store, config, prompt).await,
        }
    }

    fn execute_set_token(
        &self,
        store: &ConfigStore,
        mut config: Config,
        prompt: impl FnOnce() -> Result<Token>,
    ) -> Result<()> {
        let token = match &self.token {
            Some(token) => Token::from(token.as_str()),
            None => prompt()?,
        };

        config.set_token(&token);
        store.save(&config)?;

        eprintln!(
            "{} {}",
            output::bright_green("✓ Token saved to"),
            store.path().display()
        );

        Ok(())
    }

    async fn execute_report(
        &self,
        store: &ConfigStore,
        mut config: Config,
        prompt: impl FnOnce() -> Result<Token>,
    ) -> Result<()> {
        // An empty configured token still counts as configured
        let token = match config.get_token() {
            Some(token) => token,
            None => {
                let token = prompt()?;
                config.set_token(&token);
                store.save(&config)?;
                token
            }
        };

        let filter = StateFilter::from_include_closed(self.include_closed);
        info!(
            "Collecting merge requests from {} ({filter:?})",
            config.gitlab_url
        );

        let provider = GitLabProvider::new(&config.gitlab_url, Some(token))?;
        let report = provider.collect_report(filter).await?;

        self.emit_report(&report)?;
        output::print_summary(&report);

        Ok(())
    }

    fn emit_report(&self, report: &MergeRequestReport) -> Result<()> {
        let rendered = if self.json {
            if self.pretty {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string(report)?
            }
        } else {
            report.render_text()
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, rendered).with_context(|| {
                format!("Failed to write report to: {}", output_path.display())
            })?;
            info!("Report written to: {}", output_path.display());
        } else if self.json {
            println!("{rendered}");
        } else {
            print!("{rendered}");
        }

        Ok(())
    }
}

fn prompt_token() -> Result<Token> {
    let term = Term::stderr();
    term.write_str("Please enter GitLab private token: ")?;
    let token = term
        .read_secure_line()
        .context("Failed to read token from terminal")?;

    let token = Token::from(token.trim());
    anyhow::ensure!(!token.is_empty(), "No GitLab token provided");

    Ok(token)
}
