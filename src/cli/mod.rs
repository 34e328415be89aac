//! CLI commands for Eden using clap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::cache::{Cache, HttpFetcher};
use crate::commands::{Attachment, OptionKind, Registry, Reply};
use crate::config::{load_settings, Settings, CACHE_DIR_ENV};

/// Eden - chat command bot with a text and image tag cache.
#[derive(Parser)]
#[command(name = "eden")]
#[command(version = "0.1.0")]
#[command(about = "Eden - tag and image cache bot", long_about = None)]
pub struct Commands {
    /// Cache directory (overrides settings and EDEN_CACHE_DIR)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the Telegram bot
    Run,

    /// Run one chat command against the local cache, e.g. `eden exec tag list`
    Exec {
        /// User id recorded as the owner of changes
        #[arg(long, default_value = "cli")]
        user: String,

        /// Image URL passed as the command's attachment
        #[arg(long)]
        attach: Option<String>,

        /// Command line, with or without the leading slash
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },

    /// List registered commands and their options
    Commands,

    /// Show the effective settings
    Settings,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        let mut settings = load_settings()?;
        if let Some(dir) = &self.cache_dir {
            settings.cache_dir = dir.clone();
        }

        match &self.command {
            Command::Run => cmd_run(settings).await,
            Command::Exec { user, attach, line } => cmd_exec(&settings, user, attach, line).await,
            Command::Commands => cmd_commands(),
            Command::Settings => cmd_settings(&settings),
        }
    }
}

// Command implementations

async fn cmd_run(settings: Settings) -> Result<()> {
    use crate::telegram::run_telegram_daemon;

    println!("Starting Telegram bot...");
    run_telegram_daemon(settings).await?;
    Ok(())
}

async fn cmd_exec(
    settings: &Settings,
    user: &str,
    attach: &Option<String>,
    line: &[String],
) -> Result<()> {
    let fetcher = HttpFetcher::new(
        Duration::from_secs(settings.download_timeout_secs),
        settings.max_image_bytes,
    )?;
    let cache = Cache::open(&settings.cache_dir, Arc::new(fetcher))?;
    let registry = Registry::standard();

    let attachments = attach
        .iter()
        .map(|url| Attachment {
            url: url.clone(),
            name: None,
        })
        .collect();

    let reply = registry
        .handle_line(&line.join(" "), user, attachments, &cache)
        .await;
    println!("{}", render_plain(&reply));
    Ok(())
}

fn cmd_commands() -> Result<()> {
    let registry = Registry::standard();

    println!("Commands ({}):", registry.len());
    for command in registry.iter() {
        let meta = command.meta();
        println!("  /{} - {}", meta.name, meta.about);
        for option in &meta.options {
            match option.kind {
                OptionKind::Subcommand => {
                    let args = option
                        .options
                        .iter()
                        .map(|o| {
                            if o.required {
                                format!("-{}", o.name)
                            } else {
                                format!("[-{}]", o.name)
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("      {} {:<30} {}", option.name, args, option.description);
                }
                _ => println!("      -{:<33} {}", option.name, option.description),
            }
        }
    }
    Ok(())
}

fn cmd_settings(settings: &Settings) -> Result<()> {
    let token = if settings.bot_token.is_some() { "set" } else { "not set" };
    println!("Settings file: {}", crate::config::get_settings_path()?.display());
    println!("  Bot token:        {}", token);
    println!("  Cache directory:  {} (env {})", settings.cache_dir.display(), CACHE_DIR_ENV);
    println!("  Download timeout: {}s", settings.download_timeout_secs);
    println!("  Max image size:   {} bytes", settings.max_image_bytes);
    Ok(())
}

/// Terminal rendering of a reply.
fn render_plain(reply: &Reply) -> String {
    let mut out = Vec::new();
    if let Some(title) = &reply.title {
        out.push(title.clone());
    }
    out.push(reply.content.clone());
    if let Some(file) = &reply.attachment {
        out.push(format!("[file: {}]", file.path.display()));
    }
    if let Some(footer) = &reply.footer {
        out.push(format!("-- {}", footer));
    }
    out.join("\n")
}
