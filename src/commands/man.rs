//! /man - describe a registered command.

use async_trait::async_trait;

use super::format::capitalize;
use super::{Command, CommandError, CommandMeta, Context, Invocation, OptionSpec, Reply, Result};

pub struct Man {
    meta: CommandMeta,
}

impl Man {
    pub fn new() -> Self {
        Self {
            meta: CommandMeta {
                name: "man",
                about: "A manual for the bot.",
                group: "general",
                ephemeral: false,
                options: vec![OptionSpec::string(
                    "command",
                    "A command name to get information about.",
                    false,
                )],
                lines: include_str!("man.rs").lines().count(),
            },
        }
    }
}

#[async_trait]
impl Command for Man {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    async fn run(&self, invocation: &Invocation, ctx: &Context<'_>) -> Result<Reply> {
        let requested = invocation
            .string("command")
            .map(|c| c.trim_start_matches('/').to_lowercase())
            .unwrap_or_else(|| self.meta.name.to_string());

        let command = ctx.registry.get(&requested).ok_or_else(|| {
            CommandError::Rejected(format!(
                "A command with the name '{}' does not exist.",
                requested
            ))
        })?;
        let meta = command.meta();

        let options = if meta.options.is_empty() {
            "None".to_string()
        } else {
            meta.options.iter().map(|o| o.name).collect::<Vec<_>>().join(", ")
        };

        let mut reply = Reply::text(
            [
                format!("Name: {}", capitalize(meta.name)),
                format!("Description: {}", meta.about),
                format!("Group: {}", meta.group),
                format!("Ephemeral: {}", if meta.ephemeral { "Yes" } else { "No" }),
                format!("Options: {}", options),
                format!("Lines: {}", meta.lines),
            ]
            .join("\n"),
        );
        reply.footer = Some(format!("Requested by {}", invocation.user_id));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::testing;
    use crate::commands::Registry;
    use tempfile::TempDir;

    #[tokio::test]
    async fn describes_tag_command() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/man tag", "1", vec![], &cache).await;
        assert!(reply.content.contains("Name: Tag"));
        assert!(reply.content.contains("Ephemeral: Yes"));
        assert!(reply
            .content
            .contains("Options: create, delete, fetch, update, list, purge"));
    }

    #[tokio::test]
    async fn defaults_to_itself() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/man", "1", vec![], &cache).await;
        assert!(reply.content.starts_with("Name: Man\nDescription: A manual for the bot."));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/man -command dance", "1", vec![], &cache).await;
        assert_eq!(
            reply.content,
            "An error occurred while executing the command `man`: `A command with the name 'dance' does not exist.`"
        );
    }
}
