//! /tag - text tag manager.

use async_trait::async_trait;

use super::format::humanize_ms;
use super::{Command, CommandError, CommandMeta, Context, Invocation, OptionSpec, Reply, Result};
use crate::cache::{Record, StoreError};

pub struct Tag {
    meta: CommandMeta,
}

impl Tag {
    pub fn new() -> Self {
        Self {
            meta: CommandMeta {
                name: "tag",
                about: "Text tag manager.",
                group: "tags",
                ephemeral: true,
                options: vec![
                    OptionSpec::subcommand(
                        "create",
                        "Add a new text tag.",
                        vec![
                            OptionSpec::string("name", "The name of the text tag.", true),
                            OptionSpec::string("content", "The content of the text tag.", true),
                            OptionSpec::string("url", "The url of the text tag.", false),
                        ],
                    ),
                    OptionSpec::subcommand(
                        "delete",
                        "Delete a text tag.",
                        vec![
                            OptionSpec::string("name", "The name of the text tag.", true),
                            OptionSpec::boolean("verify", "Verify the deletion.", true),
                        ],
                    ),
                    OptionSpec::subcommand(
                        "fetch",
                        "Get a text tag.",
                        vec![OptionSpec::string("name", "The name of the text tag.", true)],
                    ),
                    OptionSpec::subcommand(
                        "update",
                        "Update a text tag.",
                        vec![
                            OptionSpec::string("name", "The current name of the text tag.", true),
                            OptionSpec::string("content", "The new content of the text tag.", false),
                            OptionSpec::string("newname", "The new name of the text tag.", false),
                            OptionSpec::string("url", "The new url of the text tag.", false),
                        ],
                    ),
                    OptionSpec::subcommand(
                        "list",
                        "List all text tags.",
                        vec![OptionSpec::string("filterby", "A text to filter results by.", false)],
                    ),
                    OptionSpec::subcommand(
                        "purge",
                        "Delete all text tags in the trash.",
                        vec![OptionSpec::boolean("verify", "Verify the deletion.", true)],
                    ),
                ],
                lines: include_str!("tag.rs").lines().count(),
            },
        }
    }
}

/// Success text, or the store's rejection shown as-is.
fn outcome<T>(result: std::result::Result<T, StoreError>, success: &str) -> String {
    match result {
        Ok(_) => success.to_string(),
        Err(e) => {
            if !e.is_validation() {
                tracing::error!("Tag operation failed: {}", e);
            }
            e.to_string()
        }
    }
}

fn summary(record: &Record) -> String {
    format!("{} [Last accessed {} ago]", record.key, humanize_ms(record.age_ms()))
}

#[async_trait]
impl Command for Tag {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    async fn run(&self, invocation: &Invocation, ctx: &Context<'_>) -> Result<Reply> {
        let tags = &ctx.cache.tags;
        let user = invocation.user_id.as_str();
        let name = invocation.string("name").map(str::to_lowercase);

        let reply = match invocation.subcommand.as_deref().unwrap_or_default() {
            "create" => {
                let name = invocation.require_string("name")?.to_lowercase();
                let content = invocation.require_string("content")?;
                let url = invocation.string("url").map(str::to_string);
                let result = tags.create(&name, content, url, user).await;
                Reply::code(outcome(
                    result,
                    "Tag successfully created. Your action has been logged.",
                ))
            }
            "delete" => {
                if invocation.require_boolean("verify")? {
                    let name = invocation.require_string("name")?.to_lowercase();
                    let result = tags.delete(&name, user).await;
                    Reply::code(outcome(
                        result,
                        "Tag successfully deleted. Your action has been logged.",
                    ))
                } else {
                    Reply::code("Deletion cancelled.")
                }
            }
            "fetch" => match tags.fetch(name.as_deref()).await {
                Some(tag) => {
                    let mut reply = Reply::code(format!(
                        "{}: {} [Last accessed {}]",
                        tag.key,
                        tag.value,
                        humanize_ms(tag.age_ms())
                    ));
                    reply.title = tag.url.clone();
                    reply.link = tag.url.clone();
                    reply.timestamp = tag.accessed_at;
                    reply.footer = Some(format!("Last modified by {}", tag.owner));
                    reply
                }
                None => Reply::code("Tag does not exist."),
            },
            "update" => {
                let name = invocation.require_string("name")?.to_lowercase();
                let content = invocation.string("content").map(str::to_string);
                let new_name = invocation.string("newname").map(str::to_lowercase);
                let url = invocation.string("url").map(str::to_string);
                let result = tags.update(&name, new_name, content, url, user).await;
                Reply::code(outcome(
                    result,
                    "Tag successfully updated. Your action has been logged.",
                ))
            }
            "list" => {
                let filter = invocation.string("filterby").map(str::to_lowercase);
                let found = tags.list(filter.as_deref()).await;
                if found.is_empty() {
                    Reply::code("No tags found.")
                } else {
                    Reply::code(found.iter().map(summary).collect::<Vec<_>>().join("\n"))
                }
            }
            "purge" => {
                if invocation.require_boolean("verify")? {
                    let purged = tags.purge().await?;
                    if purged.is_empty() {
                        Reply::code("No tags found.")
                    } else {
                        let lines = purged
                            .iter()
                            .map(|t| {
                                format!(
                                    "{}: {} [Last accessed {} ago]",
                                    t.key,
                                    t.value,
                                    humanize_ms(t.age_ms())
                                )
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        Reply::code(format!(
                            "Deleted {} tag(s). View them below:\n{}",
                            purged.len(),
                            lines
                        ))
                    }
                } else {
                    Reply::code("Purge cancelled.")
                }
            }
            other => {
                return Err(CommandError::UnknownSubcommand(
                    other.to_string(),
                    "create, delete, fetch, update, list, purge".to_string(),
                ))
            }
        };

        Ok(reply)
    }
}
