//! /img - image tag manager.

use async_trait::async_trait;

use super::format::humanize_ms;
use super::{
    Command, CommandError, CommandMeta, Context, FileAttachment, Invocation, OptionSpec, Reply,
    Result,
};
use crate::cache::{Record, StoreError};

pub struct Img {
    meta: CommandMeta,
}

impl Img {
    pub fn new() -> Self {
        Self {
            meta: CommandMeta {
                name: "img",
                about: "Image tag manager.",
                group: "tags",
                ephemeral: true,
                options: vec![
                    OptionSpec::subcommand(
                        "create",
                        "Add a new image tag.",
                        vec![
                            OptionSpec::string("name", "The name of the image tag.", true),
                            OptionSpec::attachment("image", "The image for the tag.", true),
                        ],
                    ),
                    OptionSpec::subcommand(
                        "delete",
                        "Delete an image tag.",
                        vec![
                            OptionSpec::string("name", "The name of the image tag.", true),
                            OptionSpec::boolean("verify", "Verify the deletion.", true),
                        ],
                    ),
                    OptionSpec::subcommand(
                        "fetch",
                        "Get an image tag.",
                        vec![OptionSpec::string("name", "The name of the image tag.", true)],
                    ),
                    OptionSpec::subcommand(
                        "update",
                        "Update an image tag.",
                        vec![
                            OptionSpec::string("name", "The current name of the image tag.", true),
                            OptionSpec::attachment("image", "The new image for the tag.", true),
                            OptionSpec::string("newname", "The new name of the image tag.", false),
                        ],
                    ),
                    OptionSpec::subcommand(
                        "list",
                        "List all image tags.",
                        vec![OptionSpec::string("filterby", "A text to filter results by.", false)],
                    ),
                    OptionSpec::subcommand(
                        "purge",
                        "Delete all image tags in the trash.",
                        vec![OptionSpec::boolean("verify", "Verify the deletion.", true)],
                    ),
                ],
                lines: include_str!("img.rs").lines().count(),
            },
        }
    }
}

fn outcome<T>(result: std::result::Result<T, StoreError>, success: &str) -> String {
    match result {
        Ok(_) => success.to_string(),
        Err(e) => {
            if !e.is_validation() {
                tracing::error!("Image operation failed: {}", e);
            }
            e.to_string()
        }
    }
}

/// `<key>.png [Last accessed <age><suffix>]`.
fn summary(record: &Record, suffix: &str) -> String {
    format!(
        "{}.png [Last accessed {}{}]",
        record.key,
        humanize_ms(record.age_ms()),
        suffix
    )
}

#[async_trait]
impl Command for Img {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    async fn run(&self, invocation: &Invocation, ctx: &Context<'_>) -> Result<Reply> {
        let images = &ctx.cache.images;
        let user = invocation.user_id.as_str();

        let reply = match invocation.subcommand.as_deref().unwrap_or_default() {
            "create" => {
                let name = invocation.require_string("name")?;
                let image = invocation.require_attachment("image")?;
                let result = images.create(name, &image.url, user).await;
                Reply::code(outcome(
                    result,
                    "Image successfully created. Your action has been logged.",
                ))
            }
            "delete" => {
                if invocation.require_boolean("verify")? {
                    let name = invocation.require_string("name")?;
                    let result = images.delete(name, user).await;
                    Reply::code(outcome(
                        result,
                        "Image successfully deleted. Your action has been logged.",
                    ))
                } else {
                    Reply::code("Deletion cancelled.")
                }
            }
            "fetch" => match images.fetch(invocation.string("name")).await {
                Some((image, path)) => {
                    let mut reply = Reply::code(summary(&image, ""));
                    reply.attachment = Some(FileAttachment {
                        path,
                        name: format!("{}.png", image.key),
                    });
                    reply.timestamp = image.accessed_at;
                    reply.footer = Some(format!("Last modified by {}", image.owner));
                    reply
                }
                None => Reply::code("Image does not exist."),
            },
            "update" => {
                let name = invocation.require_string("name")?;
                let image = invocation.require_attachment("image")?;
                let new_name = invocation.string("newname").map(str::to_string);
                let result = images
                    .update(name, new_name, Some(image.url.as_str()), user)
                    .await;
                Reply::code(outcome(
                    result,
                    "Image successfully updated. Your action has been logged.",
                ))
            }
            "list" => {
                let found = images.list(invocation.string("filterby")).await;
                if found.is_empty() {
                    Reply::code("No images found.")
                } else {
                    Reply::code(found.iter().map(|r| summary(r, " ago")).collect::<Vec<_>>().join("\n"))
                }
            }
            "purge" => {
                if invocation.require_boolean("verify")? {
                    let purged = images.purge().await?;
                    if purged.is_empty() {
                        Reply::code("No images found.")
                    } else {
                        Reply::code(format!(
                            "Deleted {} image(s). View them below:\n{}",
                            purged.len(),
                            purged.iter().map(|r| summary(r, " ago")).collect::<Vec<_>>().join("\n")
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

#[cfg(test)]
mod tests {
    use crate::cache::testing;
    use crate::commands::{Attachment, Registry};
    use tempfile::TempDir;

    fn photo(url: &str) -> Vec<Attachment> {
        vec![Attachment {
            url: url.to_string(),
            name: None,
        }]
    }

    #[tokio::test]
    async fn create_fetch_delete_purge() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let created = registry
            .handle_line("/img create Logo", "9", photo("https://img/logo"), &cache)
            .await;
        assert_eq!(
            created.content,
            "Image successfully created. Your action has been logged."
        );

        let fetched = registry.handle_line("/img fetch Logo", "1", vec![], &cache).await;
        let file = fetched.attachment.expect("fetch attaches the image");
        assert_eq!(file.name, "Logo.png");
        assert!(file.path.exists());
        assert_eq!(fetched.footer.as_deref(), Some("Last modified by 9"));
        assert!(fetched.content.starts_with("Logo.png [Last accessed "));
        assert!(!fetched.content.ends_with(" ago]"));

        let deleted = registry
            .handle_line("/img delete -name Logo -verify true", "1", vec![], &cache)
            .await;
        assert_eq!(
            deleted.content,
            "Image successfully deleted. Your action has been logged."
        );
        assert!(!file.path.exists());

        let purged = registry.handle_line("/img purge -verify", "1", vec![], &cache).await;
        assert!(purged
            .content
            .starts_with("Deleted 1 image(s). View them below:\nLogo.png [Last accessed "));
    }

    #[tokio::test]
    async fn create_without_image_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/img create logo", "1", vec![], &cache).await;
        assert_eq!(
            reply.content,
            "An error occurred while executing the command `img`: `Missing required option 'image'.`"
        );
    }

    #[tokio::test]
    async fn image_url_may_be_given_as_option() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        registry
            .handle_line("/img create -name cat -image https://img/cat", "1", vec![], &cache)
            .await;
        let listed = registry.handle_line("/img list", "1", vec![], &cache).await;
        assert!(listed.content.starts_with("cat.png [Last accessed "));
    }

    #[tokio::test]
    async fn download_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry
            .handle_line("/img create broken", "1", photo("https://fail"), &cache)
            .await;
        assert_eq!(reply.content, "Download failed: https://fail unreachable");
        let listed = registry.handle_line("/img list", "1", vec![], &cache).await;
        assert_eq!(listed.content, "No images found.");
    }
}
