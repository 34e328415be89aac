//! /ping - latency check.

use async_trait::async_trait;

use super::{Command, CommandMeta, Context, Invocation, OptionSpec, Reply, Result};
use crate::cache::record::now_ms;

pub struct Ping {
    meta: CommandMeta,
}

impl Ping {
    pub fn new() -> Self {
        Self {
            meta: CommandMeta {
                name: "ping",
                about: "Pings the bot.",
                group: "general",
                ephemeral: false,
                options: vec![OptionSpec::string(
                    "message",
                    "A message for the bot to send back to you!",
                    false,
                )],
                lines: include_str!("ping.rs").lines().count(),
            },
        }
    }
}

#[async_trait]
impl Command for Ping {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    async fn run(&self, invocation: &Invocation, _ctx: &Context<'_>) -> Result<Reply> {
        let elapsed = (now_ms() - invocation.issued_at).max(0);
        let message = invocation.string("message").unwrap_or("");
        Ok(Reply::text(
            format!("Took `{}ms`. {}", elapsed, message).trim_end().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::testing;
    use crate::commands::Registry;
    use tempfile::TempDir;

    #[tokio::test]
    async fn echoes_message() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/ping hello there", "1", vec![], &cache).await;
        assert!(reply.content.starts_with("Took `"));
        assert!(reply.content.ends_with("ms`. hello there"));
        assert!(!reply.ephemeral);
    }
}
