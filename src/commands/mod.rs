//! Chat commands: declarative option schemas, a registry, and dispatch.

pub mod args;
pub mod format;
pub mod img;
pub mod man;
pub mod ping;
pub mod tag;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{Cache, StoreError};
use crate::cache::record::now_ms;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command '{0}'.")]
    UnknownCommand(String),

    #[error("Unknown subcommand '{0}'. Expected one of: {1}.")]
    UnknownSubcommand(String, String),

    #[error("Missing subcommand. Expected one of: {0}.")]
    MissingSubcommand(String),

    #[error("Missing required option '{0}'.")]
    MissingOption(String),

    #[error("Unknown option '{0}'.")]
    UnknownOption(String),

    #[error("Invalid value for option '{0}': {1}")]
    InvalidOption(String, String),

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Type of a declared option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Subcommand,
    String,
    Boolean,
    Attachment,
}

/// One entry of a command's option schema.
#[derive(Clone, Debug)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub required: bool,
    /// Nested options, for subcommands only.
    pub options: Vec<OptionSpec>,
}

impl OptionSpec {
    pub fn subcommand(name: &'static str, description: &'static str, options: Vec<OptionSpec>) -> Self {
        Self {
            name,
            description,
            kind: OptionKind::Subcommand,
            required: false,
            options,
        }
    }

    pub fn string(name: &'static str, description: &'static str, required: bool) -> Self {
        Self::leaf(name, description, OptionKind::String, required)
    }

    pub fn boolean(name: &'static str, description: &'static str, required: bool) -> Self {
        Self::leaf(name, description, OptionKind::Boolean, required)
    }

    pub fn attachment(name: &'static str, description: &'static str, required: bool) -> Self {
        Self::leaf(name, description, OptionKind::Attachment, required)
    }

    fn leaf(name: &'static str, description: &'static str, kind: OptionKind, required: bool) -> Self {
        Self {
            name,
            description,
            kind,
            required,
            options: Vec::new(),
        }
    }
}

/// Static description of a command.
#[derive(Clone, Debug)]
pub struct CommandMeta {
    pub name: &'static str,
    pub about: &'static str,
    pub group: &'static str,
    pub ephemeral: bool,
    pub options: Vec<OptionSpec>,
    /// Line count of the command's source file.
    pub lines: usize,
}

impl CommandMeta {
    fn subcommands(&self) -> Vec<&OptionSpec> {
        self.options
            .iter()
            .filter(|o| o.kind == OptionKind::Subcommand)
            .collect()
    }

    /// Options that apply to `subcommand`, or the top-level ones.
    fn scope(&self, subcommand: Option<&str>) -> &[OptionSpec] {
        match subcommand {
            Some(sub) => self
                .options
                .iter()
                .find(|o| o.kind == OptionKind::Subcommand && o.name == sub)
                .map(|o| o.options.as_slice())
                .unwrap_or(&[]),
            None => &self.options,
        }
    }
}

/// An uploaded file referenced by URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Boolean(bool),
    Attachment(Attachment),
}

/// A user-issued command with typed options.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub command: String,
    pub subcommand: Option<String>,
    pub options: HashMap<String, OptionValue>,
    pub user_id: String,
    /// When the invocation was built (ms).
    pub issued_at: i64,
}

impl Invocation {
    pub fn new(command: &str, user_id: &str) -> Self {
        Self {
            command: command.to_string(),
            subcommand: None,
            options: HashMap::new(),
            user_id: user_id.to_string(),
            issued_at: now_ms(),
        }
    }

    pub fn with_subcommand(mut self, subcommand: &str) -> Self {
        self.subcommand = Some(subcommand.to_string());
        self
    }

    pub fn with_option(mut self, name: &str, value: OptionValue) -> Self {
        self.options.insert(name.to_string(), value);
        self
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.options.get(name) {
            Some(OptionValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.options.get(name) {
            Some(OptionValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        match self.options.get(name) {
            Some(OptionValue::Attachment(a)) => Some(a),
            _ => None,
        }
    }

    pub fn require_string(&self, name: &str) -> Result<&str> {
        self.string(name)
            .ok_or_else(|| CommandError::MissingOption(name.to_string()))
    }

    pub fn require_boolean(&self, name: &str) -> Result<bool> {
        self.boolean(name)
            .ok_or_else(|| CommandError::MissingOption(name.to_string()))
    }

    pub fn require_attachment(&self, name: &str) -> Result<&Attachment> {
        self.attachment(name)
            .ok_or_else(|| CommandError::MissingOption(name.to_string()))
    }
}

/// A local file sent along with a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttachment {
    pub path: PathBuf,
    pub name: String,
}

/// Platform-neutral command output.
#[derive(Clone, Debug)]
pub struct Reply {
    pub content: String,
    /// Render `content` as a code block.
    pub monospace: bool,
    pub title: Option<String>,
    pub link: Option<String>,
    pub attachment: Option<FileAttachment>,
    pub footer: Option<String>,
    pub timestamp: i64,
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            monospace: false,
            title: None,
            link: None,
            attachment: None,
            footer: None,
            timestamp: now_ms(),
            ephemeral: false,
        }
    }

    pub fn code(content: impl Into<String>) -> Self {
        Self {
            monospace: true,
            ..Self::text(content)
        }
    }
}

/// What a command can reach while running.
pub struct Context<'a> {
    pub cache: &'a Cache,
    pub registry: &'a Registry,
}

#[async_trait]
pub trait Command: Send + Sync {
    fn meta(&self) -> &CommandMeta;

    async fn run(&self, invocation: &Invocation, ctx: &Context<'_>) -> Result<Reply>;
}

/// Named commands available to the dispatcher.
#[derive(Default)]
pub struct Registry {
    commands: BTreeMap<String, Box<dyn Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ping::Ping::new());
        registry.register(man::Man::new());
        registry.register(tag::Tag::new());
        registry.register(img::Img::new());
        registry
    }

    pub fn register<C: Command + 'static>(&mut self, command: C) {
        let name = command.meta().name.to_string();
        tracing::debug!("Registered command '{}'", name);
        self.commands.insert(name, Box::new(command));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Build an invocation from a text line, typing options by schema.
    ///
    /// The first word selects the subcommand for commands that have them.
    /// Remaining words before any option fill the first string option.
    /// `attachments` are assigned to attachment options in schema order.
    pub fn parse(&self, line: &str, user_id: &str, attachments: Vec<Attachment>) -> Result<Invocation> {
        // First pass: command and subcommand only, so the option scope is known.
        let words = args::parse_line(line, |_| false)
            .ok_or_else(|| CommandError::UnknownCommand(line.trim().to_string()))?;
        let command = self
            .get(&words.command)
            .ok_or_else(|| CommandError::UnknownCommand(words.command.clone()))?;
        let meta = command.meta();

        let mut invocation = Invocation::new(meta.name, user_id);

        let subcommands = meta.subcommands();
        if !subcommands.is_empty() {
            invocation.subcommand = words.positional.first().map(|s| s.to_lowercase());
            if let Some(sub) = invocation.subcommand.as_deref() {
                if !subcommands.iter().any(|s| s.name == sub) {
                    let names = subcommands.iter().map(|s| s.name).collect::<Vec<_>>().join(", ");
                    return Err(CommandError::UnknownSubcommand(sub.to_string(), names));
                }
            }
        }
        let scope = meta.scope(invocation.subcommand.as_deref());

        let parsed = args::parse_line(line, |name| {
            scope
                .iter()
                .any(|o| o.name == name && o.kind != OptionKind::Subcommand)
        })
        .ok_or_else(|| CommandError::UnknownCommand(line.trim().to_string()))?;
        let mut positional = parsed.positional.into_iter();
        if invocation.subcommand.is_some() {
            positional.next();
        }

        let rest: Vec<String> = positional.collect();
        if !rest.is_empty() {
            let target = scope
                .iter()
                .find(|o| o.kind == OptionKind::String)
                .ok_or_else(|| {
                    CommandError::UnknownOption(rest[0].trim_start_matches('-').to_string())
                })?;
            invocation
                .options
                .insert(target.name.to_string(), OptionValue::String(rest.join(" ")));
        }

        for (name, value) in parsed.options {
            let spec = scope
                .iter()
                .find(|o| o.name == name && o.kind != OptionKind::Subcommand)
                .ok_or_else(|| CommandError::UnknownOption(name.clone()))?;
            let typed = match spec.kind {
                OptionKind::String => OptionValue::String(value.ok_or_else(|| {
                    CommandError::InvalidOption(name.clone(), "expected a value".to_string())
                })?),
                OptionKind::Boolean => OptionValue::Boolean(
                    args::parse_bool(value.as_deref()).ok_or_else(|| {
                        CommandError::InvalidOption(name.clone(), "expected true or false".to_string())
                    })?,
                ),
                OptionKind::Attachment => OptionValue::Attachment(Attachment {
                    url: value.ok_or_else(|| {
                        CommandError::InvalidOption(name.clone(), "expected a URL".to_string())
                    })?,
                    name: None,
                }),
                OptionKind::Subcommand => unreachable!("filtered above"),
            };
            invocation.options.insert(name, typed);
        }

        let mut attachments = attachments.into_iter();
        for spec in scope.iter().filter(|o| o.kind == OptionKind::Attachment) {
            if invocation.options.contains_key(spec.name) {
                continue;
            }
            match attachments.next() {
                Some(a) => {
                    invocation
                        .options
                        .insert(spec.name.to_string(), OptionValue::Attachment(a));
                }
                None => break,
            }
        }

        Ok(invocation)
    }

    /// Check an invocation against the command's schema.
    pub fn validate(&self, invocation: &Invocation) -> Result<()> {
        let command = self
            .get(&invocation.command)
            .ok_or_else(|| CommandError::UnknownCommand(invocation.command.clone()))?;
        let meta = command.meta();

        let subcommands = meta.subcommands();
        if !subcommands.is_empty() {
            let names = subcommands.iter().map(|s| s.name).collect::<Vec<_>>().join(", ");
            match invocation.subcommand.as_deref() {
                None => return Err(CommandError::MissingSubcommand(names)),
                Some(sub) if !subcommands.iter().any(|s| s.name == sub) => {
                    return Err(CommandError::UnknownSubcommand(sub.to_string(), names));
                }
                Some(_) => {}
            }
        }

        let scope = meta.scope(invocation.subcommand.as_deref());
        for spec in scope.iter().filter(|o| o.required) {
            let present = match (spec.kind, invocation.options.get(spec.name)) {
                (OptionKind::String, Some(OptionValue::String(_))) => true,
                (OptionKind::Boolean, Some(OptionValue::Boolean(_))) => true,
                (OptionKind::Attachment, Some(OptionValue::Attachment(_))) => true,
                _ => false,
            };
            if !present {
                return Err(CommandError::MissingOption(spec.name.to_string()));
            }
        }
        Ok(())
    }

    /// Validate and run an invocation, always producing a reply.
    pub async fn dispatch(&self, invocation: &Invocation, cache: &Cache) -> Reply {
        let Some(command) = self.get(&invocation.command) else {
            return Reply::text(unknown_command_text());
        };
        let meta = command.meta();

        let ctx = Context {
            cache,
            registry: self,
        };
        let outcome = match self.validate(invocation) {
            Ok(()) => command.run(invocation, &ctx).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(mut reply) => {
                reply.ephemeral = meta.ephemeral;
                tracing::debug!(
                    "Ran /{} {:?} for {}",
                    meta.name,
                    invocation.subcommand,
                    invocation.user_id
                );
                reply
            }
            Err(e) => {
                tracing::warn!("Command /{} failed: {}", meta.name, e);
                let mut reply = Reply::text(format!(
                    "An error occurred while executing the command `{}`: `{}`",
                    meta.name, e
                ));
                reply.ephemeral = meta.ephemeral;
                reply
            }
        }
    }

    /// Parse a text line and dispatch it.
    pub async fn handle_line(
        &self,
        line: &str,
        user_id: &str,
        attachments: Vec<Attachment>,
        cache: &Cache,
    ) -> Reply {
        match self.parse(line, user_id, attachments) {
            Ok(invocation) => self.dispatch(&invocation, cache).await,
            Err(CommandError::UnknownCommand(_)) => Reply::text(unknown_command_text()),
            Err(e) => {
                let name = args::parse_line(line, |_| false).map(|p| p.command).unwrap_or_default();
                Reply::text(format!(
                    "An error occurred while executing the command `{}`: `{}`",
                    name, e
                ))
            }
        }
    }
}

fn unknown_command_text() -> &'static str {
    "Unknown command. Send /man for a list of commands."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing;
    use tempfile::TempDir;

    #[test]
    fn standard_registry_has_builtins() {
        let registry = Registry::standard();
        let names: Vec<&str> = registry.iter().map(|c| c.meta().name).collect();
        assert_eq!(names, vec!["img", "man", "ping", "tag"]);
    }

    #[test]
    fn parse_fills_subcommand_and_positional_name() {
        let registry = Registry::standard();
        let inv = registry.parse("/tag fetch Greeting", "7", vec![]).unwrap();

        assert_eq!(inv.command, "tag");
        assert_eq!(inv.subcommand.as_deref(), Some("fetch"));
        assert_eq!(inv.string("name"), Some("Greeting"));
        assert_eq!(inv.user_id, "7");
    }

    #[test]
    fn parse_types_booleans() {
        let registry = Registry::standard();
        let inv = registry.parse("/tag delete -name a -verify no", "1", vec![]).unwrap();
        assert_eq!(inv.boolean("verify"), Some(false));

        let err = registry.parse("/tag delete -name a -verify perhaps", "1", vec![]).unwrap_err();
        assert!(matches!(err, CommandError::InvalidOption(name, _) if name == "verify"));
    }

    #[test]
    fn parse_rejects_unknown_subcommand() {
        let registry = Registry::standard();
        let err = registry.parse("/tag explode everything", "1", vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown subcommand 'explode'. Expected one of: create, delete, fetch, update, list, purge."
        );
    }

    #[test]
    fn parse_rejects_unknown_option() {
        let registry = Registry::standard();
        let err = registry.parse("/tag purge -colour red", "1", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown option 'colour'.");
    }

    #[test]
    fn invocation_is_stamped_when_built() {
        let before = now_ms();
        let invocation = Invocation::new("ping", "1");
        assert!(invocation.issued_at >= before);
        assert!(invocation.issued_at <= now_ms());
    }

    #[test]
    fn parse_keeps_dashed_words_inside_values() {
        let registry = Registry::standard();
        let invocation = registry
            .parse("/tag create -name build -content run cargo test -q please", "1", vec![])
            .unwrap();

        assert_eq!(invocation.string("name"), Some("build"));
        assert_eq!(invocation.string("content"), Some("run cargo test -q please"));
    }

    #[test]
    fn parse_assigns_platform_attachments() {
        let registry = Registry::standard();
        let photo = Attachment {
            url: "https://files/photo.png".into(),
            name: None,
        };
        let inv = registry.parse("/img create logo", "1", vec![photo.clone()]).unwrap();

        assert_eq!(inv.attachment("image"), Some(&photo));
        assert_eq!(inv.string("name"), Some("logo"));
    }

    #[test]
    fn validate_reports_missing_pieces() {
        let registry = Registry::standard();

        let no_sub = Invocation::new("tag", "1");
        assert!(matches!(
            registry.validate(&no_sub),
            Err(CommandError::MissingSubcommand(_))
        ));

        let bad_sub = Invocation::new("tag", "1").with_subcommand("explode");
        assert!(matches!(
            registry.validate(&bad_sub),
            Err(CommandError::UnknownSubcommand(..))
        ));

        let no_content = Invocation::new("tag", "1")
            .with_subcommand("create")
            .with_option("name", OptionValue::String("a".into()));
        assert_eq!(
            registry.validate(&no_content).unwrap_err().to_string(),
            "Missing required option 'content'."
        );
    }

    #[tokio::test]
    async fn unknown_command_reply() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/dance", "1", vec![], &cache).await;
        assert_eq!(reply.content, "Unknown command. Send /man for a list of commands.");
    }

    #[tokio::test]
    async fn failures_are_wrapped_with_command_name() {
        let dir = TempDir::new().unwrap();
        let cache = testing::open(dir.path());
        let registry = Registry::standard();

        let reply = registry.handle_line("/tag create -name a", "1", vec![], &cache).await;
        assert_eq!(
            reply.content,
            "An error occurred while executing the command `tag`: `Missing required option 'content'.`"
        );
        assert!(reply.ephemeral);
    }
}
