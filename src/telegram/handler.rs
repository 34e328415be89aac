//! Telegram message handling: incoming commands to invocations, replies back.

use std::sync::Arc;

use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{InputFile, Message, ParseMode};
use teloxide::RequestError;

use crate::cache::Cache;
use crate::commands::{Attachment, Registry, Reply};

/// Telegram's limits are 4096 characters for text and 1024 for captions.
const TEXT_LIMIT: usize = 3900;
const CAPTION_LIMIT: usize = 900;

/// Shared state for every update.
pub struct BotState {
    pub cache: Cache,
    pub registry: Registry,
    pub username: String,
}

/// Handle incoming messages.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> Result<(), RequestError> {
    let text = msg.text().or_else(|| msg.caption()).unwrap_or("").trim().to_string();
    if text.is_empty() {
        return Ok(());
    }

    if msg.from.as_ref().map_or(false, |u| u.is_bot) {
        return Ok(());
    }

    if !text.starts_with('/') {
        if mentions(&text, &state.username) {
            let status = bot.send_message(msg.chat.id, "Building Commands... Please Wait!").await?;
            super::client::publish_commands(&bot, &state.registry).await;
            bot.edit_message_text(msg.chat.id, status.id, "Commands Built!").await?;
        }
        return Ok(());
    }

    // Commands addressed to another bot in a group.
    if let Some(target) = addressed_bot(&text) {
        if !target.eq_ignore_ascii_case(&state.username) {
            return Ok(());
        }
    }

    let user_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "0".to_string());

    let attachments = match image_attachment(&bot, &msg).await {
        Ok(found) => found.into_iter().collect(),
        Err(e) => {
            tracing::warn!("Failed to resolve attachment: {}", e);
            Vec::new()
        }
    };

    tracing::info!("Command from {}: {}", user_id, text);
    let reply = state
        .registry
        .handle_line(&text, &user_id, attachments, &state.cache)
        .await;

    send_reply(&bot, msg.chat.id, &reply).await
}

/// Send a reply, as a photo when it carries an attachment.
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<(), RequestError> {
    match &reply.attachment {
        Some(file) => {
            let photo = InputFile::file(file.path.clone()).file_name(file.name.clone());
            bot.send_photo(chat_id, photo)
                .caption(render_html(reply, CAPTION_LIMIT))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        None => {
            bot.send_message(chat_id, render_html(reply, TEXT_LIMIT))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

/// Resolve the image sent with a message (photo or image document) to a
/// downloadable URL.
async fn image_attachment(bot: &Bot, msg: &Message) -> Result<Option<Attachment>, RequestError> {
    let (file_id, name) = if let Some(last) = msg.photo().and_then(|p| p.last()) {
        (last.file.id.clone(), None)
    } else if let Some(doc) = msg.document() {
        let is_image = doc
            .mime_type
            .as_ref()
            .map_or(false, |m| m.type_().as_str() == "image");
        if !is_image {
            return Ok(None);
        }
        (doc.file.id.clone(), doc.file_name.clone())
    } else {
        return Ok(None);
    };

    let file = bot.get_file(file_id).await?;
    let url = format!("https://api.telegram.org/file/bot{}/{}", bot.token(), file.path);
    Ok(Some(Attachment { url, name }))
}

/// The `bot` in `/command@bot ...`, if present.
fn addressed_bot(text: &str) -> Option<&str> {
    let head = text.split_whitespace().next()?;
    head.split_once('@').map(|(_, bot)| bot)
}

fn mentions(text: &str, username: &str) -> bool {
    !username.is_empty()
        && text
            .split_whitespace()
            .any(|w| w.trim_start_matches('@').eq_ignore_ascii_case(username) && w.starts_with('@'))
}

/// Render a reply as Telegram HTML, truncating the body to `limit` characters.
pub fn render_html(reply: &Reply, limit: usize) -> String {
    let mut body: String = reply.content.chars().take(limit).collect();
    if body.len() < reply.content.len() {
        body.push_str("\n...[truncated]");
    }
    let body = escape_html(&body);

    let mut out = String::new();
    match (&reply.title, &reply.link) {
        (Some(title), Some(link)) => {
            out.push_str(&format!(
                "<a href=\"{}\">{}</a>\n",
                escape_html(link),
                escape_html(title)
            ));
        }
        (Some(title), None) => out.push_str(&format!("<b>{}</b>\n", escape_html(title))),
        _ => {}
    }

    if reply.monospace {
        out.push_str(&format!("<pre>{}</pre>", body));
    } else {
        out.push_str(&body);
    }

    if let Some(footer) = &reply.footer {
        out.push_str(&format!("\n<i>{}</i>", escape_html(footer)));
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_code_block_with_link_and_footer() {
        let mut reply = Reply::code("rules: <be nice> & kind");
        reply.title = Some("https://x.test/?a=1&b=2".into());
        reply.link = reply.title.clone();
        reply.footer = Some("Last modified by 42".into());

        assert_eq!(
            render_html(&reply, TEXT_LIMIT),
            "<a href=\"https://x.test/?a=1&amp;b=2\">https://x.test/?a=1&amp;b=2</a>\n\
             <pre>rules: &lt;be nice&gt; &amp; kind</pre>\n\
             <i>Last modified by 42</i>"
        );
    }

    #[test]
    fn plain_text_is_escaped_and_truncated() {
        let reply = Reply::text("a<b".repeat(10));
        let html = render_html(&reply, 4);
        assert_eq!(html, "a&lt;ba\n...[truncated]");
    }

    #[test]
    fn detects_addressed_bot_and_mentions() {
        assert_eq!(addressed_bot("/tag@eden_bot list"), Some("eden_bot"));
        assert_eq!(addressed_bot("/tag list"), None);
        assert!(mentions("hey @Eden_Bot build", "eden_bot"));
        assert!(!mentions("hey eden_bot", "eden_bot"));
        assert!(!mentions("hey @someone", ""));
    }
}
