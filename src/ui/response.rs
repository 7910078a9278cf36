/// Discord's hard limit for message content
pub const MESSAGE_LIMIT: usize = 2000;
pub const OVERFLOW_FILENAME: &str = "output.txt";
const LOG_EXCERPT_LIMIT: usize = 1000;

/// How a piece of text goes out
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Attachment {
        note: String,
        filename: String,
        content: String,
    },
}

/// Plain message when it fits, otherwise a text-file attachment
pub fn format_reply(content: &str) -> Reply {
    if content.chars().count() <= MESSAGE_LIMIT {
        Reply::Text(content.to_string())
    } else {
        Reply::Attachment {
            note: "Output too long, here's a file:".to_string(),
            filename: OVERFLOW_FILENAME.to_string(),
            content: content.to_string(),
        }
    }
}

/// Pretty JSON cut to a readable excerpt inside a code block
pub fn log_excerpt(value: &serde_json::Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let excerpt: String = pretty.chars().take(LOG_EXCERPT_LIMIT).collect();
    format!("Recent Logs:\n```\n{}\n```", excerpt)
}
