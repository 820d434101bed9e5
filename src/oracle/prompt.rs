//! Bounded prompt construction for the commitment oracle.
//!
//! The prompt carries sender, recipients, subject, date and a truncated
//! body — enough for classification, small enough to stay inside the
//! oracle's input budget regardless of message size.

use crate::types::Message;

/// Body text beyond this many characters is truncated before prompting.
pub const MAX_BODY_CHARS: usize = 2000;

/// One oracle call's input.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub message_id: String,
    pub prompt: String,
}

impl OracleRequest {
    /// Build the bounded prompt for one message.
    pub fn from_message(message: &Message) -> Self {
        let body = truncate_chars(&message.body, MAX_BODY_CHARS);

        let prompt = format!(
            "Identify commitments (promises to perform a future action) in this message.\n\
             \n\
             From: {}\n\
             To: {}\n\
             Subject: {}\n\
             Date: {}\n\
             \n\
             {}\n\
             \n\
             Return a JSON object with a \"commitments\" array. Each entry:\n\
             - \"text\": the exact quoted commitment sentence\n\
             - \"party\": \"sender\" or \"recipient\" (who promised)\n\
             - \"dueDate\": ISO date if one is stated or clearly implied, else null\n\
             - \"context\": one short phrase of surrounding context\n\
             - \"confidence\": 0.0-1.0\n\
             Return {{\"commitments\": []}} if there are none.",
            message.from,
            message.to.join(", "),
            message.subject,
            message.timestamp.to_rfc3339(),
            body,
        );

        Self {
            message_id: message.id.clone(),
            prompt,
        }
    }
}

/// Truncate on a char boundary, appending an ellipsis marker when cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}…", truncated)
}
