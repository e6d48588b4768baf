//! Transcript prompt rendering.
//!
//! The generation service is a plain continuation model: it receives the
//! whole conversation as role-labeled text and continues after the trailing
//! assistant cue.

use parlance_types::chat::Message;

/// Label that signals the model to produce the next assistant turn.
const ASSISTANT_CUE: &str = "assistant: ";

/// Render an ordered message history as a role-labeled transcript.
///
/// Each message becomes `"<role>: <content>\n"`; the result always ends
/// with the content-less assistant cue.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str(&message.role.to_string());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.push_str(ASSISTANT_CUE);
    prompt
}
