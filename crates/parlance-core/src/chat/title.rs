//! Conversation title derivation from the first user message.

/// Title used when the first message carries no text.
pub const PLACEHOLDER_TITLE: &str = "New conversation";

/// Maximum title length in Unicode code points (not bytes).
const MAX_TITLE_CHARS: usize = 20;

/// Derive a conversation title from its first user message.
///
/// Takes up to 20 code points; longer messages are truncated and suffixed
/// with `"..."`. Counting code points rather than bytes keeps multi-byte
/// text from being split mid-character.
pub fn derive_title(message: &str) -> String {
    if message.is_empty() {
        return PLACEHOLDER_TITLE.to_string();
    }
    if message.chars().count() <= MAX_TITLE_CHARS {
        return message.to_string();
    }
    let truncated: String = message.chars().take(MAX_TITLE_CHARS).collect();
    format!("{truncated}...")
}
