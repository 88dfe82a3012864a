//! Prompts for script generation.
//!
//! Callers can override the system prompt via
//! [`crate::config::ClientConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

/// Default system prompt: a short executive summary with a punchy opening,
/// sized for YouTube Shorts and TikTok narration.
pub const SCRIPT_SYSTEM_PROMPT: &str = "You are a talented expert specializing in crafting captivating short-form content \n\
for platforms like YouTube Shorts and TikTok. Based on the following text, write a short executive summary.\n\
Make sure there is some pop to the opening of the summary. Be concise but get the idea of the topic.";

/// Build the user message carrying the extracted PDF text.
pub fn summary_request(text: &str) -> String {
    format!("Create a short executive summary of:\n\n{}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_request_embeds_text_after_blank_line() {
        assert_eq!(
            summary_request("Quarterly results"),
            "Create a short executive summary of:\n\nQuarterly results"
        );
    }

    #[test]
    fn system_prompt_targets_short_form() {
        assert!(SCRIPT_SYSTEM_PROMPT.contains("YouTube Shorts"));
        assert!(SCRIPT_SYSTEM_PROMPT.contains("executive summary"));
    }

    #[test]
    fn system_prompt_keeps_its_three_lines() {
        let lines: Vec<&str> = SCRIPT_SYSTEM_PROMPT.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("short-form content "));
        assert!(lines[1].starts_with("for platforms like YouTube Shorts"));
        assert!(lines[2].starts_with("Make sure there is some pop"));
    }
}
