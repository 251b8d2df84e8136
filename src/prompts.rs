//! The two texts sent with every screenshot.
//!
//! The system prompt can be replaced through
//! [`crate::config::GenerationConfig::system_prompt`]; the user instruction is
//! fixed.

/// Default system prompt for turning a screenshot into a single HTML file.
///
/// The output lands in a sandboxed frame as its whole document, so the model
/// must pull Tailwind from the CDN itself; nothing is provided by the host.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert Frontend Developer.
Your task is to generate HTML code using Tailwind CSS that exactly matches the provided screenshot.
- Output ONLY the full HTML code. Do not include markdown backticks or explanations.
- Use a single HTML file with Tailwind CDN for simplicity in preview.
- Use widely available fonts and placeholder images (via unsplash) if text/images are unreadable.
- The code should be fully responsive and accessible.
- If the image contains a specific component, generate just that component wrapped in a container.
- Ensure the background color matches the screenshot."#;

/// Text that accompanies the image in the user turn.
pub const USER_INSTRUCTION: &str = "Generate code for this screenshot.";

/// Resolve the system prompt, honouring an override.
pub fn system_prompt(custom: Option<&str>) -> &str {
    custom.unwrap_or(DEFAULT_SYSTEM_PROMPT)
}
