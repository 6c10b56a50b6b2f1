use anyhow::{Context as _, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Preamble used when no system template is configured or the template is empty.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question \
concisely using only the information in the provided context.";

static SYSTEM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"SYSTEM\s*"""\s*([\s\S]*?)\s*""""#).expect("system block pattern is valid")
});

/// Reads a Modelfile-style template and returns the text of its
/// `SYSTEM """ ... """` block, trimmed. A template without that block yields an
/// empty string.
pub fn load_system_template(path: &Path) -> Result<String> {
    let template = fs::read_to_string(path)
        .with_context(|| format!("Failed to read system template: {}", path.display()))?;
    Ok(extract_system_block(&template).unwrap_or_default())
}

fn extract_system_block(template: &str) -> Option<String> {
    let captures = SYSTEM_BLOCK.captures(template)?;
    Some(captures.get(1)?.as_str().trim().to_string())
}

/// The single prompt sent to the language model for one question.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>) -> Self {
        let system = system.into();
        let system = if system.trim().is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            system
        };
        Self { system }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn render(&self, context: &str, question: &str) -> String {
        format!(
            "SYSTEM: {system}\n\n\
             CONTEXT: {context}\n\n\
             USER QUESTION: {question}\n\n\
             RESPONSE RULES:\n\
             - Use ONLY the provided context\n\
             - If the context is {marker}, say that you don't have that information\n\n\
             ANSWER:",
            system = self.system,
            marker = crate::context::NO_RELEVANT_CONTEXT,
        )
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_system_block_from_modelfile() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("default.txt");
        let mut file = File::create(&path)?;
        writeln!(file, "FROM llama3.2:3b")?;
        writeln!(file, "PARAMETER temperature 0.1")?;
        writeln!(file, "SYSTEM \"\"\"")?;
        writeln!(file, "  You are the city's library assistant.")?;
        writeln!(file, "  Keep answers short.")?;
        writeln!(file, "\"\"\"")?;

        let system = load_system_template(&path)?;

        assert_eq!(
            system,
            "You are the city's library assistant.\n  Keep answers short."
        );
        Ok(())
    }

    #[test]
    fn test_template_without_system_block_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("plain.txt");
        fs::write(&path, "FROM llama3.2:3b\nSYSTEM_PROMPT is not a block\n")?;

        assert_eq!(load_system_template(&path)?, "");
        Ok(())
    }

    #[test]
    fn test_inline_system_block() {
        let template = "FROM llama3.2:3b\nSYSTEM \"\"\"Answer in one sentence.\"\"\"\nPARAMETER top_k 50\n";
        assert_eq!(
            extract_system_block(template).as_deref(),
            Some("Answer in one sentence.")
        );
    }

    #[test]
    fn test_unterminated_system_block_is_ignored() {
        assert_eq!(extract_system_block("SYSTEM \"\"\" never closed"), None);
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let result = load_system_template(Path::new("nonexistent_dir_for_templates/default.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_render_places_every_section() {
        let prompt = PromptTemplate::new("Be brief.")
            .render("Open 9am to 5pm.", "What are the library hours?");

        assert!(prompt.starts_with("SYSTEM: Be brief.\n\nCONTEXT: Open 9am to 5pm.\n\n"));
        assert!(prompt.contains("USER QUESTION: What are the library hours?\n\n"));
        assert!(prompt.contains("NO_RELEVANT_CONTEXT"));
        assert!(prompt.ends_with("ANSWER:"));
    }

    #[test]
    fn test_blank_system_falls_back_to_default() {
        assert_eq!(PromptTemplate::new("   ").system(), DEFAULT_SYSTEM_PROMPT);
    }
}
