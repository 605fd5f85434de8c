use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use vigil_core::question::QuestionSet;

/// The stock behavioral set, asked when no question file is supplied.
const DEFAULT_QUESTIONS: [&str; 4] = [
    "Tell me about a challenging project you've worked on recently and how you overcame obstacles.",
    "Explain a complex technical concept to someone without a technical background.",
    "Describe a time you had a conflict with a team member. How did you resolve it?",
    "Where do you see yourself in your career in the next 3-5 years?",
];

pub fn default_questions() -> QuestionSet {
    QuestionSet::from_texts(DEFAULT_QUESTIONS)
}

/// Loads a question file: a JSON array of question strings, asked in order.
pub fn load_questions(path: &Path) -> Result<QuestionSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read question file: {}", path.display()))?;

    let texts: Vec<String> = serde_json::from_str(&raw).with_context(|| {
        format!(
            "Question file is not a JSON array of strings: {}",
            path.display()
        )
    })?;

    if texts.is_empty() {
        anyhow::bail!("Question file {} contains no questions", path.display());
    }
    Ok(QuestionSet::from_texts(texts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_questions_in_file_order() -> Result<()> {
        // 1. Arrange: a valid question file.
        let mut file = NamedTempFile::new()?;
        writeln!(file, r#"["What is ownership?", "What is borrowing?"]"#)?;

        // 2. Act
        let questions = load_questions(file.path())?;

        // 3. Assert: order and ordinals follow the file.
        assert_eq!(questions.len(), 2);
        assert_eq!(questions.get(0).unwrap().text, "What is ownership?");
        assert_eq!(questions.get(1).unwrap().text, "What is borrowing?");
        assert_eq!(questions.get(1).unwrap().ordinal, 1);
        Ok(())
    }

    #[test]
    fn test_load_questions_rejects_empty_array() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[]")?;

        assert!(load_questions(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_load_questions_rejects_non_array_json() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, r#"{{"questions": ["nested"]}}"#)?;

        assert!(load_questions(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_load_questions_from_missing_file() {
        let result = load_questions(Path::new("nonexistent_questions_for_testing.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_set_has_four_questions() {
        let questions = default_questions();
        assert_eq!(questions.len(), 4);
        assert!(questions.get(0).unwrap().text.contains("challenging project"));
    }
}
