//! Question bank import files.
//!
//! A bank file is a JSON array of `{"question", "options", "answer"}`
//! objects. Entries are validated before anything is stored.

use std::path::Path;

use super::Quiz;
use crate::error::{Result, ValidationError};

/// Only four answer reactions exist, so further options are unreachable.
pub const MAX_OPTIONS: usize = 4;

pub fn validate_quiz(quiz: &Quiz) -> Result<(), ValidationError> {
    if quiz.question.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "question".into(),
            message: "must not be empty".into(),
        });
    }
    if quiz.options.is_empty() {
        return Err(ValidationError::EmptyCollection("options".into()));
    }
    if quiz.options.len() > MAX_OPTIONS {
        return Err(ValidationError::InvalidValue {
            field: "options".into(),
            message: format!(
                "{} options given, at most {MAX_OPTIONS} can be answered",
                quiz.options.len()
            ),
        });
    }
    if quiz.answer >= quiz.options.len() {
        return Err(ValidationError::OutOfBounds {
            collection: "options".into(),
            index: quiz.answer,
            len: quiz.options.len(),
        });
    }
    Ok(())
}

/// Parse and validate a bank file's contents.
pub fn parse_bank(json: &str) -> Result<Vec<Quiz>> {
    let quizzes: Vec<Quiz> = serde_json::from_str(json)?;
    for (i, quiz) in quizzes.iter().enumerate() {
        validate_quiz(quiz).map_err(|e| ValidationError::InvalidValue {
            field: format!("entry {i}"),
            message: e.to_string(),
        })?;
    }
    Ok(quizzes)
}

pub fn load_bank(path: &Path) -> Result<Vec<Quiz>> {
    let content = std::fs::read_to_string(path)?;
    parse_bank(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::io::Write;

    #[test]
    fn parses_entries_without_ids() {
        let quizzes = parse_bank(
            r#"[{"question": "Capital of France?", "options": ["Paris", "Rome"], "answer": 0}]"#,
        )
        .unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].id, 0);
        assert_eq!(quizzes[0].correct_option(), "Paris");
    }

    #[test]
    fn rejects_five_options() {
        let err = parse_bank(
            r#"[{"question": "q", "options": ["a", "b", "c", "d", "e"], "answer": 0}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("entry 0"));
    }

    #[test]
    fn rejects_answer_out_of_range() {
        let quiz = Quiz {
            id: 0,
            question: "q".into(),
            options: vec!["a".into(), "b".into()],
            answer: 2,
        };
        assert!(matches!(
            validate_quiz(&quiz),
            Err(ValidationError::OutOfBounds { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"question": "1+1?", "options": ["2"], "answer": 0}}]"#).unwrap();
        assert_eq!(load_bank(file.path()).unwrap().len(), 1);
    }
}
