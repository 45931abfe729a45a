mod builtin;

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub use builtin::builtin_bank;

pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub options: [String; OPTION_COUNT],
    pub correct: usize,
}

impl Question {
    pub fn new(text: &str, options: [&str; OPTION_COUNT], correct: usize) -> Self {
        Self {
            text: text.to_string(),
            options: options.map(str::to_string),
            correct,
        }
    }

    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub questions: Vec<Question>,
}

impl Section {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Immutable set of sections, in display order.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it after
/// [`QuestionBank::new`] has checked the invariants.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuestionBank {
    sections: Vec<Section>,
}

impl QuestionBank {
    pub fn new(sections: Vec<Section>) -> Result<Self> {
        if sections.is_empty() {
            bail!("question bank has no sections");
        }

        let mut seen = HashSet::new();
        for section in &sections {
            if section.name.trim().is_empty() {
                bail!("question bank contains a section with a blank name");
            }
            if !seen.insert(section.name.as_str()) {
                bail!("duplicate section name '{}'", section.name);
            }
            if section.is_empty() {
                bail!("section '{}' has no questions", section.name);
            }
            for (idx, question) in section.questions.iter().enumerate() {
                if question.correct >= OPTION_COUNT {
                    bail!(
                        "section '{}' question {} has correct index {} (expected 0..{})",
                        section.name,
                        idx + 1,
                        question.correct,
                        OPTION_COUNT
                    );
                }
            }
        }

        Ok(Self { sections })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read question bank from {}", path.display()))?;
        let sections: Vec<Section> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse question bank {}", path.display()))?;
        Self::new(sections).with_context(|| format!("Invalid question bank {}", path.display()))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.section(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, correct: usize) -> Section {
        Section {
            name: name.into(),
            questions: vec![Question::new("q", ["a", "b", "c", "d"], correct)],
        }
    }

    #[test]
    fn builtin_bank_has_three_sections_of_five() {
        let bank = builtin_bank();
        assert_eq!(bank.section_names(), vec!["Aptitude", "Reasoning", "Coding"]);
        for section in bank.sections() {
            assert_eq!(section.len(), 5, "section {}", section.name);
        }
        assert_eq!(bank.section("Aptitude").unwrap().questions[0].correct, 1);
    }

    #[test]
    fn rejects_duplicate_section_names() {
        let err = QuestionBank::new(vec![section("Logic", 0), section("Logic", 1)]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_correct_index_out_of_range() {
        assert!(QuestionBank::new(vec![section("Logic", 4)]).is_err());
    }

    #[test]
    fn rejects_empty_section() {
        let empty = Section {
            name: "Empty".into(),
            questions: Vec::new(),
        };
        assert!(QuestionBank::new(vec![empty]).is_err());
    }

    #[test]
    fn loads_bank_from_json() {
        let path = std::env::temp_dir().join(format!("smartexam-bank-{}.json", uuid::Uuid::new_v4()));
        let json = r#"[{"name":"Logic","questions":[{"text":"1+1?","options":["1","2","3","4"],"correct":1}]}]"#;
        fs::write(&path, json).unwrap();

        let bank = QuestionBank::load(&path).unwrap();
        assert_eq!(bank.section_names(), vec!["Logic"]);
        assert!(bank.section("Logic").unwrap().questions[0].is_correct(Some(1)));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_question_without_four_options() {
        let path = std::env::temp_dir().join(format!("smartexam-bank-{}.json", uuid::Uuid::new_v4()));
        let json = r#"[{"name":"Logic","questions":[{"text":"1+1?","options":["1","2"],"correct":1}]}]"#;
        fs::write(&path, json).unwrap();

        assert!(QuestionBank::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
