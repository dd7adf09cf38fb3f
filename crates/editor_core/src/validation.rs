//! Advisory checks over a paper. Issues never block editing; callers use
//! them to gate publish and preview.

use serde::Serialize;
use shared::domain::Paper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|issue| issue.severity == Severity::Error)
}

/// Computes the issues for `paper` in a fixed order: paper fields first, then
/// each section followed by its questions. Positions in messages are 1-based
/// and follow list order, not `seq`.
pub fn validate(paper: Option<&Paper>) -> Vec<ValidationIssue> {
    let Some(paper) = paper else {
        return Vec::new();
    };
    let mut issues = Vec::new();

    if paper.title.trim().is_empty() {
        issues.push(ValidationIssue::error("paper.title", "Paper title is required"));
    }
    if paper.duration.map_or(true, |duration| duration <= 0) {
        issues.push(ValidationIssue::warning(
            "paper.duration",
            "Paper duration should be greater than 0",
        ));
    }
    if paper.sections.is_empty() {
        issues.push(ValidationIssue::error(
            "paper.sections",
            "Paper must contain at least one section",
        ));
    }

    for (section_index, section) in paper.sections.iter().enumerate() {
        let section_no = section_index + 1;
        let section_path = format!("paper.sections[{section_index}]");

        if section.name.trim().is_empty() {
            issues.push(ValidationIssue::error(
                format!("{section_path}.name"),
                format!("Section {section_no} name is required"),
            ));
        }
        if section.questions.is_empty() {
            issues.push(ValidationIssue::warning(
                format!("{section_path}.questions"),
                format!("Section {section_no} has no questions"),
            ));
        }

        for (question_index, question) in section.questions.iter().enumerate() {
            let question_no = question_index + 1;
            let question_path = format!("{section_path}.questions[{question_index}]");

            if question.content.trim().is_empty() {
                issues.push(ValidationIssue::error(
                    format!("{question_path}.content"),
                    format!("Section {section_no} question {question_no} content is required"),
                ));
            }

            let choice_style = paper
                .effective_question_type(section, question)
                .is_some_and(|kind| kind.is_choice_style());
            if !choice_style {
                continue;
            }
            if question.options.len() < 2 {
                issues.push(ValidationIssue::error(
                    format!("{question_path}.options"),
                    format!(
                        "Section {section_no} question {question_no} needs at least 2 options"
                    ),
                ));
            }
            if !question.options.iter().any(|option| option.is_correct) {
                issues.push(ValidationIssue::error(
                    format!("{question_path}.options"),
                    format!("Section {section_no} question {question_no} has no correct option"),
                ));
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use shared::domain::{Question, QuestionOption, QuestionType, Section};

    use super::*;

    fn valid_paper() -> Paper {
        let mut paper = Paper::default_template();
        paper.duration = Some(60);
        paper
    }

    fn count_at(issues: &[ValidationIssue], path: &str) -> usize {
        issues.iter().filter(|issue| issue.path == path).count()
    }

    #[test]
    fn absent_paper_has_no_issues() {
        assert!(validate(None).is_empty());
    }

    #[test]
    fn default_template_with_duration_is_clean() {
        assert!(validate(Some(&valid_paper())).is_empty());
    }

    #[test]
    fn validation_is_repeatable_and_leaves_input_untouched() {
        let mut paper = valid_paper();
        paper.title = "  ".into();
        paper.sections[0].questions[0].options.clear();
        let before = paper.clone();

        let first = validate(Some(&paper));
        let second = validate(Some(&paper));
        assert_eq!(first, second);
        assert_eq!(paper, before);
    }

    #[test]
    fn empty_paper_reports_exactly_one_sections_error() {
        let mut paper = Paper::new("");
        paper.sections.clear();
        let issues = validate(Some(&paper));
        assert_eq!(count_at(&issues, "paper.sections"), 1);
        assert_eq!(issues[0].path, "paper.title");
        assert_eq!(issues[1].severity, Severity::Warning);
    }

    #[test]
    fn choice_question_with_one_wrong_option_has_two_errors() {
        let mut paper = valid_paper();
        let question = &mut paper.sections[0].questions[0];
        question.question_type = Some(QuestionType::TrueFalse);
        question.options = vec![QuestionOption::new(1, "True", false)];

        let issues = validate(Some(&paper));
        let path = "paper.sections[0].questions[0].options";
        assert_eq!(count_at(&issues, path), 2);
        assert!(issues.iter().all(|issue| issue.severity == Severity::Error));
        assert!(has_errors(&issues));
    }

    #[test]
    fn non_choice_questions_skip_option_rules() {
        let mut paper = valid_paper();
        paper.question_type = None;
        let mut writing = Question::new(2, "Describe your hometown", Some(QuestionType::Writing));
        writing.options.clear();
        paper.sections[0].questions = vec![writing];
        assert!(validate(Some(&paper)).is_empty());
    }

    #[test]
    fn messages_use_list_position_not_seq() {
        let mut paper = valid_paper();
        let mut second = Section::new(40, "");
        second.questions.push(Question::new(7, "", Some(QuestionType::FillInTheBlank)));
        paper.sections.push(second);

        let issues = validate(Some(&paper));
        let messages: Vec<&str> = issues.iter().map(|issue| issue.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Section 2 name is required",
                "Section 2 question 1 content is required",
            ]
        );
        assert_eq!(issues[0].path, "paper.sections[1].name");
    }

    #[test]
    fn empty_section_is_only_a_warning() {
        let mut paper = valid_paper();
        paper.sections.push(Section::new(2, "Listening"));
        let issues = validate(Some(&paper));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(!has_errors(&issues));
    }
}
