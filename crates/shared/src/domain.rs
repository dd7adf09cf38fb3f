use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(PaperId);
id_newtype!(SessionId);
id_newtype!(AssignmentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QuestionType {
    SingleChoice,
    TrueFalse,
    DefiniteMultipleChoice,
    IndefiniteMultipleChoice,
    FillInTheBlank,
    Writing,
    Listening,
    Speaking,
}

impl QuestionType {
    /// Choice-style questions are the ones validated against their options.
    pub fn is_choice_style(self) -> bool {
        matches!(
            self,
            Self::SingleChoice
                | Self::TrueFalse
                | Self::DefiniteMultipleChoice
                | Self::IndefiniteMultipleChoice
        )
    }
}

impl From<QuestionType> for u8 {
    fn from(value: QuestionType) -> Self {
        match value {
            QuestionType::SingleChoice => 1,
            QuestionType::TrueFalse => 2,
            QuestionType::DefiniteMultipleChoice => 3,
            QuestionType::IndefiniteMultipleChoice => 4,
            QuestionType::FillInTheBlank => 5,
            QuestionType::Writing => 6,
            QuestionType::Listening => 7,
            QuestionType::Speaking => 8,
        }
    }
}

impl TryFrom<u8> for QuestionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::SingleChoice),
            2 => Ok(Self::TrueFalse),
            3 => Ok(Self::DefiniteMultipleChoice),
            4 => Ok(Self::IndefiniteMultipleChoice),
            5 => Ok(Self::FillInTheBlank),
            6 => Ok(Self::Writing),
            7 => Ok(Self::Listening),
            8 => Ok(Self::Speaking),
            other => Err(format!("unknown question type {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PaperType {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl From<PaperType> for u8 {
    fn from(value: PaperType) -> Self {
        match value {
            PaperType::Reading => 1,
            PaperType::Listening => 2,
            PaperType::Writing => 3,
            PaperType::Speaking => 4,
        }
    }
}

impl TryFrom<u8> for PaperType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Reading),
            2 => Ok(Self::Listening),
            3 => Ok(Self::Writing),
            4 => Ok(Self::Speaking),
            other => Err(format!("unknown paper type {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaperStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PaperStatus {
    /// Transitions a local edit may perform. Publishing goes through the
    /// version-guarded publish call instead.
    pub fn permits_local_transition(self, next: PaperStatus) -> bool {
        self == next || next == PaperStatus::Archived
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaperStatus::Draft => "Draft",
            PaperStatus::Published => "Published",
            PaperStatus::Archived => "Archived",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub seq: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionOption {
    pub fn new(seq: u32, content: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: None,
            seq,
            code: None,
            content: content.into(),
            is_correct,
            explanation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub seq: u32,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn new(seq: u32, content: impl Into<String>, question_type: Option<QuestionType>) -> Self {
        Self {
            id: None,
            seq,
            content: content.into(),
            description: None,
            question_type,
            score: None,
            media_url: None,
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub seq: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(seq: u32, name: impl Into<String>) -> Self {
        Self {
            id: None,
            seq,
            name: name.into(),
            content: None,
            duration: None,
            question_type: None,
            full_score: None,
            pass_score: None,
            note: None,
            questions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PaperId>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_type: Option<PaperType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub status: PaperStatus,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Paper {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            paper_type: None,
            duration: None,
            question_type: None,
            full_score: None,
            pass_score: None,
            note: None,
            status: PaperStatus::Draft,
            sections: Vec::new(),
        }
    }

    /// Starting point for a fresh draft: one section holding one
    /// single-choice question with two options.
    pub fn default_template() -> Self {
        let mut question = Question::new(1, "Question 1", None);
        question.options = vec![
            QuestionOption::new(1, "Option 1", true),
            QuestionOption::new(2, "Option 2", false),
        ];
        let mut section = Section::new(1, "Section 1");
        section.questions.push(question);

        let mut paper = Self::new("Untitled Paper");
        paper.question_type = Some(QuestionType::SingleChoice);
        paper.note = Some(String::new());
        paper.sections.push(section);
        paper
    }

    pub fn is_identified(&self) -> bool {
        self.id.is_some()
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|section| section.questions.len()).sum()
    }

    /// Question type in effect for a question: its own, then its section's,
    /// then the paper default.
    pub fn effective_question_type(
        &self,
        section: &Section,
        question: &Question,
    ) -> Option<QuestionType> {
        question
            .question_type
            .or(section.question_type)
            .or(self.question_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_uses_numeric_wire_codes() {
        let encoded = serde_json::to_string(&QuestionType::IndefiniteMultipleChoice).expect("json");
        assert_eq!(encoded, "4");
        let decoded: QuestionType = serde_json::from_str("8").expect("json");
        assert_eq!(decoded, QuestionType::Speaking);
        assert!(serde_json::from_str::<QuestionType>("9").is_err());
    }

    #[test]
    fn only_the_four_choice_types_are_choice_style() {
        let choice: Vec<_> = (1..=8u8)
            .filter_map(|code| QuestionType::try_from(code).ok())
            .filter(|kind| kind.is_choice_style())
            .collect();
        assert_eq!(
            choice,
            vec![
                QuestionType::SingleChoice,
                QuestionType::TrueFalse,
                QuestionType::DefiniteMultipleChoice,
                QuestionType::IndefiniteMultipleChoice,
            ]
        );
    }

    #[test]
    fn published_never_reverts_to_draft_locally() {
        assert!(!PaperStatus::Published.permits_local_transition(PaperStatus::Draft));
        assert!(!PaperStatus::Draft.permits_local_transition(PaperStatus::Published));
        assert!(PaperStatus::Published.permits_local_transition(PaperStatus::Archived));
        assert!(PaperStatus::Draft.permits_local_transition(PaperStatus::Draft));
    }

    #[test]
    fn unidentified_paper_omits_id_on_the_wire() {
        let value = serde_json::to_value(Paper::default_template()).expect("json");
        assert!(value.get("id").is_none());
        assert_eq!(value["status"], "Draft");
        assert_eq!(value["question_type"], 1);
        assert_eq!(value["sections"][0]["questions"][0]["options"][0]["is_correct"], true);
    }

    #[test]
    fn paper_decodes_with_missing_optional_fields() {
        let paper: Paper =
            serde_json::from_str(r#"{"id":"p-1","title":"Mock","sections":[]}"#).expect("json");
        assert_eq!(paper.id, Some(PaperId::new("p-1")));
        assert_eq!(paper.status, PaperStatus::Draft);
        assert!(paper.duration.is_none());
    }

    #[test]
    fn effective_question_type_falls_back_to_section_then_paper() {
        let mut paper = Paper::new("t");
        paper.question_type = Some(QuestionType::Writing);
        let mut section = Section::new(1, "s");
        let question = Question::new(1, "q", None);
        assert_eq!(
            paper.effective_question_type(&section, &question),
            Some(QuestionType::Writing)
        );
        section.question_type = Some(QuestionType::TrueFalse);
        assert_eq!(
            paper.effective_question_type(&section, &question),
            Some(QuestionType::TrueFalse)
        );
    }
}
