//! Edits the engine knows how to apply to a paper.

use shared::domain::{Paper, PaperStatus, PaperType, Question, QuestionOption, QuestionType, Section};
use tracing::warn;

/// Partial update of the paper's own fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperPatch {
    pub title: Option<String>,
    pub duration: Option<i64>,
    pub note: Option<String>,
    pub paper_type: Option<PaperType>,
    pub question_type: Option<QuestionType>,
    pub full_score: Option<f64>,
    pub pass_score: Option<f64>,
    pub status: Option<PaperStatus>,
}

impl PaperPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn duration(duration: i64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaperChange {
    Replace(Paper),
    Patch(PaperPatch),
    Sections(Vec<Section>),
    UpsertQuestion {
        section_seq: u32,
        question: Question,
    },
    UpsertOption {
        section_seq: u32,
        question_seq: u32,
        option: QuestionOption,
    },
}

impl PaperChange {
    /// Applies the change in place. Returns `false` when the change addressed
    /// a section or question that does not exist, in which case the paper is
    /// left untouched.
    pub fn apply_to(self, paper: &mut Paper) -> bool {
        match self {
            PaperChange::Replace(mut next) => {
                if !paper.status.permits_local_transition(next.status) {
                    warn!(
                        from = %paper.status,
                        to = %next.status,
                        "editor: ignoring status change on replace"
                    );
                    next.status = paper.status;
                }
                *paper = next;
                true
            }
            PaperChange::Patch(patch) => {
                apply_patch(paper, patch);
                true
            }
            PaperChange::Sections(sections) => {
                paper.sections = sections;
                true
            }
            PaperChange::UpsertQuestion {
                section_seq,
                question,
            } => {
                let Some(section) = paper.sections.iter_mut().find(|s| s.seq == section_seq) else {
                    return false;
                };
                match section.questions.iter_mut().find(|q| q.seq == question.seq) {
                    Some(existing) => *existing = question,
                    None => section.questions.push(question),
                }
                true
            }
            PaperChange::UpsertOption {
                section_seq,
                question_seq,
                option,
            } => {
                let Some(question) = paper
                    .sections
                    .iter_mut()
                    .find(|s| s.seq == section_seq)
                    .and_then(|s| s.questions.iter_mut().find(|q| q.seq == question_seq))
                else {
                    return false;
                };
                match question.options.iter_mut().find(|o| o.seq == option.seq) {
                    Some(existing) => *existing = option,
                    None => question.options.push(option),
                }
                true
            }
        }
    }
}

fn apply_patch(paper: &mut Paper, patch: PaperPatch) {
    if let Some(title) = patch.title {
        paper.title = title;
    }
    if let Some(duration) = patch.duration {
        paper.duration = Some(duration);
    }
    if let Some(note) = patch.note {
        paper.note = Some(note);
    }
    if let Some(paper_type) = patch.paper_type {
        paper.paper_type = Some(paper_type);
    }
    if let Some(question_type) = patch.question_type {
        paper.question_type = Some(question_type);
    }
    if let Some(full_score) = patch.full_score {
        paper.full_score = Some(full_score);
    }
    if let Some(pass_score) = patch.pass_score {
        paper.pass_score = Some(pass_score);
    }
    if let Some(status) = patch.status {
        if paper.status.permits_local_transition(status) {
            paper.status = status;
        } else {
            warn!(from = %paper.status, to = %status, "editor: ignoring status patch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_question_replaces_matching_seq_and_appends_new() {
        let mut paper = Paper::default_template();
        let replaced = Question::new(1, "Rewritten", Some(QuestionType::Writing));
        assert!(PaperChange::UpsertQuestion {
            section_seq: 1,
            question: replaced,
        }
        .apply_to(&mut paper));
        assert!(PaperChange::UpsertQuestion {
            section_seq: 1,
            question: Question::new(2, "Second", None),
        }
        .apply_to(&mut paper));

        let questions = &paper.sections[0].questions;
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].content, "Rewritten");
        assert_eq!(questions[1].seq, 2);
    }

    #[test]
    fn upsert_option_on_unknown_question_is_rejected() {
        let mut paper = Paper::default_template();
        let before = paper.clone();
        let applied = PaperChange::UpsertOption {
            section_seq: 1,
            question_seq: 9,
            option: QuestionOption::new(3, "C", false),
        }
        .apply_to(&mut paper);
        assert!(!applied);
        assert_eq!(paper, before);
    }

    #[test]
    fn upsert_option_updates_correct_flag() {
        let mut paper = Paper::default_template();
        PaperChange::UpsertOption {
            section_seq: 1,
            question_seq: 1,
            option: QuestionOption::new(2, "Option 2", true),
        }
        .apply_to(&mut paper);
        let options = &paper.sections[0].questions[0].options;
        assert!(options.iter().all(|o| o.is_correct));
    }

    #[test]
    fn replace_cannot_revert_published_paper_to_draft() {
        let mut paper = Paper::default_template();
        paper.status = PaperStatus::Published;
        PaperChange::Replace(Paper::new("fresh")).apply_to(&mut paper);
        assert_eq!(paper.title, "fresh");
        assert_eq!(paper.status, PaperStatus::Published);
    }

    #[test]
    fn patch_can_archive_but_not_publish() {
        let mut paper = Paper::default_template();
        PaperChange::Patch(PaperPatch {
            status: Some(PaperStatus::Published),
            ..PaperPatch::default()
        })
        .apply_to(&mut paper);
        assert_eq!(paper.status, PaperStatus::Draft);

        PaperChange::Patch(PaperPatch {
            status: Some(PaperStatus::Archived),
            ..PaperPatch::default()
        })
        .apply_to(&mut paper);
        assert_eq!(paper.status, PaperStatus::Archived);
    }
}
