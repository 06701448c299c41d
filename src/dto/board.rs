//! DTO definitions for the scoreboard views and moderator commands.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_non_blank,
    state::board::{Question, RevealStage, ScoreboardDocument, Team},
};

/// Projection of one team for either surface.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamView {
    /// Display name.
    pub name: String,
    /// Current score.
    pub score: i64,
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            name: team.name.clone(),
            score: team.score,
        }
    }
}

/// Full moderator projection of the board, including the active question
/// with its answer and the depth of the undo log.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    /// 0-based index of the active question.
    pub active_question_index: usize,
    /// Current reveal stage (`transition` or `revealed`).
    #[schema(value_type = String)]
    pub reveal_stage: RevealStage,
    /// Number of questions in the bank.
    pub question_count: usize,
    /// The active question, absent when the bank is empty.
    pub question: Option<Question>,
    /// Teams in display order.
    pub teams: Vec<TeamView>,
    /// How many actions can currently be undone.
    pub undo_depth: usize,
}

impl BoardView {
    /// Build the moderator view from the document and its question bank.
    pub fn project(doc: &ScoreboardDocument, bank: &[Question]) -> Self {
        Self {
            active_question_index: doc.active_question_index,
            reveal_stage: doc.reveal_stage,
            question_count: bank.len(),
            question: bank.get(doc.active_question_index).cloned(),
            teams: doc.teams.iter().map(TeamView::from).collect(),
            undo_depth: doc.undo_log.len(),
        }
    }
}

/// Public projection: the question text appears only once revealed, and the
/// answer never appears at all.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicBoardView {
    /// 1-based ordinal shown on the announcement slide.
    pub question_number: usize,
    /// Number of questions in the bank (at least 1 for display purposes).
    pub question_count: usize,
    /// Category of the active question.
    pub category: String,
    /// Question text, present only while revealed.
    pub text: Option<String>,
    /// Whether the text is currently revealed.
    pub revealed: bool,
    /// Teams in display order.
    pub teams: Vec<TeamView>,
}

impl PublicBoardView {
    /// Build the public view from the document and its question bank.
    pub fn project(doc: &ScoreboardDocument, bank: &[Question]) -> Self {
        let question = bank.get(doc.active_question_index);
        let revealed = doc.reveal_stage == RevealStage::Revealed;
        Self {
            question_number: doc.active_question_index + 1,
            question_count: bank.len().max(1),
            category: question.map(|q| q.category.clone()).unwrap_or_default(),
            text: question.filter(|_| revealed).map(|q| q.text.clone()),
            revealed,
            teams: doc.teams.iter().map(TeamView::from).collect(),
        }
    }
}

/// Moderator ruling on the active question.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The team answered correctly; it receives the award points.
    Correct,
    /// The team answered wrongly; every other team receives consolation
    /// points.
    Wrong,
}

/// Request to score the active question for one team.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    /// Positional index of the judged team.
    pub team_index: usize,
    /// Ruling to apply.
    pub verdict: Verdict,
}

/// Request to rename a team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameTeamRequest {
    /// New display name; must not be blank.
    pub name: String,
}

impl Validate for RenameTeamRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_non_blank(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Result of an undo request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UndoResponse {
    /// Whether a record was undone (`false` on an empty log).
    pub undone: bool,
    /// Board state after the operation.
    pub board: BoardView,
}
