//! Scoreboard document model: teams and scores, the undo log, and the
//! reveal/navigation state machine driving which question the audience sees.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Number of teams a freshly initialised board starts with.
pub const DEFAULT_TEAM_COUNT: usize = 4;

/// Whether the public surface currently shows the question text or only the
/// ordinal placeholder ("Question N").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealStage {
    /// Announcement slide: only the question number is visible.
    #[default]
    Transition,
    /// The question text is visible to the audience.
    Revealed,
}

impl<'de> Deserialize<'de> for RevealStage {
    /// Lenient decoding: documents written by older schema revisions stored
    /// the stage as `0`/`1`; anything unrecognized coerces to `Transition`.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) if s == "revealed" => RevealStage::Revealed,
            serde_json::Value::Number(n) if n.as_i64() == Some(1) => RevealStage::Revealed,
            _ => RevealStage::Transition,
        })
    }
}

/// A participating team. Identity is the positional index within
/// [`ScoreboardDocument::teams`]; undo records reference teams by that index
/// and stay valid only while the list is not structurally reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Display name of the team.
    pub name: String,
    /// Current score; may go negative.
    #[serde(default)]
    pub score: i64,
}

impl Team {
    fn numbered(n: usize) -> Self {
        Self {
            name: format!("Team {n}"),
            score: 0,
        }
    }
}

/// One entry of the undo log. Each variant stores exactly what its inverse
/// needs; the inverse is applied by [`ScoreboardDocument::undo_last`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UndoRecord {
    /// Per-team score deltas, aligned 1:1 with the team list at action time.
    Score {
        /// Amount added to each team's score by the forward action.
        deltas: Vec<i64>,
    },
    /// A team was appended; inverse removes the last team.
    AddTeam,
    /// A team was removed; inverse re-appends it at the end.
    RemoveTeam {
        /// The removed team, including its score at removal time.
        removed_team: Team,
    },
    /// A team was renamed in place.
    RenameTeam {
        /// Index of the renamed team.
        index: usize,
        /// Name before the rename.
        previous_name: String,
    },
    /// All scores were zeroed; inverse restores every previous score.
    ResetScores {
        /// Scores before the reset, aligned 1:1 with the team list.
        previous_scores: Vec<i64>,
    },
}

/// A question of the separately-persisted bank. The bank is read-only from
/// the board's perspective; only its length matters for index clamping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Category shown on the announcement slide.
    #[serde(default)]
    pub category: String,
    /// The question text itself, hidden until revealed.
    #[serde(default)]
    pub text: String,
    /// Moderator-only expected answer; never exposed publicly.
    #[serde(default)]
    pub answer: String,
}

/// Structural operations that would violate a board invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The team index does not address a current team.
    #[error("team index {0} is out of range")]
    TeamOutOfRange(usize),
    /// Removing the last remaining team is refused; the board always keeps
    /// at least one team.
    #[error("cannot remove the last remaining team")]
    LastTeam,
    /// Blank team names are rejected.
    #[error("team name must not be empty")]
    EmptyName,
}

/// The single persisted session document, shared by value with every surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardDocument {
    /// Which question is current (0-based, clamped against the bank length).
    #[serde(default, deserialize_with = "lenient_index")]
    pub active_question_index: usize,
    /// Whether the current question's text is visible.
    #[serde(default)]
    pub reveal_stage: RevealStage,
    /// Teams in display order.
    pub teams: Vec<Team>,
    /// Most-recent-last log of inverse-able mutations.
    #[serde(default)]
    pub undo_log: Vec<UndoRecord>,
}

/// Accept any JSON number for the index, truncating negatives to zero, so a
/// document written by a foreign schema never poisons the whole load.
fn lenient_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer).unwrap_or(0);
    Ok(raw.max(0) as usize)
}

impl Default for ScoreboardDocument {
    fn default() -> Self {
        Self {
            active_question_index: 0,
            reveal_stage: RevealStage::Transition,
            teams: (1..=DEFAULT_TEAM_COUNT).map(Team::numbered).collect(),
            undo_log: Vec::new(),
        }
    }
}

impl ScoreboardDocument {
    /// Total loader: any absent, unparseable, or structurally invalid payload
    /// yields a fresh default document so corruption never blocks a surface.
    /// The question index is clamped against the current bank length.
    pub fn from_persisted(raw: Option<&[u8]>, question_count: usize) -> Self {
        let mut doc = raw
            .and_then(|bytes| serde_json::from_slice::<ScoreboardDocument>(bytes).ok())
            .filter(|doc| !doc.teams.is_empty())
            .unwrap_or_default();
        doc.clamp_question_index(question_count);
        doc
    }

    /// Clamp the active index into `[0, max(question_count, 1) - 1]`.
    pub fn clamp_question_index(&mut self, question_count: usize) {
        self.active_question_index = self.active_question_index.min(question_count.max(1) - 1);
    }

    /// Apply per-team score deltas and push the matching undo record.
    /// `deltas` must be aligned 1:1 with the current team list.
    pub fn apply_score_deltas(&mut self, deltas: Vec<i64>) {
        for (team, delta) in self.teams.iter_mut().zip(&deltas) {
            team.score += delta;
        }
        self.undo_log.push(UndoRecord::Score { deltas });
    }

    /// Append a new auto-named team with zero points.
    pub fn add_team(&mut self) -> Team {
        let team = Team::numbered(self.teams.len() + 1);
        self.teams.push(team.clone());
        self.undo_log.push(UndoRecord::AddTeam);
        team
    }

    /// Remove the last team, refusing to drop below one team.
    pub fn remove_last_team(&mut self) -> Result<Team, BoardError> {
        if self.teams.len() <= 1 {
            return Err(BoardError::LastTeam);
        }
        let removed = self.teams.pop().ok_or(BoardError::LastTeam)?;
        self.undo_log.push(UndoRecord::RemoveTeam {
            removed_team: removed.clone(),
        });
        Ok(removed)
    }

    /// Rename the team at `index`, trimming surrounding whitespace.
    pub fn rename_team(&mut self, index: usize, name: &str) -> Result<(), BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::EmptyName);
        }
        let team = self
            .teams
            .get_mut(index)
            .ok_or(BoardError::TeamOutOfRange(index))?;
        let previous_name = std::mem::replace(&mut team.name, name.to_string());
        self.undo_log.push(UndoRecord::RenameTeam {
            index,
            previous_name,
        });
        Ok(())
    }

    /// Zero every score, recording the previous tallies for undo.
    pub fn reset_scores(&mut self) {
        let previous_scores = self.teams.iter().map(|team| team.score).collect();
        for team in &mut self.teams {
            team.score = 0;
        }
        self.undo_log
            .push(UndoRecord::ResetScores { previous_scores });
    }

    /// Pop the most recent undo record and apply its inverse in place.
    /// Returns `false` when the log is empty.
    pub fn undo_last(&mut self) -> bool {
        let Some(record) = self.undo_log.pop() else {
            return false;
        };

        match record {
            UndoRecord::Score { deltas } => {
                for (team, delta) in self.teams.iter_mut().zip(&deltas) {
                    team.score -= delta;
                }
            }
            UndoRecord::AddTeam => {
                if self.teams.len() > 1 {
                    self.teams.pop();
                }
            }
            UndoRecord::RemoveTeam { removed_team } => {
                self.teams.push(removed_team);
            }
            UndoRecord::RenameTeam {
                index,
                previous_name,
            } => {
                if let Some(team) = self.teams.get_mut(index) {
                    team.name = previous_name;
                }
            }
            UndoRecord::ResetScores { previous_scores } => {
                for (team, score) in self.teams.iter_mut().zip(previous_scores) {
                    team.score = score;
                }
            }
        }

        true
    }

    /// Two-step forward navigation: reveal the current question first, then
    /// move to the next one behind a fresh announcement slide. No-op once
    /// the last question is revealed.
    pub fn advance(&mut self, question_count: usize) {
        match self.reveal_stage {
            RevealStage::Transition => self.reveal_stage = RevealStage::Revealed,
            RevealStage::Revealed => {
                if self.active_question_index + 1 < question_count.max(1) {
                    self.active_question_index += 1;
                    self.reveal_stage = RevealStage::Transition;
                }
            }
        }
    }

    /// Backward navigation mirroring [`Self::advance`]: hide the text first,
    /// then step back to the previous announcement slide. No-op at
    /// `(0, Transition)`.
    pub fn retreat(&mut self) {
        match self.reveal_stage {
            RevealStage::Revealed => self.reveal_stage = RevealStage::Transition,
            RevealStage::Transition => {
                if self.active_question_index > 0 {
                    self.active_question_index -= 1;
                }
            }
        }
    }

    /// Moderator shortcut flipping the reveal stage without moving the index.
    pub fn toggle_reveal(&mut self) {
        self.reveal_stage = match self.reveal_stage {
            RevealStage::Transition => RevealStage::Revealed,
            RevealStage::Revealed => RevealStage::Transition,
        };
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn board_with_scores(scores: &[i64]) -> ScoreboardDocument {
        ScoreboardDocument {
            teams: scores
                .iter()
                .enumerate()
                .map(|(i, score)| Team {
                    name: format!("Team {}", i + 1),
                    score: *score,
                })
                .collect(),
            ..ScoreboardDocument::default()
        }
    }

    #[test]
    fn default_board_has_four_zeroed_teams() {
        let doc = ScoreboardDocument::default();
        assert_eq!(doc.teams.len(), DEFAULT_TEAM_COUNT);
        assert!(doc.teams.iter().all(|team| team.score == 0));
        assert_eq!(doc.active_question_index, 0);
        assert_eq!(doc.reveal_stage, RevealStage::Transition);
        assert!(doc.undo_log.is_empty());
    }

    #[test]
    fn load_is_total_over_garbage_inputs() {
        let cases: &[&[u8]] = &[
            b"",
            b"not json",
            b"{\"teams\": 7}",
            b"{\"teams\": []}",
            b"{\"teams\": [{\"name\": \"A\"}], \"activeQuestionIndex\": -3}",
            b"[1, 2, 3]",
            b"{\"teams\": [{\"score\": 1}]}",
            &[0xff, 0xfe, 0x00],
        ];
        for raw in cases {
            let doc = ScoreboardDocument::from_persisted(Some(raw), 10);
            assert!(!doc.teams.is_empty(), "input {raw:?} produced empty teams");
            assert!(doc.active_question_index < 10);
        }

        let doc = ScoreboardDocument::from_persisted(None, 0);
        assert_eq!(doc.active_question_index, 0);
    }

    #[test]
    fn load_clamps_index_and_coerces_stage() {
        let raw = br#"{
            "activeQuestionIndex": 42,
            "revealStage": "bogus",
            "teams": [{"name": "Solo", "score": 2}]
        }"#;
        let doc = ScoreboardDocument::from_persisted(Some(raw.as_slice()), 5);
        assert_eq!(doc.active_question_index, 4);
        assert_eq!(doc.reveal_stage, RevealStage::Transition);
        assert_eq!(doc.teams[0].score, 2);
    }

    #[test]
    fn load_accepts_legacy_numeric_stage() {
        let raw = br#"{"revealStage": 1, "teams": [{"name": "A"}]}"#;
        let doc = ScoreboardDocument::from_persisted(Some(raw.as_slice()), 3);
        assert_eq!(doc.reveal_stage, RevealStage::Revealed);
    }

    #[test]
    fn score_deltas_round_trip_through_undo() {
        let mut doc = board_with_scores(&[0, 0, 0, 0]);
        doc.apply_score_deltas(vec![4, 0, 0, 0]);
        assert_eq!(
            doc.teams.iter().map(|t| t.score).collect::<Vec<_>>(),
            vec![4, 0, 0, 0]
        );
        assert!(doc.undo_last());
        assert_eq!(
            doc.teams.iter().map(|t| t.score).collect::<Vec<_>>(),
            vec![0, 0, 0, 0]
        );
        assert!(!doc.undo_last());
    }

    #[test]
    fn team_operations_are_exact_inverses() {
        let mut doc = board_with_scores(&[3, 1]);
        let before = doc.clone();

        doc.add_team();
        assert_eq!(doc.teams.len(), 3);
        assert!(doc.undo_last());
        assert_eq!(doc.teams, before.teams);

        doc.remove_last_team().unwrap();
        assert_eq!(doc.teams.len(), 1);
        assert!(doc.undo_last());
        assert_eq!(doc.teams, before.teams);

        doc.rename_team(0, "  Renamed  ").unwrap();
        assert_eq!(doc.teams[0].name, "Renamed");
        assert!(doc.undo_last());
        assert_eq!(doc.teams, before.teams);

        doc.reset_scores();
        assert!(doc.teams.iter().all(|t| t.score == 0));
        assert!(doc.undo_last());
        assert_eq!(doc.teams, before.teams);
    }

    #[test]
    fn structural_guards_hold() {
        let mut doc = board_with_scores(&[0]);
        assert_eq!(doc.remove_last_team(), Err(BoardError::LastTeam));
        assert_eq!(doc.rename_team(0, "   "), Err(BoardError::EmptyName));
        assert_eq!(doc.rename_team(5, "x"), Err(BoardError::TeamOutOfRange(5)));
        assert!(doc.undo_log.is_empty());
    }

    #[test]
    fn random_action_sequences_undo_to_the_start() {
        let mut rng = rand::rng();

        for _ in 0..50 {
            let mut doc = ScoreboardDocument::default();
            let initial = doc.clone();
            let steps = rng.random_range(1..30);

            for _ in 0..steps {
                match rng.random_range(0..5) {
                    0 => {
                        let deltas = (0..doc.teams.len())
                            .map(|_| rng.random_range(-3..=5))
                            .collect();
                        doc.apply_score_deltas(deltas);
                    }
                    1 => {
                        doc.add_team();
                    }
                    2 => {
                        // May legitimately refuse on a single team.
                        let _ = doc.remove_last_team();
                    }
                    3 => {
                        let index = rng.random_range(0..doc.teams.len());
                        doc.rename_team(index, "Shuffled").unwrap();
                    }
                    _ => doc.reset_scores(),
                }
            }

            while doc.undo_last() {}
            assert_eq!(doc.teams, initial.teams);
        }
    }

    #[test]
    fn reveal_cycle_returns_to_origin() {
        let question_count = 5;
        let mut doc = ScoreboardDocument::default();

        for _ in 0..(2 * question_count) {
            doc.advance(question_count);
        }
        assert_eq!(doc.active_question_index, question_count - 1);
        assert_eq!(doc.reveal_stage, RevealStage::Revealed);

        // Saturates at the last revealed question.
        doc.advance(question_count);
        assert_eq!(doc.active_question_index, question_count - 1);
        assert_eq!(doc.reveal_stage, RevealStage::Revealed);

        for _ in 0..(2 * question_count) {
            doc.retreat();
        }
        assert_eq!(doc.active_question_index, 0);
        assert_eq!(doc.reveal_stage, RevealStage::Transition);

        doc.retreat();
        assert_eq!(doc.active_question_index, 0);
        assert_eq!(doc.reveal_stage, RevealStage::Transition);
    }

    #[test]
    fn toggle_reveal_flips_without_moving() {
        let mut doc = ScoreboardDocument::default();
        doc.toggle_reveal();
        assert_eq!(doc.reveal_stage, RevealStage::Revealed);
        assert_eq!(doc.active_question_index, 0);
        doc.toggle_reveal();
        assert_eq!(doc.reveal_stage, RevealStage::Transition);
    }

    #[test]
    fn undo_records_survive_serialization() {
        let mut doc = ScoreboardDocument::default();
        doc.apply_score_deltas(vec![4, 0, 0, 0]);
        doc.add_team();
        doc.remove_last_team().unwrap();
        doc.rename_team(0, "Quizzards").unwrap();
        doc.reset_scores();

        let bytes = serde_json::to_vec(&doc).unwrap();
        let reloaded = ScoreboardDocument::from_persisted(Some(&bytes), 10);
        assert_eq!(reloaded, doc);

        let json = String::from_utf8(bytes).unwrap();
        assert!(json.contains("\"type\":\"addTeam\""));
        assert!(json.contains("\"removedTeam\""));
        assert!(json.contains("\"previousName\""));
    }
}
