//! Load-mutate-save cycles on the scoreboard document.
//!
//! Every mutation goes through [`with_board`], which serializes cycles
//! within this process and persists the whole document as one blob.
//! Cross-process writers stay last-write-wins; subscribers are told which
//! slot changed and reload rather than receiving diffs.

use crate::{
    dto::board::{BoardView, PublicBoardView, ScoreRequest, UndoResponse, Verdict},
    error::ServiceError,
    state::{
        SharedState,
        board::{BoardError, Question, ScoreboardDocument},
    },
};

/// Run one serialized load-mutate-save cycle and return the closure's value
/// together with the moderator projection of the saved document.
async fn with_board<T>(
    state: &SharedState,
    op: impl FnOnce(&mut ScoreboardDocument, &[Question]) -> Result<T, ServiceError>,
) -> Result<(T, BoardView), ServiceError> {
    let _gate = state.board_gate().lock().await;
    let bank = state.board().load_questions();
    let mut doc = state.board().load_board();
    let value = op(&mut doc, &bank)?;
    state.board().save_board(&doc)?;
    Ok((value, BoardView::project(&doc, &bank)))
}

/// Moderator projection of the current board.
pub async fn moderator_view(state: &SharedState) -> BoardView {
    let bank = state.board().load_questions();
    let doc = state.board().load_board();
    BoardView::project(&doc, &bank)
}

/// Public projection of the current board.
pub async fn public_view(state: &SharedState) -> PublicBoardView {
    let bank = state.board().load_questions();
    let doc = state.board().load_board();
    PublicBoardView::project(&doc, &bank)
}

/// Apply a verdict for the active question: a correct answer awards the
/// judged team, a wrong answer awards consolation points to every other
/// team. One undo record covers the whole adjustment.
pub async fn score(state: &SharedState, request: ScoreRequest) -> Result<BoardView, ServiceError> {
    let correct_points = state.config().correct_points;
    let consolation_points = state.config().consolation_points;
    let (_, view) = with_board(state, move |doc, _bank| {
        if request.team_index >= doc.teams.len() {
            return Err(BoardError::TeamOutOfRange(request.team_index).into());
        }
        let deltas = (0..doc.teams.len())
            .map(|index| match request.verdict {
                Verdict::Correct if index == request.team_index => correct_points,
                Verdict::Correct => 0,
                Verdict::Wrong if index == request.team_index => 0,
                Verdict::Wrong => consolation_points,
            })
            .collect();
        doc.apply_score_deltas(deltas);
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Append a new auto-named team with zero points.
pub async fn add_team(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, _bank| {
        doc.add_team();
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Remove the last team; refused when only one team remains.
pub async fn remove_last_team(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, _bank| {
        doc.remove_last_team()?;
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Rename the team at `index`.
pub async fn rename_team(
    state: &SharedState,
    index: usize,
    name: &str,
) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, move |doc, _bank| {
        doc.rename_team(index, name)?;
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Zero every score, keeping teams and the undo trail.
pub async fn reset_scores(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, _bank| {
        doc.reset_scores();
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Replace the whole session with the default document. This clears the
/// undo log, so it is itself not undoable.
pub async fn reset_session(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, bank| {
        *doc = ScoreboardDocument::default();
        doc.clamp_question_index(bank.len());
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Undo the most recent recorded action. An empty log is a no-op reported
/// as `undone == false`, never an error.
pub async fn undo(state: &SharedState) -> Result<UndoResponse, ServiceError> {
    let (undone, board) = with_board(state, |doc, _bank| Ok(doc.undo_last())).await?;
    Ok(UndoResponse { undone, board })
}

/// Step the presentation forward: reveal first, then move on.
pub async fn advance(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, bank| {
        doc.advance(bank.len());
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Step the presentation backward, mirroring [`advance`].
pub async fn retreat(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, _bank| {
        doc.retreat();
        Ok(())
    })
    .await?;
    Ok(view)
}

/// Flip the reveal stage of the active question in place.
pub async fn toggle_reveal(state: &SharedState) -> Result<BoardView, ServiceError> {
    let (_, view) = with_board(state, |doc, _bank| {
        doc.toggle_reveal();
        Ok(())
    })
    .await?;
    Ok(view)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::slots::MemorySlotStore,
        state::{AppState, board::RevealStage},
    };

    fn test_state() -> SharedState {
        AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()))
    }

    fn question(text: &str) -> Question {
        Question {
            category: "General".into(),
            text: text.into(),
            answer: "42".into(),
        }
    }

    #[tokio::test]
    async fn correct_verdict_awards_only_the_judged_team() {
        let state = test_state();
        let view = score(
            &state,
            ScoreRequest {
                team_index: 1,
                verdict: Verdict::Correct,
            },
        )
        .await
        .unwrap();

        let scores: Vec<i64> = view.teams.iter().map(|team| team.score).collect();
        assert_eq!(scores, vec![0, 4, 0, 0]);
        assert_eq!(view.undo_depth, 1);
    }

    #[tokio::test]
    async fn wrong_verdict_consoles_everyone_else() {
        let state = test_state();
        let view = score(
            &state,
            ScoreRequest {
                team_index: 0,
                verdict: Verdict::Wrong,
            },
        )
        .await
        .unwrap();

        let scores: Vec<i64> = view.teams.iter().map(|team| team.score).collect();
        assert_eq!(scores, vec![0, 1, 1, 1]);
    }

    #[tokio::test]
    async fn scoring_an_unknown_team_is_not_found() {
        let state = test_state();
        let err = score(
            &state,
            ScoreRequest {
                team_index: 9,
                verdict: Verdict::Correct,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn undo_reverses_the_last_mutation_and_persists() {
        let state = test_state();
        score(
            &state,
            ScoreRequest {
                team_index: 0,
                verdict: Verdict::Correct,
            },
        )
        .await
        .unwrap();

        let response = undo(&state).await.unwrap();
        assert!(response.undone);
        assert!(response.board.teams.iter().all(|team| team.score == 0));

        let reloaded = moderator_view(&state).await;
        assert_eq!(reloaded.undo_depth, 0);
    }

    #[tokio::test]
    async fn undo_on_an_empty_log_reports_nothing_to_do() {
        let state = test_state();
        let response = undo(&state).await.unwrap();
        assert!(!response.undone);
    }

    #[tokio::test]
    async fn removing_the_last_remaining_team_is_refused() {
        let state = test_state();
        for _ in 0..3 {
            remove_last_team(&state).await.unwrap();
        }
        let err = remove_last_team(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn navigation_respects_the_bank_and_hides_answers_publicly() {
        let state = test_state();
        state
            .board()
            .save_questions(&[question("Q1"), question("Q2")])
            .unwrap();

        // announcement slide first: no text on the public view
        let public = public_view(&state).await;
        assert_eq!(public.question_number, 1);
        assert_eq!(public.text, None);
        assert!(!public.revealed);

        let view = advance(&state).await.unwrap();
        assert_eq!(view.reveal_stage, RevealStage::Revealed);
        let public = public_view(&state).await;
        assert_eq!(public.text.as_deref(), Some("Q1"));

        // advancing past the last revealed question is a no-op
        advance(&state).await.unwrap();
        advance(&state).await.unwrap();
        let view = advance(&state).await.unwrap();
        assert_eq!(view.active_question_index, 1);
        assert_eq!(view.reveal_stage, RevealStage::Revealed);
    }

    #[tokio::test]
    async fn reset_session_restores_the_default_roster() {
        let state = test_state();
        add_team(&state).await.unwrap();
        score(
            &state,
            ScoreRequest {
                team_index: 4,
                verdict: Verdict::Correct,
            },
        )
        .await
        .unwrap();

        let view = reset_session(&state).await.unwrap();
        assert_eq!(view.teams.len(), 4);
        assert!(view.teams.iter().all(|team| team.score == 0));
        assert_eq!(view.undo_depth, 0);
    }
}
