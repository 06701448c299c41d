//! Question bank export and whole-bank import.

use crate::{
    dto::questions::ImportReport,
    error::ServiceError,
    state::{SharedState, board::Question},
};

/// Current question bank, in presentation order.
pub async fn export(state: &SharedState) -> Vec<Question> {
    state.board().load_questions()
}

/// Replace the whole question bank. The payload must be a JSON array and
/// every element must parse before anything is written; a rejected import
/// leaves the previous bank untouched.
pub async fn import(
    state: &SharedState,
    payload: serde_json::Value,
) -> Result<ImportReport, ServiceError> {
    let serde_json::Value::Array(items) = payload else {
        return Err(ServiceError::InvalidInput(
            "import payload must be a JSON array of questions".into(),
        ));
    };

    let bank = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Question>(item).map_err(|err| {
                ServiceError::InvalidInput(format!("question {index} is invalid: {err}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let _gate = state.board_gate().lock().await;
    state.board().save_questions(&bank)?;

    // Re-clamp the persisted index against the new bank length.
    let doc = state.board().load_board();
    state.board().save_board(&doc)?;

    Ok(ImportReport {
        imported: bank.len(),
    })
}
