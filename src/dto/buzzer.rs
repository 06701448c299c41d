//! DTO definitions for the buzzer lock endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{dto::validation::validate_non_blank, state::buzzer::BuzzerState};

/// Request to claim the open lock.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClaimRequest {
    /// Name of the claiming team; must not be blank.
    pub name: String,
}

impl Validate for ClaimRequest {
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

/// Outcome of a claim attempt. A lost race is a normal negative result, not
/// an error: `won == false` with the state observed at rejection time.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimResponse {
    /// Whether this claim committed.
    pub won: bool,
    /// Lock state after the attempt.
    pub state: BuzzerState,
}

/// Request to start a timed re-open.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CountdownRequest {
    /// Countdown length; falls back to the configured default when omitted.
    #[validate(range(min = 1, max = 600))]
    pub seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_names_must_survive_trimming() {
        assert!(ClaimRequest { name: "Team A".into() }.validate().is_ok());
        assert!(ClaimRequest { name: "   ".into() }.validate().is_err());
        assert!(ClaimRequest { name: String::new() }.validate().is_err());
    }
}
