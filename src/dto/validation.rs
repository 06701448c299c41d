//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a name still has visible characters once surrounding
/// whitespace is trimmed. `length(min = 1)` is not enough here: a name of
/// `"   "` passes it and would end up on the board (or as the lock winner)
/// as an empty string after trimming.
pub fn validate_non_blank(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("non_blank");
        err.message = Some("name must contain at least one visible character".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_names_pass() {
        assert!(validate_non_blank("Team A").is_ok());
        assert!(validate_non_blank("  padded  ").is_ok());
        assert!(validate_non_blank("x").is_ok());
    }

    #[test]
    fn blank_names_fail() {
        assert!(validate_non_blank("").is_err());
        assert!(validate_non_blank("   ").is_err());
        assert!(validate_non_blank("\t\n").is_err());
    }
}
