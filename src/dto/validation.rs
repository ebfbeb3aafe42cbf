//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::services::roster_service::MAX_TEAM_NAME_CHARS;

/// Validates that a team name is non-blank, at most 120 characters once trimmed,
/// and free of control characters.
///
/// # Examples
///
/// ```ignore
/// validate_team_name("Nova")      // Ok
/// validate_team_name("   ")       // Err - blank
/// validate_team_name("No\u{7}va") // Err - control character
/// ```
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("team_name_blank");
        err.message = Some("Team name cannot be empty".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_TEAM_NAME_CHARS {
        let mut err = ValidationError::new("team_name_length");
        err.message = Some(
            format!("Team name must be at most {MAX_TEAM_NAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("team_name_format");
        err.message = Some("Team name cannot contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_name_valid() {
        assert!(validate_team_name("Nova").is_ok());
        assert!(validate_team_name("  Les Quizzeurs  ").is_ok());
        assert!(validate_team_name(&"ж".repeat(MAX_TEAM_NAME_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_team_name_invalid_length() {
        assert!(validate_team_name("").is_err());
        assert!(validate_team_name(" \t ").is_err());
        assert!(validate_team_name(&"a".repeat(MAX_TEAM_NAME_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_team_name_invalid_format() {
        assert!(validate_team_name("No\nva").is_err());
        assert!(validate_team_name("Nova\u{0}").is_err());
    }
}
