//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted at registration.
pub const MAX_NAME_CHARS: usize = 40;

/// Validates that a player name has visible characters and a reasonable length.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_empty");
        err.message = Some("Player name must not be empty".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_NAME_CHARS {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_NAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Kim").is_ok());
        assert!(validate_player_name("  Lee Chong Wei  ").is_ok());
        assert!(validate_player_name("김연경").is_ok());
    }

    #[test]
    fn test_validate_player_name_blank() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name("\t\n").is_err());
    }

    #[test]
    fn test_validate_player_name_too_long() {
        assert!(validate_player_name(&"x".repeat(MAX_NAME_CHARS)).is_ok());
        assert!(validate_player_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
    }
}
