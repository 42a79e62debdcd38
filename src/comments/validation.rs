use crate::sync::error::{validation, SyncResult};

/// Trims `content` and checks it holds between 1 and `max_chars` characters.
pub fn validate_comment(content: &str, max_chars: usize) -> SyncResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(validation("Comentário não pode estar vazio"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(validation(format!(
            "Comentário deve ter no máximo {max_chars} caracteres"
        )));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncErrorCode;

    #[test]
    fn empty_and_blank_are_rejected() {
        for input in ["", "   ", "\n\t"] {
            let err = validate_comment(input, 1000).unwrap_err();
            assert_eq!(err.code, SyncErrorCode::Validation);
            assert_eq!(err.message(), "Comentário não pode estar vazio");
        }
    }

    #[test]
    fn length_boundary_counts_characters() {
        let exact = "ç".repeat(1000);
        assert_eq!(validate_comment(&exact, 1000).unwrap(), exact);

        let over = "a".repeat(1001);
        let err = validate_comment(&over, 1000).unwrap_err();
        assert_eq!(err.message(), "Comentário deve ter no máximo 1000 caracteres");
    }

    #[test]
    fn surrounding_whitespace_does_not_count() {
        let padded = format!("  {}  ", "a".repeat(1000));
        assert_eq!(validate_comment(&padded, 1000).unwrap().len(), 1000);
    }
}
