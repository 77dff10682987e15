use uuid::Uuid;

/// Length of the hyphenated UUIDv4 text form.
pub const TOKEN_LENGTH: usize = 36;

/// Fresh unguessable download token. UUIDv4 draws from the OS RNG.
pub fn generate_token() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

pub fn looks_like_token(s: &str) -> bool {
    s.len() == TOKEN_LENGTH && Uuid::parse_str(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_36_chars_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(looks_like_token(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(!looks_like_token("abc"));
        assert!(!looks_like_token("zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz"));
    }
}
