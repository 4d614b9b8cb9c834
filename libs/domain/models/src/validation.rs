//! Boundary validation (§6). These are the rules the HTTP surface and the
//! worker hello path both need, so they live in the shared models crate
//! rather than being duplicated per caller.

use uuid::Uuid;

pub const MAX_USER_ID_LEN: usize = 64;
pub const MAX_CODE_BYTES: usize = 1024 * 1024;
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_JOBS_LIST_LIMIT: usize = 100;

/// `^[A-Za-z0-9_-]{1,64}$`
pub fn is_valid_user_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_USER_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Canonical UUID-v4 form.
pub fn parse_uuid(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value).ok()
}

/// Strips NUL and non-printable characters except `\n`, `\r`, `\t`, then
/// truncates to `max_bytes` (on a char boundary).
pub fn sanitize_string(value: &str, max_bytes: usize) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    if cleaned.len() <= max_bytes {
        return cleaned;
    }

    let mut truncated = cleaned;
    let mut end = max_bytes;
    while !truncated.is_char_boundary(end) {
        end -= 1;
    }
    truncated.truncate(end);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_allowed_charset() {
        assert!(is_valid_user_id("alice"));
        assert!(is_valid_user_id("alice_bob-99"));
    }

    #[test]
    fn user_id_rejects_bad_charset_or_length() {
        assert!(!is_valid_user_id(""));
        assert!(!is_valid_user_id("alice!"));
        assert!(!is_valid_user_id("alice bob"));
        assert!(!is_valid_user_id(&"a".repeat(65)));
    }

    #[test]
    fn sanitize_strips_non_printables_and_truncates() {
        let dirty = "hi\u{0}\u{1}there\n";
        let clean = sanitize_string(dirty, 100);
        assert_eq!(clean, "hithere\n");

        let long = "x".repeat(10);
        assert_eq!(sanitize_string(&long, 4), "xxxx");
    }

    #[test]
    fn parses_valid_uuid_only() {
        assert!(parse_uuid("not-a-uuid").is_none());
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string()), Some(id));
    }
}
