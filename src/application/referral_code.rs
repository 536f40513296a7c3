use nanoid::nanoid;

// Lowercase alphanumerics only, so codes survive URL copy-paste and
// case-folding email clients.
const CODE_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const SEEDED_SUFFIX_LEN: usize = 6;
const RANDOM_CODE_LEN: usize = 10;
const EXTEND_LEN: usize = 4;

/// Derive a referral code. With a username seed the code keeps a
/// recognizable prefix plus a short random suffix; without one it is fully
/// random.
pub fn new_code(seed: Option<&str>) -> String {
    match seed.map(sanitize_seed) {
        Some(prefix) if !prefix.is_empty() => {
            format!("{}-{}", prefix, nanoid!(SEEDED_SUFFIX_LEN, &CODE_ALPHABET))
        }
        _ => nanoid!(RANDOM_CODE_LEN, &CODE_ALPHABET),
    }
}

/// Widen a code that lost the uniqueness race with extra random characters.
pub fn extend_code(code: &str) -> String {
    format!("{}{}", code, nanoid!(EXTEND_LEN, &CODE_ALPHABET))
}

fn sanitize_seed(seed: &str) -> String {
    seed.to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_code_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit()
    }

    #[test]
    fn seeded_code_keeps_sanitized_prefix() {
        let code = new_code(Some("Bob Smith!"));
        let (prefix, suffix) = code.split_once('-').expect("seeded code has a dash");
        assert_eq!(prefix, "bobsmith");
        assert_eq!(suffix.len(), SEEDED_SUFFIX_LEN);
        assert!(suffix.chars().all(is_code_char));
    }

    #[test]
    fn unseeded_code_is_fully_random() {
        let code = new_code(None);
        assert_eq!(code.len(), RANDOM_CODE_LEN);
        assert!(code.chars().all(is_code_char));
    }

    #[test]
    fn unusable_seed_falls_back_to_random() {
        // Sanitizing strips everything, so there is no prefix to keep.
        let code = new_code(Some("!!! ***"));
        assert_eq!(code.len(), RANDOM_CODE_LEN);
        assert!(!code.contains('-'));
    }

    #[test]
    fn extend_appends_random_tail() {
        let extended = extend_code("bob-abc123");
        assert!(extended.starts_with("bob-abc123"));
        assert_eq!(extended.len(), "bob-abc123".len() + EXTEND_LEN);
    }

    #[test]
    fn consecutive_codes_differ() {
        assert_ne!(new_code(None), new_code(None));
        assert_ne!(new_code(Some("bob")), new_code(Some("bob")));
    }
}
