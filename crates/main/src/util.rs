use once_cell::sync::Lazy;
use regex::Regex;

pub fn is_valid_email(string: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email regex is valid")
    });
    RE.is_match(string)
}

#[cfg(test)]
mod test_email_regex {
    use crate::util::is_valid_email;

    #[test]
    fn test_simple_test_email() {
        assert!(is_valid_email("ada@example.com"))
    }

    #[test]
    fn test_rejects_missing_domain() {
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("ada example.com"));
    }
}
