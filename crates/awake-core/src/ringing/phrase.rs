/// The phrase that silences a ringing alarm.
pub const REQUIRED_PHRASE: &str = "yes i am awake";

/// Trim surrounding whitespace and lowercase. Inner whitespace is kept as
/// typed.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

pub fn is_required_phrase(input: &str) -> bool {
    normalize(input) == REQUIRED_PHRASE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_case_and_outer_whitespace_variants() {
        assert!(is_required_phrase("yes i am awake"));
        assert!(is_required_phrase("Yes I Am Awake"));
        assert!(is_required_phrase("yes i am awake "));
        assert!(is_required_phrase("\t YES I AM AWAKE\n"));
    }

    #[test]
    fn rejects_inner_whitespace_changes() {
        assert!(!is_required_phrase("yesiamawake"));
        assert!(!is_required_phrase("yes  i am awake"));
        assert!(!is_required_phrase("yes i am awake!"));
        assert!(!is_required_phrase(""));
    }
}
