//! Username format check.
//!
//! A campus username is a run of letters followed by a run of digits,
//! optionally followed by another run of letters: `thm220`, `abc123d`.

use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]+[0-9]+(?:[A-Za-z]+)?$").expect("username pattern must compile")
});

/// True if `candidate` matches the whole username pattern.
pub fn is_valid_username(candidate: &str) -> bool {
    USERNAME.is_match(candidate)
}
