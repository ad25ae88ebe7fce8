//! Container and blob name validation.
//!
//! Container names follow the strictest of the object-store naming rules we
//! target, so a name accepted here is valid for every backend. Blob names are
//! normalized and checked so they can never escape their container.

use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::sync::LazyLock;

// 3-63 characters; lowercase letters, digits and dashes; alphanumeric at both ends.
static CONTAINER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9\-]{1,61}[a-z0-9])?$").unwrap());

/// Validates a container name against provider naming rules.
///
/// # Examples
///
/// ```
/// use findit_storage::validate_container_name;
/// assert!(validate_container_name("mio-container").is_ok());
/// assert!(validate_container_name("Uppercase").is_err());
/// assert!(validate_container_name("-leading-dash").is_err());
/// ```
pub fn validate_container(name: &str) -> Result<&str> {
    // The regex also accepts a single character; the length rule does not.
    if name.len() < 3 || !CONTAINER_NAME.is_match(name) {
        exn::bail!(ErrorKind::InvalidContainer(name.to_string()));
    }
    Ok(name)
}

/// Validates a blob name for security and correctness.
/// Ensures that names don't escape the container (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes. Null bytes are
/// >           explicitly rejected.
///
/// # Returns
/// Returns the normalized name if valid, or [`InvalidBlob`](crate::error::ErrorKind::InvalidBlob)
/// if invalid.
///
/// # Examples
///
/// ```
/// use findit_storage::validate_blob_name;
/// // Valid names
/// assert!(validate_blob_name("logs/2024/app.log").is_ok());
/// assert!(validate_blob_name("a/../data.json").is_ok()); // (never leaves the container)
/// // Invalid names
/// assert!(validate_blob_name("../secrets.txt").is_err());
/// assert!(validate_blob_name("a\0b").is_err());
/// // Names get resolved
/// assert_eq!(validate_blob_name("wrong/../right//./file.csv/").unwrap(), "right/file.csv");
/// ```
pub fn validate_blob(name: &str) -> Result<String> {
    let mut components = Vec::new();
    for component in name.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidBlob(name.to_string()));
                }
            },
            // Null bytes cause truncation in C-based syscalls.
            s if s.contains('\0') => exn::bail!(ErrorKind::InvalidBlob(name.to_string())),
            s => components.push(s),
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidBlob(name.to_string())),
        false => Ok(components.join("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("abc")]
    #[case("mio-container")]
    #[case("logs-2024")]
    #[case("0ab")]
    #[case("a1-b2-c3")]
    fn test_valid_container_names(#[case] name: &str) {
        assert_eq!(validate_container(name).unwrap(), name);
    }

    #[rstest]
    #[case("")]
    #[case("a")]
    #[case("ab")]
    #[case("ABC")]
    #[case("-abc")]
    #[case("abc-")]
    #[case("under_score")]
    #[case("dot.ted")]
    #[case("with space")]
    fn test_invalid_container_names(#[case] name: &str) {
        let err = validate_container(name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidContainer(_)));
    }

    #[test]
    fn test_container_name_length_limit() {
        let longest = "a".repeat(63);
        assert!(validate_container(&longest).is_ok());
        let too_long = "a".repeat(64);
        assert!(validate_container(&too_long).is_err());
    }

    #[test]
    fn test_valid_blob_names() {
        assert_eq!(validate_blob("logs/app.log").unwrap(), "logs/app.log");
        assert_eq!(validate_blob("a/b/c/file.csv").unwrap(), "a/b/c/file.csv");
        assert_eq!(validate_blob("simple.json").unwrap(), "simple.json");
        // Spaces and unicode are fine; they are percent-encoded elsewhere.
        assert_eq!(validate_blob("reports/été 2024.txt").unwrap(), "reports/été 2024.txt");
    }

    #[test]
    fn test_blob_name_normalization() {
        assert_eq!(validate_blob("a//b//c").unwrap(), "a/b/c");
        assert_eq!(validate_blob("a/./b/./c").unwrap(), "a/b/c");
        assert_eq!(validate_blob("/leading/slash.txt").unwrap(), "leading/slash.txt");
        assert_eq!(validate_blob("a/b/..").unwrap(), "a");
        assert_eq!(validate_blob("trailing/").unwrap(), "trailing");
    }

    #[test]
    fn test_blob_traversal_attempts() {
        assert!(validate_blob("../etc/passwd").is_err());
        assert!(validate_blob("a/../../b").is_err());
        assert!(validate_blob("..").is_err());
    }

    #[test]
    fn test_blob_empty_and_null() {
        assert!(validate_blob("").is_err());
        assert!(validate_blob(".").is_err());
        assert!(validate_blob("//").is_err());
        assert!(validate_blob("a\0b").is_err());
    }
}
