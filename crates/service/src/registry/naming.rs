use crate::errors::ServiceError;

pub const EXTENSION: &str = ".json";

const FORBIDDEN: &[char] = &['/', '\\', '[', ']', ':', '*', '?', '"', '<', '>', '|'];

/// Reject values that cannot be embedded in a single path segment.
pub fn validate_segment(kind: &str, value: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{kind} must not be empty")));
    }
    if value == "." || value == ".." {
        return Err(ServiceError::validation(format!("{kind} must not be a relative path component")));
    }
    if let Some(c) = value.chars().find(|c| c.is_control() || FORBIDDEN.contains(c)) {
        return Err(ServiceError::validation(format!("{kind} contains forbidden character {c:?}")));
    }
    Ok(())
}

/// `[<credential>]-<name>.json`
pub fn file_name(credential: &str, name: &str) -> Result<String, ServiceError> {
    validate_segment("credential", credential)?;
    validate_segment("name", name)?;
    Ok(format!("[{credential}]-{name}{EXTENSION}"))
}

/// Inverse of `file_name`: `(credential, name)`, or `None` for foreign files.
pub fn parse_file_name(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(EXTENSION)?;
    let rest = stem.strip_prefix('[')?;
    let (credential, name) = rest.split_once("]-")?;
    validate_segment("credential", credential).ok()?;
    validate_segment("name", name).ok()?;
    Some((credential.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_credential_and_name() {
        assert_eq!(file_name("secret", "alice").unwrap(), "[secret]-alice.json");
        assert_eq!(file_name("p-1", "db-one").unwrap(), "[p-1]-db-one.json");
    }

    #[test]
    fn parse_inverts_encoding() {
        for (credential, name) in [("secret", "alice"), ("p1", "db-one"), ("a-b", "c-d-e"), ("k", "v.1")] {
            let encoded = file_name(credential, name).unwrap();
            assert_eq!(parse_file_name(&encoded), Some((credential.to_string(), name.to_string())));
        }
    }

    #[test]
    fn parse_rejects_foreign_files() {
        for file in ["notes.txt", "alice.json", "[secret]alice.json", "[secret]-.json", "[]-alice.json", "[a]-b.json.bak", ".DS_Store"] {
            assert_eq!(parse_file_name(file), None, "{file}");
        }
    }

    #[test]
    fn rejects_traversal_and_illegal_characters() {
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b", "x]y", "[x", "a:b", "nul\0", "tab\t"] {
            assert!(matches!(file_name(bad, "db"), Err(ServiceError::Validation(_))), "credential {bad:?}");
            assert!(matches!(file_name("cred", bad), Err(ServiceError::Validation(_))), "name {bad:?}");
        }
    }
}
