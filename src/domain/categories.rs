use super::error::DomainError;

pub const MAX_CATEGORY_NAME_CHARS: usize = 60;

/// Trim a category name and enforce its length limits.
pub fn normalize_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_CHARS {
        return Err(DomainError::validation(
            "name",
            format!("must be at most {MAX_CATEGORY_NAME_CHARS} characters"),
        ));
    }
    Ok(name)
}

/// Key under which category names are compared for uniqueness.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(normalize_name("  Home   Repair ").unwrap(), "Home Repair");
    }

    #[test]
    fn rejects_blank_names() {
        assert!(normalize_name(" \t ").is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "x".repeat(MAX_CATEGORY_NAME_CHARS + 1);
        assert!(normalize_name(&name).is_err());
    }

    #[test]
    fn name_key_ignores_case() {
        assert_eq!(name_key("Garden"), name_key("gARDEN "));
    }
}
