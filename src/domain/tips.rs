//! Tip field rules: trimming, length limits and tag normalization.
//!
//! Rules here are pure; existence checks (category, tip) belong to the services.

use std::collections::HashSet;

use super::error::DomainError;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 30;
pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_STEPS: usize = 30;
pub const MAX_STEP_CHARS: usize = 500;
pub const MAX_URL_CHARS: usize = 2048;

/// Unvalidated tip content as supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct TipDraft {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

/// Tip content that satisfied every field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipContent {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

impl TipDraft {
    pub fn validate(self) -> Result<TipContent, DomainError> {
        let title = self.title.trim().to_string();
        ensure_len("title", &title, 1, MAX_TITLE_CHARS)?;

        let description = self.description.trim().to_string();
        ensure_len("description", &description, 0, MAX_DESCRIPTION_CHARS)?;

        if self.steps.is_empty() {
            return Err(DomainError::validation("steps", "at least one step is required"));
        }
        if self.steps.len() > MAX_STEPS {
            return Err(DomainError::validation(
                "steps",
                format!("at most {MAX_STEPS} steps are allowed"),
            ));
        }
        let steps = self
            .steps
            .iter()
            .map(|step| {
                let step = step.trim().to_string();
                ensure_len("steps", &step, 1, MAX_STEP_CHARS).map(|_| step)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tags = normalize_tags(&self.tags)?;
        let video_url = optional_url("video_url", self.video_url)?;
        let image_url = optional_url("image_url", self.image_url)?;

        Ok(TipContent {
            title,
            description,
            steps,
            tags,
            video_url,
            image_url,
        })
    }
}

/// Trim tags, drop blanks and case-insensitive duplicates (first spelling wins).
pub fn normalize_tags(raw: &[String]) -> Result<Vec<String>, DomainError> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for tag in raw {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_TAG_CHARS {
            return Err(DomainError::validation(
                "tags",
                format!("tag `{trimmed}` exceeds {MAX_TAG_CHARS} characters"),
            ));
        }
        if seen.insert(trimmed.to_lowercase()) {
            tags.push(trimmed.to_string());
        }
    }

    if tags.len() > MAX_TAGS {
        return Err(DomainError::validation(
            "tags",
            format!("at most {MAX_TAGS} tags are allowed"),
        ));
    }
    Ok(tags)
}

fn optional_url(field: &'static str, value: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    ensure_len(field, trimmed, 1, MAX_URL_CHARS)?;
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(DomainError::validation(field, "must be an http(s) URL"));
    }
    Ok(Some(trimmed.to_string()))
}

fn ensure_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    let len = value.chars().count();
    if len < min {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if len > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TipDraft {
        TipDraft {
            title: "  Sharpen a knife ".into(),
            description: "Use a whetstone.".into(),
            steps: vec!["Soak the stone".into(), " Hold at 20 degrees ".into()],
            tags: vec!["Kitchen".into(), "kitchen".into(), " tools ".into(), "".into()],
            video_url: Some("   ".into()),
            image_url: Some("https://img.example/knife.png".into()),
        }
    }

    #[test]
    fn validate_trims_and_dedupes() {
        let content = draft().validate().expect("valid draft");
        assert_eq!(content.title, "Sharpen a knife");
        assert_eq!(content.steps[1], "Hold at 20 degrees");
        assert_eq!(content.tags, vec!["Kitchen".to_string(), "tools".to_string()]);
        assert_eq!(content.video_url, None);
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://img.example/knife.png")
        );
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut draft = draft();
        draft.title = "   ".into();
        let err = draft.validate().unwrap_err();
        assert_eq!(err.field(), "title");
    }

    #[test]
    fn steps_are_required() {
        let mut draft = draft();
        draft.steps.clear();
        assert_eq!(draft.validate().unwrap_err().field(), "steps");
    }

    #[test]
    fn blank_step_is_rejected() {
        let mut draft = draft();
        draft.steps.push("  ".into());
        assert_eq!(draft.validate().unwrap_err().field(), "steps");
    }

    #[test]
    fn more_than_ten_distinct_tags_is_rejected() {
        let tags: Vec<String> = (0..11).map(|i| format!("tag-{i}")).collect();
        let err = normalize_tags(&tags).unwrap_err();
        assert_eq!(err.field(), "tags");
    }

    #[test]
    fn duplicate_tags_do_not_count_toward_the_limit() {
        let mut tags: Vec<String> = (0..10).map(|i| format!("tag-{i}")).collect();
        tags.push("TAG-0".into());
        let normalized = normalize_tags(&tags).expect("duplicates collapse");
        assert_eq!(normalized.len(), MAX_TAGS);
    }

    #[test]
    fn non_http_media_url_is_rejected() {
        let mut draft = draft();
        draft.video_url = Some("ftp://example/video".into());
        assert_eq!(draft.validate().unwrap_err().field(), "video_url");
    }
}
