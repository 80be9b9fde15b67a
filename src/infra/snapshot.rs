//! TOML catalog snapshots.
//!
//! A snapshot lists `users`, `categories`, `tips` and `favorites` as arrays of
//! tables. Timestamps are RFC 3339 strings. Loading checks every cross reference and
//! the tip field rules, so an in-memory catalog built from it upholds the same
//! invariants as one built through the services.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::categories::name_key;
use crate::domain::entities::{CategoryRecord, FavoriteRecord, TipRecord, UserRecord};
use crate::domain::tips::TipDraft;

use super::error::InfraError;
use super::memory::CatalogSeed;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SnapshotFile {
    users: Vec<SnapshotUser>,
    categories: Vec<SnapshotCategory>,
    tips: Vec<SnapshotTip>,
    favorites: Vec<SnapshotFavorite>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotUser {
    id: Uuid,
    display_name: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotCategory {
    id: Uuid,
    name: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotTip {
    id: Uuid,
    title: String,
    #[serde(default)]
    description: String,
    steps: Vec<String>,
    category_id: Uuid,
    #[serde(default)]
    tags: Vec<String>,
    video_url: Option<String>,
    image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotFavorite {
    user_id: Uuid,
    tip_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    added_at: OffsetDateTime,
}

/// Read and validate a snapshot file.
pub async fn load_snapshot(path: &Path) -> Result<CatalogSeed, InfraError> {
    let data = tokio::fs::read_to_string(path).await?;
    parse_snapshot(path, &data)
}

/// Parse and validate snapshot text; `path` is only used in error messages.
pub fn parse_snapshot(path: &Path, data: &str) -> Result<CatalogSeed, InfraError> {
    let file: SnapshotFile =
        toml::from_str(data).map_err(|err| InfraError::snapshot(path, err.to_string()))?;
    let invalid = |message: String| InfraError::snapshot(path, message);

    let mut user_ids = HashSet::new();
    let users = file
        .users
        .into_iter()
        .map(|user| {
            if !user_ids.insert(user.id) {
                return Err(invalid(format!("duplicate user id {}", user.id)));
            }
            Ok(UserRecord {
                id: user.id,
                display_name: user.display_name,
                created_at: user.created_at,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut category_ids = HashSet::new();
    let mut live_names = HashSet::new();
    let categories = file
        .categories
        .into_iter()
        .map(|category| {
            if !category_ids.insert(category.id) {
                return Err(invalid(format!("duplicate category id {}", category.id)));
            }
            if category.deleted_at.is_none() && !live_names.insert(name_key(&category.name)) {
                return Err(invalid(format!(
                    "category name `{}` is used twice",
                    category.name
                )));
            }
            Ok(CategoryRecord {
                id: category.id,
                name: category.name,
                created_at: category.created_at,
                updated_at: category.updated_at,
                deleted_at: category.deleted_at,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut tip_ids = HashSet::new();
    let tips = file
        .tips
        .into_iter()
        .map(|tip| {
            if !tip_ids.insert(tip.id) {
                return Err(invalid(format!("duplicate tip id {}", tip.id)));
            }
            if !category_ids.contains(&tip.category_id) {
                return Err(invalid(format!(
                    "tip {} references unknown category {}",
                    tip.id, tip.category_id
                )));
            }
            let content = TipDraft {
                title: tip.title,
                description: tip.description,
                steps: tip.steps,
                tags: tip.tags,
                video_url: tip.video_url,
                image_url: tip.image_url,
            }
            .validate()
            .map_err(|err| invalid(format!("tip {}: {err}", tip.id)))?;
            Ok(TipRecord {
                id: tip.id,
                title: content.title,
                description: content.description,
                steps: content.steps,
                category_id: tip.category_id,
                tags: content.tags,
                video_url: content.video_url,
                image_url: content.image_url,
                created_at: tip.created_at,
                updated_at: tip.updated_at,
                deleted_at: tip.deleted_at,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut pairs = HashSet::new();
    let favorites = file
        .favorites
        .into_iter()
        .map(|favorite| {
            if !user_ids.contains(&favorite.user_id) || !tip_ids.contains(&favorite.tip_id) {
                return Err(invalid(format!(
                    "favorite ({}, {}) references an unknown user or tip",
                    favorite.user_id, favorite.tip_id
                )));
            }
            if !pairs.insert((favorite.user_id, favorite.tip_id)) {
                return Err(invalid(format!(
                    "favorite ({}, {}) is listed twice",
                    favorite.user_id, favorite.tip_id
                )));
            }
            Ok(FavoriteRecord {
                user_id: favorite.user_id,
                tip_id: favorite.tip_id,
                added_at: favorite.added_at,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CatalogSeed {
        users,
        categories,
        tips,
        favorites,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
[[users]]
id = "6f1c1a9e-0000-4000-8000-000000000001"
display_name = "sam"
created_at = "2026-01-02T10:00:00Z"

[[categories]]
id = "6f1c1a9e-0000-4000-8000-0000000000c1"
name = "Kitchen"
created_at = "2026-01-01T00:00:00Z"

[[tips]]
id = "6f1c1a9e-0000-4000-8000-0000000000a1"
title = "Descale a kettle"
steps = ["Fill with vinegar", "Boil", "Rinse"]
category_id = "6f1c1a9e-0000-4000-8000-0000000000c1"
tags = ["kitchen", "Kitchen", "cleaning"]
created_at = "2026-01-03T08:30:00Z"

[[favorites]]
user_id = "6f1c1a9e-0000-4000-8000-000000000001"
tip_id = "6f1c1a9e-0000-4000-8000-0000000000a1"
added_at = "2026-01-04T09:00:00+02:00"
"#;

    #[test]
    fn parses_sample_catalog() {
        let seed = parse_snapshot(Path::new("sample.toml"), SAMPLE).expect("valid snapshot");
        assert_eq!(seed.users.len(), 1);
        assert_eq!(seed.categories.len(), 1);
        assert_eq!(seed.tips[0].tags, vec!["kitchen", "cleaning"]);
        assert_eq!(seed.favorites.len(), 1);
    }

    #[test]
    fn rejects_tip_with_unknown_category() {
        let broken = SAMPLE.replace(
            "category_id = \"6f1c1a9e-0000-4000-8000-0000000000c1\"",
            "category_id = \"6f1c1a9e-0000-4000-8000-0000000000c2\"",
        );
        let err = parse_snapshot(Path::new("broken.toml"), &broken).unwrap_err();
        assert!(err.to_string().contains("unknown category"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_snapshot(Path::new("x.toml"), "[[users]]\nid = \"nope\"\nrole = 1\n")
            .unwrap_err();
        assert!(matches!(err, InfraError::Snapshot { .. }));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write sample");
        let seed = load_snapshot(file.path()).await.expect("load snapshot");
        assert_eq!(seed.tips.len(), 1);
    }
}
