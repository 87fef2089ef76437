use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Professional profile, at most one per user. `experience` and `education`
/// are free-form JSON; the store does not enforce their shape.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience: serde_json::Value,
    pub education: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub title: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience: serde_json::Value,
    pub education: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub title: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<serde_json::Value>,
    pub education: Option<serde_json::Value>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.bio.is_none()
            && self.skills.is_none()
            && self.experience.is_none()
            && self.education.is_none()
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create(&self, user_id: i64, input: NewProfile) -> anyhow::Result<Profile>;
    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<Profile>>;
    /// Empty patches are a no-op: the current record comes back unchanged.
    async fn update(&self, user_id: i64, patch: ProfilePatch) -> anyhow::Result<Option<Profile>>;
    async fn delete(&self, user_id: i64) -> anyhow::Result<bool>;
}

pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn create(&self, user_id: i64, input: NewProfile) -> anyhow::Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, title, bio, skills, experience, education)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, bio, skills, experience, education,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(input.title)
        .bind(input.bio)
        .bind(input.skills)
        .bind(input.experience)
        .bind(input.education)
        .fetch_one(&self.db)
        .await?;
        Ok(profile)
    }

    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, user_id, title, bio, skills, experience, education,
                   created_at, updated_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn update(&self, user_id: i64, patch: ProfilePatch) -> anyhow::Result<Option<Profile>> {
        if patch.is_empty() {
            return self.find_by_user(user_id).await;
        }
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                title = COALESCE($2, title),
                bio = COALESCE($3, bio),
                skills = COALESCE($4, skills),
                experience = COALESCE($5, experience),
                education = COALESCE($6, education),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, title, bio, skills, experience, education,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(patch.title)
        .bind(patch.bio)
        .bind(patch.skills)
        .bind(patch.experience)
        .bind(patch.education)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn delete(&self, user_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct MemProfileStore {
    inner: Mutex<MemProfiles>,
}

#[derive(Default)]
struct MemProfiles {
    rows: HashMap<i64, Profile>, // keyed by user_id
    next_id: i64,
}

#[async_trait]
impl ProfileStore for MemProfileStore {
    async fn create(&self, user_id: i64, input: NewProfile) -> anyhow::Result<Profile> {
        let mut inner = self.inner.lock().unwrap();
        if inner.rows.contains_key(&user_id) {
            anyhow::bail!("profile already exists for user {user_id}");
        }
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let profile = Profile {
            id: inner.next_id,
            user_id,
            title: input.title,
            bio: input.bio,
            skills: input.skills,
            experience: input.experience,
            education: input.education,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<Profile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.get(&user_id).cloned())
    }

    async fn update(&self, user_id: i64, patch: ProfilePatch) -> anyhow::Result<Option<Profile>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(profile) = inner.rows.get_mut(&user_id) else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(profile.clone()));
        }
        if let Some(title) = patch.title {
            profile.title = Some(title);
        }
        if let Some(bio) = patch.bio {
            profile.bio = Some(bio);
        }
        if let Some(skills) = patch.skills {
            profile.skills = skills;
        }
        if let Some(experience) = patch.experience {
            profile.experience = experience;
        }
        if let Some(education) = patch.education {
            profile.education = education;
        }
        profile.updated_at = OffsetDateTime::now_utc();
        Ok(Some(profile.clone()))
    }

    async fn delete(&self, user_id: i64) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.rows.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_profile() -> NewProfile {
        NewProfile {
            title: Some("Engineer".into()),
            bio: Some("hello".into()),
            skills: vec!["Rust".into()],
            experience: json!({ "years": 3 }),
            education: json!({}),
        }
    }

    #[tokio::test]
    async fn one_profile_per_user() {
        let store = MemProfileStore::default();
        store.create(1, new_profile()).await.unwrap();
        assert!(store.create(1, new_profile()).await.is_err());
        assert!(store.find_by_user(1).await.unwrap().is_some());
        assert!(store.find_by_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_patch_leaves_record_untouched() {
        let store = MemProfileStore::default();
        let created = store.create(1, new_profile()).await.unwrap();
        let after = store
            .update(1, ProfilePatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.updated_at, created.updated_at);
        assert_eq!(after.bio, created.bio);
    }

    #[tokio::test]
    async fn patch_keeps_unspecified_fields() {
        let store = MemProfileStore::default();
        store.create(1, new_profile()).await.unwrap();
        let patch = ProfilePatch {
            skills: Some(vec!["Rust".into(), "SQL".into()]),
            ..Default::default()
        };
        let after = store.update(1, patch).await.unwrap().unwrap();
        assert_eq!(after.skills, vec!["Rust".to_string(), "SQL".to_string()]);
        assert_eq!(after.title.as_deref(), Some("Engineer"));
        assert_eq!(after.bio.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn update_absent_profile_returns_none() {
        let store = MemProfileStore::default();
        let patch = ProfilePatch {
            title: Some("x".into()),
            ..Default::default()
        };
        assert!(store.update(9, patch).await.unwrap().is_none());
        assert!(!store.delete(9).await.unwrap());
    }
}
