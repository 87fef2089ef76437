use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Business card, at most one per user. `qr_code` is derived from the other
/// fields plus the record id; callers never write it through the general
/// update path.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BusinessCard {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    pub qr_code: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.title.is_none()
            && self.company.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.website.is_none()
            && self.address.is_none()
    }
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn create(&self, user_id: i64, input: NewCard) -> anyhow::Result<BusinessCard>;
    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<BusinessCard>>;
    /// Empty patches are a no-op: the current record comes back unchanged.
    async fn update(&self, user_id: i64, patch: CardPatch)
        -> anyhow::Result<Option<BusinessCard>>;
    /// Narrow single-field update used by the QR collaborator after the
    /// card's identifying fields change.
    async fn update_qr_code(
        &self,
        user_id: i64,
        artifact: &str,
    ) -> anyhow::Result<Option<BusinessCard>>;
    async fn delete(&self, user_id: i64) -> anyhow::Result<bool>;
}

pub struct PgCardStore {
    db: PgPool,
}

impl PgCardStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const CARD_COLUMNS: &str = "id, user_id, name, title, company, email, phone, website, address, \
                            qr_code, created_at, updated_at";

#[async_trait]
impl CardStore for PgCardStore {
    async fn create(&self, user_id: i64, input: NewCard) -> anyhow::Result<BusinessCard> {
        let card = sqlx::query_as::<_, BusinessCard>(&format!(
            r#"
            INSERT INTO business_cards
                (user_id, name, title, company, email, phone, website, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(input.name)
        .bind(input.title)
        .bind(input.company)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.website)
        .bind(input.address)
        .fetch_one(&self.db)
        .await?;
        Ok(card)
    }

    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<BusinessCard>> {
        let card = sqlx::query_as::<_, BusinessCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM business_cards WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(card)
    }

    async fn update(
        &self,
        user_id: i64,
        patch: CardPatch,
    ) -> anyhow::Result<Option<BusinessCard>> {
        if patch.is_empty() {
            return self.find_by_user(user_id).await;
        }
        let card = sqlx::query_as::<_, BusinessCard>(&format!(
            r#"
            UPDATE business_cards SET
                name = COALESCE($2, name),
                title = COALESCE($3, title),
                company = COALESCE($4, company),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                website = COALESCE($7, website),
                address = COALESCE($8, address),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(patch.name)
        .bind(patch.title)
        .bind(patch.company)
        .bind(patch.email)
        .bind(patch.phone)
        .bind(patch.website)
        .bind(patch.address)
        .fetch_optional(&self.db)
        .await?;
        Ok(card)
    }

    async fn update_qr_code(
        &self,
        user_id: i64,
        artifact: &str,
    ) -> anyhow::Result<Option<BusinessCard>> {
        let card = sqlx::query_as::<_, BusinessCard>(&format!(
            r#"
            UPDATE business_cards
            SET qr_code = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(artifact)
        .fetch_optional(&self.db)
        .await?;
        Ok(card)
    }

    async fn delete(&self, user_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM business_cards WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct MemCardStore {
    inner: Mutex<MemCards>,
}

#[derive(Default)]
struct MemCards {
    rows: HashMap<i64, BusinessCard>, // keyed by user_id
    next_id: i64,
}

#[async_trait]
impl CardStore for MemCardStore {
    async fn create(&self, user_id: i64, input: NewCard) -> anyhow::Result<BusinessCard> {
        let mut inner = self.inner.lock().unwrap();
        if inner.rows.contains_key(&user_id) {
            anyhow::bail!("business card already exists for user {user_id}");
        }
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let card = BusinessCard {
            id: inner.next_id,
            user_id,
            name: input.name,
            title: input.title,
            company: input.company,
            email: input.email,
            phone: input.phone,
            website: input.website,
            address: input.address,
            qr_code: None,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(user_id, card.clone());
        Ok(card)
    }

    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<BusinessCard>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.get(&user_id).cloned())
    }

    async fn update(
        &self,
        user_id: i64,
        patch: CardPatch,
    ) -> anyhow::Result<Option<BusinessCard>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(card) = inner.rows.get_mut(&user_id) else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(card.clone()));
        }
        if let Some(name) = patch.name {
            card.name = name;
        }
        if let Some(title) = patch.title {
            card.title = title;
        }
        if let Some(company) = patch.company {
            card.company = company;
        }
        if let Some(email) = patch.email {
            card.email = email;
        }
        if let Some(phone) = patch.phone {
            card.phone = phone;
        }
        if let Some(website) = patch.website {
            card.website = website;
        }
        if let Some(address) = patch.address {
            card.address = address;
        }
        card.updated_at = OffsetDateTime::now_utc();
        Ok(Some(card.clone()))
    }

    async fn update_qr_code(
        &self,
        user_id: i64,
        artifact: &str,
    ) -> anyhow::Result<Option<BusinessCard>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(card) = inner.rows.get_mut(&user_id) else {
            return Ok(None);
        };
        card.qr_code = Some(artifact.to_string());
        card.updated_at = OffsetDateTime::now_utc();
        Ok(Some(card.clone()))
    }

    async fn delete(&self, user_id: i64) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.rows.remove(&user_id).is_some())
    }
}
