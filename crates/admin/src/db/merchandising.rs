//! Banners and home page blocks.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::layout::{Banner, DisplayWidth, HomeBlock};
use bazaar_core::{Alignment, BannerId, HomeBlockId, HomeBlockKind};

use super::RepositoryError;

const BANNER_COLUMNS: &str = r"
    id, title, image_url, link_url, position, display_width, alignment, active,
    starts_at, ends_at
";

const HOME_BLOCK_COLUMNS: &str =
    "id, kind, title, reference_id, position, display_width, alignment, active";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerchandisingInputError {
    #[error("banner needs a title and an image url")]
    MissingBannerContent,
    #[error("banner must end after it starts")]
    InvalidWindow,
    #[error("a {0} block needs a reference id")]
    MissingReference(HomeBlockKind),
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub display_width: DisplayWidth,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_active")]
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl BannerInput {
    /// # Errors
    ///
    /// Returns a [`MerchandisingInputError`] for blank content or an inverted window.
    pub fn validate(&self) -> Result<(), MerchandisingInputError> {
        if self.title.trim().is_empty() || self.image_url.trim().is_empty() {
            return Err(MerchandisingInputError::MissingBannerContent);
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at)
            && end <= start
        {
            return Err(MerchandisingInputError::InvalidWindow);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HomeBlockInput {
    pub kind: HomeBlockKind,
    pub title: Option<String>,
    pub reference_id: Option<i32>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub display_width: DisplayWidth,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl HomeBlockInput {
    /// Product carousels select by flag; every other kind points at a row.
    ///
    /// # Errors
    ///
    /// Returns [`MerchandisingInputError::MissingReference`].
    pub fn validate(&self) -> Result<(), MerchandisingInputError> {
        if self.kind != HomeBlockKind::ProductCarousel && self.reference_id.is_none() {
            return Err(MerchandisingInputError::MissingReference(self.kind));
        }
        Ok(())
    }
}

/// Repository for banners and home blocks.
pub struct MerchandisingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MerchandisingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every banner, inactive and scheduled ones included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn banners(&self) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, Banner>(&format!(
            "SELECT {BANNER_COLUMNS} FROM shop.banner ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_banner(&self, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let banner = sqlx::query_as::<_, Banner>(&format!(
            r"
            INSERT INTO shop.banner (
                title, image_url, link_url, position, display_width, alignment, active,
                starts_at, ends_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BANNER_COLUMNS}
            "
        ))
        .bind(input.title.trim())
        .bind(input.image_url.trim())
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(i16::from(input.display_width))
        .bind(input.alignment)
        .bind(input.active)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_one(self.pool)
        .await?;
        Ok(banner)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no banner was deleted.
    pub async fn delete_banner(&self, id: BannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn home_blocks(&self) -> Result<Vec<HomeBlock>, RepositoryError> {
        let rows = sqlx::query_as::<_, HomeBlock>(&format!(
            "SELECT {HOME_BLOCK_COLUMNS} FROM shop.home_block ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_home_block(
        &self,
        input: &HomeBlockInput,
    ) -> Result<HomeBlock, RepositoryError> {
        let block = sqlx::query_as::<_, HomeBlock>(&format!(
            r"
            INSERT INTO shop.home_block (
                kind, title, reference_id, position, display_width, alignment, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {HOME_BLOCK_COLUMNS}
            "
        ))
        .bind(input.kind)
        .bind(input.title.as_deref())
        .bind(input.reference_id)
        .bind(input.position)
        .bind(i16::from(input.display_width))
        .bind(input.alignment)
        .bind(input.active)
        .fetch_one(self.pool)
        .await?;
        Ok(block)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no block was deleted.
    pub async fn delete_home_block(&self, id: HomeBlockId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.home_block WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_defaults() {
        let input: BannerInput = serde_json::from_value(serde_json::json!({
            "title": "Monsoon sale",
            "image_url": "/img/monsoon.jpg"
        }))
        .unwrap();
        assert_eq!(input.display_width, DisplayWidth::Full);
        assert_eq!(input.alignment, Alignment::Left);
        assert!(input.active);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_banner_width_must_be_a_quarter_step() {
        let result: Result<BannerInput, _> = serde_json::from_value(serde_json::json!({
            "title": "Monsoon sale",
            "image_url": "/img/monsoon.jpg",
            "display_width": 30
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_home_block_reference_rules() {
        let mut block = HomeBlockInput {
            kind: HomeBlockKind::ProductCarousel,
            title: Some("Trending".to_string()),
            reference_id: None,
            position: 1,
            display_width: DisplayWidth::Full,
            alignment: Alignment::Center,
            active: true,
        };
        assert!(block.validate().is_ok());

        block.kind = HomeBlockKind::ComboStrip;
        assert_eq!(
            block.validate(),
            Err(MerchandisingInputError::MissingReference(HomeBlockKind::ComboStrip))
        );
    }
}
