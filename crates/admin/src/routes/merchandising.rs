//! Banners, home blocks and the packed layout preview.
//!
//! The preview packs every banner and block, live or not, so merchandisers
//! can see how a scheduled banner will sit before it goes out.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use bazaar_core::layout::{Banner, HomeBlock, Row, pack_rows};
use bazaar_core::{BannerId, HomeBlockId};

use crate::db::MerchandisingRepository;
use crate::db::merchandising::{BannerInput, HomeBlockInput};
use crate::error::Result;
use crate::middleware::RequireStoreManager;
use crate::state::AppState;

/// Packed rows including inactive and scheduled items.
#[derive(Debug, Serialize)]
pub struct LayoutPreview {
    pub banner_rows: Vec<Row<Banner>>,
    pub block_rows: Vec<Row<HomeBlock>>,
}

impl LayoutPreview {
    #[must_use]
    pub fn build(banners: Vec<Banner>, blocks: Vec<HomeBlock>) -> Self {
        Self {
            banner_rows: pack_rows(banners),
            block_rows: pack_rows(blocks),
        }
    }
}

#[instrument(skip(state, _admin))]
pub async fn banners(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<Banner>>> {
    Ok(Json(MerchandisingRepository::new(state.pool()).banners().await?))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, title = %input.title))]
pub async fn create_banner(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<BannerInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let banner = MerchandisingRepository::new(state.pool())
        .create_banner(&input)
        .await?;

    tracing::info!(banner_id = %banner.id, "Banner created");
    Ok((StatusCode::CREATED, Json(banner)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_banner(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<BannerId>,
) -> Result<StatusCode> {
    MerchandisingRepository::new(state.pool())
        .delete_banner(id)
        .await?;
    tracing::info!(banner_id = %id, "Banner deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, _admin))]
pub async fn home_blocks(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<HomeBlock>>> {
    Ok(Json(
        MerchandisingRepository::new(state.pool())
            .home_blocks()
            .await?,
    ))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, kind = %input.kind))]
pub async fn create_home_block(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<HomeBlockInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let block = MerchandisingRepository::new(state.pool())
        .create_home_block(&input)
        .await?;

    tracing::info!(home_block_id = %block.id, "Home block created");
    Ok((StatusCode::CREATED, Json(block)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_home_block(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<HomeBlockId>,
) -> Result<StatusCode> {
    MerchandisingRepository::new(state.pool())
        .delete_home_block(id)
        .await?;
    tracing::info!(home_block_id = %id, "Home block deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, _admin))]
pub async fn preview(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<LayoutPreview>> {
    let repo = MerchandisingRepository::new(state.pool());
    let banners = repo.banners().await?;
    let blocks = repo.home_blocks().await?;
    Ok(Json(LayoutPreview::build(banners, blocks)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use bazaar_core::layout::DisplayWidth;
    use bazaar_core::{Alignment, HomeBlockKind};

    use super::*;

    fn banner(id: i32, width: DisplayWidth, position: i32, active: bool) -> Banner {
        Banner {
            id: BannerId::new(id),
            title: format!("Diwali {id}"),
            image_url: format!("/img/diwali-{id}.jpg"),
            link_url: None,
            position,
            display_width: width,
            alignment: Alignment::Center,
            active,
            starts_at: Some(Utc::now() + Duration::days(3)),
            ends_at: None,
        }
    }

    fn block(id: i32, width: DisplayWidth, position: i32) -> HomeBlock {
        HomeBlock {
            id: HomeBlockId::new(id),
            kind: HomeBlockKind::ProductCarousel,
            title: Some("Trending".to_string()),
            reference_id: None,
            position,
            display_width: width,
            alignment: Alignment::Left,
            active: false,
        }
    }

    #[test]
    fn test_preview_keeps_inactive_and_scheduled_items() {
        let preview = LayoutPreview::build(
            vec![
                banner(1, DisplayWidth::ThreeQuarters, 1, true),
                banner(2, DisplayWidth::Quarter, 2, false),
                banner(3, DisplayWidth::Half, 3, true),
            ],
            vec![block(7, DisplayWidth::Full, 0)],
        );

        assert_eq!(preview.banner_rows.len(), 2);
        assert_eq!(preview.banner_rows[0].items.len(), 2);
        assert_eq!(preview.banner_rows[0].used, 100);
        assert_eq!(preview.banner_rows[1].items[0].id, BannerId::new(3));
        assert_eq!(preview.block_rows.len(), 1);
    }
}
