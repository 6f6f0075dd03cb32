//! Home page merchandising rows.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use bazaar_core::layout::{Banner, HomeBlock, Row, pack_rows};

use crate::error::Result;
use crate::state::{AppState, HomeContent};

/// Packed rows for the home page.
#[derive(Debug, Serialize)]
pub struct HomeLayout {
    pub banner_rows: Vec<Row<Banner>>,
    pub block_rows: Vec<Row<HomeBlock>>,
}

impl HomeLayout {
    /// Pack the banners that are live at `now` and every active block.
    #[must_use]
    pub fn build(content: &HomeContent, now: DateTime<Utc>) -> Self {
        let banners = content
            .banners
            .iter()
            .filter(|b| b.is_live(now))
            .cloned()
            .collect();
        let blocks = content.blocks.iter().filter(|b| b.active).cloned().collect();
        Self {
            banner_rows: pack_rows(banners),
            block_rows: pack_rows(blocks),
        }
    }
}

#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeLayout>> {
    let content = state.home_content().await?;
    Ok(Json(HomeLayout::build(&content, Utc::now())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use bazaar_core::layout::DisplayWidth;
    use bazaar_core::{Alignment, BannerId};

    use super::*;

    fn banner(id: i32, width: DisplayWidth, position: i32) -> Banner {
        Banner {
            id: BannerId::new(id),
            title: format!("Banner {id}"),
            image_url: format!("/img/banner-{id}.jpg"),
            link_url: None,
            position,
            display_width: width,
            alignment: Alignment::Left,
            active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_expired_banners_left_out() {
        let now = Utc::now();
        let mut expired = banner(3, DisplayWidth::Half, 0);
        expired.ends_at = Some(now - Duration::hours(1));

        let content = HomeContent {
            banners: vec![
                banner(1, DisplayWidth::Half, 2),
                banner(2, DisplayWidth::Half, 1),
                expired,
            ],
            blocks: Vec::new(),
        };
        let layout = HomeLayout::build(&content, now);
        assert_eq!(layout.banner_rows.len(), 1);
        let ids: Vec<_> = layout.banner_rows[0].items.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![BannerId::new(2), BannerId::new(1)]);
        assert!(layout.block_rows.is_empty());
    }
}
