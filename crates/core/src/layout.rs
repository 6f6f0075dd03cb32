//! Banner and home block row-packing.
//!
//! Tiles are laid out in rows 100% wide. Each tile declares a width of 25, 50,
//! 75 or 100 percent and an ordering position; [`pack_rows`] walks the tiles in
//! position order and starts a new row whenever the next tile would overflow
//! the current one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Alignment, BannerId, HomeBlockId, HomeBlockKind, within_window};

/// Full row width in percent.
pub const ROW_WIDTH: u8 = 100;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("display width must be 25, 50, 75 or 100, got {0}")]
    InvalidWidth(i16),
}

/// Width of a tile as a share of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum DisplayWidth {
    Quarter,
    Half,
    ThreeQuarters,
    #[default]
    Full,
}

impl DisplayWidth {
    /// Width in percent.
    #[must_use]
    pub const fn percent(self) -> u8 {
        match self {
            Self::Quarter => 25,
            Self::Half => 50,
            Self::ThreeQuarters => 75,
            Self::Full => 100,
        }
    }
}

impl TryFrom<i16> for DisplayWidth {
    type Error = LayoutError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(Self::Quarter),
            50 => Ok(Self::Half),
            75 => Ok(Self::ThreeQuarters),
            100 => Ok(Self::Full),
            other => Err(LayoutError::InvalidWidth(other)),
        }
    }
}

impl From<DisplayWidth> for i16 {
    fn from(width: DisplayWidth) -> Self {
        Self::from(width.percent())
    }
}

/// Anything that can be packed into rows.
pub trait Tile {
    fn width(&self) -> DisplayWidth;
    fn position(&self) -> i32;
    fn alignment(&self) -> Alignment;
}

/// One rendered row of tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row<T> {
    pub items: Vec<T>,
    /// Sum of item widths in percent, never above 100.
    pub used: u8,
    /// Alignment of the row's first tile.
    pub alignment: Alignment,
}

impl<T> Row<T> {
    /// Unused width in percent.
    #[must_use]
    pub const fn remaining(&self) -> u8 {
        ROW_WIDTH.saturating_sub(self.used)
    }
}

/// Pack tiles into rows of at most 100% width.
///
/// Tiles are sorted by position (stable, so ties keep input order). A row is
/// closed as soon as it is exactly full, or when the next tile would not fit.
pub fn pack_rows<T: Tile>(mut tiles: Vec<T>) -> Vec<Row<T>> {
    tiles.sort_by_key(Tile::position);

    let mut rows = Vec::new();
    let mut current: Option<Row<T>> = None;

    for tile in tiles {
        let width = tile.width().percent();
        if let Some(row) = current.take_if(|row| row.used + width > ROW_WIDTH) {
            rows.push(row);
        }
        let row = current.get_or_insert_with(|| Row {
            items: Vec::new(),
            used: 0,
            alignment: tile.alignment(),
        });
        row.used += width;
        row.items.push(tile);
        if let Some(full) = current.take_if(|row| row.used == ROW_WIDTH) {
            rows.push(full);
        }
    }

    rows.extend(current);
    rows
}

/// A promotional banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    #[cfg_attr(feature = "postgres", sqlx(try_from = "i16"))]
    pub display_width: DisplayWidth,
    pub alignment: Alignment,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Banner {
    /// Active and inside its optional schedule window.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && within_window(self.starts_at, self.ends_at, now)
    }
}

impl Tile for Banner {
    fn width(&self) -> DisplayWidth {
        self.display_width
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn alignment(&self) -> Alignment {
        self.alignment
    }
}

/// A configurable section of the home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct HomeBlock {
    pub id: HomeBlockId,
    pub kind: HomeBlockKind,
    pub title: Option<String>,
    /// Category, combo or banner depending on `kind`.
    pub reference_id: Option<i32>,
    pub position: i32,
    #[cfg_attr(feature = "postgres", sqlx(try_from = "i16"))]
    pub display_width: DisplayWidth,
    pub alignment: Alignment,
    pub active: bool,
}

impl Tile for HomeBlock {
    fn width(&self) -> DisplayWidth {
        self.display_width
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn alignment(&self) -> Alignment {
        self.alignment
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct T(i32, DisplayWidth, Alignment);

    impl Tile for T {
        fn width(&self) -> DisplayWidth {
            self.1
        }
        fn position(&self) -> i32 {
            self.0
        }
        fn alignment(&self) -> Alignment {
            self.2
        }
    }

    fn t(position: i32, width: i16) -> T {
        T(position, DisplayWidth::try_from(width).unwrap(), Alignment::Left)
    }

    fn positions(rows: &[Row<T>]) -> Vec<Vec<i32>> {
        rows.iter()
            .map(|r| r.items.iter().map(|i| i.0).collect())
            .collect()
    }

    #[test]
    fn test_width_conversion() {
        assert_eq!(DisplayWidth::try_from(75).unwrap(), DisplayWidth::ThreeQuarters);
        assert_eq!(i16::from(DisplayWidth::Half), 50);
        assert_eq!(DisplayWidth::try_from(30), Err(LayoutError::InvalidWidth(30)));
        assert!(serde_json::from_str::<DisplayWidth>("60").is_err());
        assert_eq!(serde_json::to_string(&DisplayWidth::Quarter).unwrap(), "25");
    }

    #[test]
    fn test_pack_fills_rows_in_position_order() {
        let rows = pack_rows(vec![t(3, 50), t(1, 50), t(2, 25), t(4, 25)]);
        // 50 + 25 = 75, then 50 overflows; 50 + 25 = 75 remains open.
        assert_eq!(positions(&rows), vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(rows.first().unwrap().remaining(), 25);
    }

    #[test]
    fn test_full_row_closes_immediately() {
        let rows = pack_rows(vec![t(1, 100), t(2, 25), t(3, 75), t(4, 25)]);
        assert_eq!(positions(&rows), vec![vec![1], vec![2, 3], vec![4]]);
        assert!(rows.iter().all(|r| r.used <= ROW_WIDTH));
    }

    #[test]
    fn test_overflow_starts_new_row() {
        let rows = pack_rows(vec![t(1, 75), t(2, 50), t(3, 50)]);
        assert_eq!(positions(&rows), vec![vec![1], vec![2, 3]]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let rows = pack_rows(vec![t(1, 25), t(0, 25), t(1, 25)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().used, 75);
    }

    #[test]
    fn test_row_alignment_from_first_tile() {
        let rows = pack_rows(vec![
            T(1, DisplayWidth::Half, Alignment::Center),
            T(2, DisplayWidth::Quarter, Alignment::Right),
        ]);
        assert_eq!(rows.first().unwrap().alignment, Alignment::Center);
    }

    #[test]
    fn test_empty_input() {
        assert!(pack_rows(Vec::<T>::new()).is_empty());
    }

    #[test]
    fn test_banner_schedule() {
        let now = Utc::now();
        let mut banner = Banner {
            id: BannerId::new(1),
            title: "Diwali".to_string(),
            image_url: "/img/diwali.jpg".to_string(),
            link_url: None,
            position: 0,
            display_width: DisplayWidth::Full,
            alignment: Alignment::Center,
            active: true,
            starts_at: None,
            ends_at: None,
        };
        assert!(banner.is_live(now));
        banner.ends_at = Some(now - chrono::Duration::hours(1));
        assert!(!banner.is_live(now));
        banner.ends_at = Some(now);
        assert!(!banner.is_live(now));
        banner.ends_at = None;
        banner.active = false;
        assert!(!banner.is_live(now));
    }
}
