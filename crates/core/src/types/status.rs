//! Status and classification enums shared by the storefront, admin and CLI.
//!
//! Every enum maps to a `PostgreSQL` enum type in the `shop` schema (with the
//! `postgres` feature) and serializes as `snake_case`.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` using the snake case names.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` name used in JSON and the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

/// Customer pricing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.customer_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    #[default]
    Regular,
    /// Standing discount on regular and/or sale-priced items.
    Subscription,
    /// Buys at the retailer price list.
    Retailer,
    /// Buys at the distributor price list.
    Distributor,
    /// Small traders; priced like retailers.
    SelfEmployed,
}

string_enum!(CustomerType {
    Regular => "regular",
    Subscription => "subscription",
    Retailer => "retailer",
    Distributor => "distributor",
    SelfEmployed => "self_employed",
});

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.discount_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Value is a percentage of the amount.
    #[default]
    Percentage,
    /// Value is a rupee amount.
    Fixed,
}

string_enum!(DiscountType {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// Subscription delivery cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.delivery_schedule", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySchedule {
    Daily,
    AlternateDays,
    Weekly,
    Monthly,
}

string_enum!(DeliverySchedule {
    Daily => "daily",
    AlternateDays => "alternate_days",
    Weekly => "weekly",
    Monthly => "monthly",
});

/// Where an order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_channel", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    Online,
    Pos,
}

string_enum!(OrderChannel {
    Online => "online",
    Pos => "pos",
});

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    /// POS sales are completed at the counter.
    Completed,
    Cancelled,
}

string_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    ///
    /// Online orders can be cancelled until they ship. A completed POS sale
    /// can be voided by cancelling it; delivered and cancelled orders are
    /// final.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
                | (Self::Completed, Self::Cancelled)
        )
    }

    /// Whether entering this status gives back what placing the order took:
    /// product stock and the coupon use.
    #[must_use]
    pub const fn releases_reservations(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Card,
    Upi,
    /// Paid through the storefront checkout.
    Online,
}

string_enum!(PaymentType {
    Cash => "cash",
    Card => "card",
    Upi => "upi",
    Online => "online",
});

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access including staff management.
    SuperAdmin,
    /// Full access to catalog, customers, merchandising and bookings.
    Admin,
    /// Point of sale, orders and invoices only.
    Cashier,
}

string_enum!(AdminRole {
    SuperAdmin => "super_admin",
    Admin => "admin",
    Cashier => "cashier",
});

impl AdminRole {
    /// Whether this role may edit catalog, pricing and merchandising data.
    #[must_use]
    pub const fn can_manage_store(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

/// Service booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.booking_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

string_enum!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Service offered by a swim/groom provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.service_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Swimming,
    Grooming,
}

string_enum!(ServiceKind {
    Swimming => "swimming",
    Grooming => "grooming",
});

/// Level in the Country -> State -> City -> Locality hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.location_level", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LocationLevel {
    Country,
    State,
    City,
    Locality,
}

string_enum!(LocationLevel {
    Country => "country",
    State => "state",
    City => "city",
    Locality => "locality",
});

/// Horizontal alignment of a banner or home block row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.alignment", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

string_enum!(Alignment {
    Left => "left",
    Center => "center",
    Right => "right",
});

/// What a home page block renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.home_block_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum HomeBlockKind {
    /// A category tile; `reference_id` is the category.
    CategoryTiles,
    /// Products carrying a feature flag; `reference_id` unused.
    ProductCarousel,
    /// A combo offer; `reference_id` is the combo.
    ComboStrip,
    /// A banner; `reference_id` is the banner.
    BannerSlot,
}

string_enum!(HomeBlockKind {
    CategoryTiles => "category_tiles",
    ProductCarousel => "product_carousel",
    ComboStrip => "combo_strip",
    BannerSlot => "banner_slot",
});
