//! Data-driven marker descriptors. How an icon or colour is drawn is the map
//! adapter's business; the tracker only decides which one applies.

use super::keys::OverlayRole;
use crate::domains::tracking::FoodCategory;
use serde::Serialize;

pub const URGENT_COLOR: &str = "#f43f5e";
pub const AVAILABLE_COLOR: &str = "#10b981";
pub const DROPOFF_COLOR: &str = "#f97316";
pub const LIVE_COLOR: &str = "#3b82f6";
pub const LIVE_BADGE: &str = "LIVE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerIcon {
    Salad,
    Bento,
    Pin,
    Cyclist,
    UserDot,
}

impl MarkerIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            MarkerIcon::Salad => "🥗",
            MarkerIcon::Bento => "🍱",
            MarkerIcon::Pin => "📍",
            MarkerIcon::Cyclist => "🚴",
            MarkerIcon::UserDot => "●",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerVariant {
    pub icon: MarkerIcon,
    pub color: &'static str,
    pub pulsing: bool,
    pub badge: Option<&'static str>,
    /// Drawn above other markers.
    pub elevated: bool,
}

impl MarkerVariant {
    /// Pure function of urgency, food category and role. `None` for paths.
    pub fn select(is_urgent: bool, category: FoodCategory, role: OverlayRole) -> Option<Self> {
        let plain = |icon, color| MarkerVariant {
            icon,
            color,
            pulsing: false,
            badge: None,
            elevated: false,
        };

        match role {
            OverlayRole::PickupMarker => {
                let icon = match category {
                    FoodCategory::Veg => MarkerIcon::Salad,
                    FoodCategory::NonVeg | FoodCategory::Other => MarkerIcon::Bento,
                };
                let color = if is_urgent { URGENT_COLOR } else { AVAILABLE_COLOR };
                Some(plain(icon, color))
            }
            OverlayRole::DropoffMarker => Some(plain(MarkerIcon::Pin, DROPOFF_COLOR)),
            OverlayRole::LiveMarker => Some(MarkerVariant {
                icon: MarkerIcon::Cyclist,
                color: LIVE_COLOR,
                pulsing: true,
                badge: Some(LIVE_BADGE),
                elevated: true,
            }),
            OverlayRole::UserMarker => Some(plain(MarkerIcon::UserDot, LIVE_COLOR)),
            OverlayRole::PathLine => None,
        }
    }
}

/// Text attached to a marker (popup or tooltip, at the adapter's discretion).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerLabel {
    pub title: String,
    pub subtitle: Option<String>,
    pub detail: Option<String>,
}

impl MarkerLabel {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            detail: None,
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerAppearance {
    pub variant: MarkerVariant,
    pub label: MarkerLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: &'static str,
    pub weight: u8,
    pub opacity: f32,
    pub dash: Option<&'static str>,
}

impl PathStyle {
    /// Dashed line from a volunteer to their current target.
    pub fn live_route() -> Self {
        Self {
            color: LIVE_COLOR,
            weight: 4,
            opacity: 0.6,
            dash: Some("10, 15"),
        }
    }
}
