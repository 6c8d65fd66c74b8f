//! Marker appearance for respondents on the map canvas.

use serde::Serialize;

use crate::loader::{Gender, Profile};

pub const FEMALE_COLOR: &str = "#E91E63";
pub const DEFAULT_COLOR: &str = "#4CAF50";

/// Color and pixel size of one respondent marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub size: u32,
}

impl MarkerStyle {
    /// Pink for women, green otherwise; students drawn smaller and
    /// retirees larger.
    pub fn for_profile(profile: &Profile) -> Self {
        let color = match profile.gender {
            Gender::Female => FEMALE_COLOR,
            Gender::Male => DEFAULT_COLOR,
        };
        let size = match profile.occupation.as_str() {
            "学生" => 20,
            "退休人员" => 28,
            _ => 24,
        };
        MarkerStyle { color, size }
    }

    /// Person glyph (head and shoulders) as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        format!(
            r#"<svg width="{size}" height="{size}" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><circle cx="12" cy="8" r="5" fill="{color}"/><path d="M20 21C20 16.5817 16.4183 13 12 13C7.58172 13 4 16.5817 4 21" stroke="{color}" stroke-width="2" fill="none"/></svg>"#,
            size = self.size,
            color = self.color,
        )
    }

    /// Offset that centers the icon on its coordinate.
    pub fn anchor_offset(&self) -> (i32, i32) {
        let half = (self.size / 2) as i32;
        (-half, -half)
    }

    pub fn icon(&self) -> MarkerIcon {
        MarkerIcon {
            svg: self.to_svg(),
            anchor: self.anchor_offset(),
        }
    }
}

/// Ready-to-draw icon handed to the map canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerIcon {
    pub svg: String,
    /// Pixel offset of the icon's top-left corner from the coordinate.
    pub anchor: (i32, i32),
}
