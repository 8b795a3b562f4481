use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Parse a `#RRGGBB` (or `RRGGBB`) hex colour.
pub fn parse_hex(s: &str) -> Option<RGBColor> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(RGBColor(r, g, b))
}

// ---------------------------------------------------------------------------
// Color mapping: group label → RGBColor
// ---------------------------------------------------------------------------

/// Maps each distinct group label to a distinct colour. Labels named in the
/// configured palette keep their configured colour; the rest get generated
/// hues.
#[derive(Debug, Clone)]
pub struct GroupColorMap {
    mapping: BTreeMap<String, RGBColor>,
    default_color: RGBColor,
}

impl GroupColorMap {
    /// Build a colour map for the given groups, honouring `overrides`
    /// (group → `#RRGGBB`). Unparsable override values fall back to a
    /// generated hue.
    pub fn new(groups: &BTreeSet<String>, overrides: &BTreeMap<String, String>) -> Self {
        let generated = generate_palette(groups.len());
        let mapping: BTreeMap<String, RGBColor> = groups
            .iter()
            .zip(generated)
            .map(|(group, fallback)| {
                let color = overrides
                    .get(group)
                    .and_then(|hex| parse_hex(hex))
                    .unwrap_or(fallback);
                (group.clone(), color)
            })
            .collect();

        GroupColorMap {
            mapping,
            default_color: RGBColor(128, 128, 128),
        }
    }

    /// Look up the colour for a group label.
    pub fn color_for(&self, group: &str) -> RGBColor {
        self.mapping
            .get(group)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (label → colour) in sorted label order.
    pub fn legend_entries(&self) -> Vec<(String, RGBColor)> {
        self.mapping
            .iter()
            .map(|(g, c)| (g.clone(), *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn palette_has_distinct_colors() {
        let palette = generate_palette(6);
        assert_eq!(palette.len(), 6);
        for i in 0..palette.len() {
            for j in (i + 1)..palette.len() {
                assert_ne!(palette[i], palette[j]);
            }
        }
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex("#ff0080"), Some(RGBColor(255, 0, 128)));
        assert_eq!(parse_hex("00FF00"), Some(RGBColor(0, 255, 0)));
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#xyzxyz"), None);
    }

    #[test]
    fn overrides_win_over_generated_hues() {
        let mut overrides = BTreeMap::new();
        overrides.insert("treated".to_string(), "#ff0000".to_string());

        let map = GroupColorMap::new(&group_set(&["control", "treated"]), &overrides);
        assert_eq!(map.color_for("treated"), RGBColor(255, 0, 0));
        assert_ne!(map.color_for("control"), RGBColor(255, 0, 0));
    }

    #[test]
    fn unknown_group_gets_the_default() {
        let map = GroupColorMap::new(&group_set(&["a"]), &BTreeMap::new());
        assert_eq!(map.color_for("nope"), RGBColor(128, 128, 128));
    }
}
