use std::collections::HashMap;

use glam::Vec2;
use log::warn;
use serde::Deserialize;

use super::{TextLoadError, TextParams};

/// Font in the JSON "typeface" format: glyph outlines as command strings in
/// font units.
#[derive(Debug, Clone)]
pub struct Typeface {
    pub family_name: String,
    pub resolution: f32,
    pub line_height_units: f32,
    glyphs: HashMap<char, Glyph>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub ha: f32,
    #[serde(default)]
    pub o: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTypeface {
    glyphs: HashMap<String, Glyph>,
    #[serde(rename = "familyName", default)]
    family_name: String,
    #[serde(default = "default_resolution")]
    resolution: f32,
    #[serde(rename = "boundingBox")]
    bounding_box: BoundingBox,
    #[serde(rename = "underlineThickness", default)]
    underline_thickness: f32,
}

#[derive(Debug, Deserialize)]
struct BoundingBox {
    #[serde(rename = "yMin")]
    y_min: f32,
    #[serde(rename = "yMax")]
    y_max: f32,
}

fn default_resolution() -> f32 {
    1000.0
}

const FALLBACK_GLYPH: char = '?';

impl Typeface {
    pub fn from_json(json: &str) -> Result<Self, TextLoadError> {
        let raw: RawTypeface = serde_json::from_str(json)?;
        let glyphs = raw
            .glyphs
            .into_iter()
            .filter_map(|(key, glyph)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some((ch, glyph)),
                    _ => None,
                }
            })
            .collect();
        Ok(Self {
            family_name: raw.family_name,
            resolution: if raw.resolution > 0.0 {
                raw.resolution
            } else {
                default_resolution()
            },
            line_height_units: raw.bounding_box.y_max - raw.bounding_box.y_min
                + raw.underline_thickness,
            glyphs,
        })
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Lays `text` out left to right starting at the origin and returns the
    /// flattened contours of every glyph, in world units.
    ///
    /// Characters without a glyph use `?` when the font has one and are
    /// skipped otherwise.
    pub fn layout(&self, text: &str, params: &TextParams) -> Result<Vec<Vec<Vec2>>, TextLoadError> {
        let scale = params.size / self.resolution;
        let line_height = self.line_height_units * scale;
        let mut offset = Vec2::ZERO;
        let mut contours = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let Some(glyph) = self.glyph(ch).or_else(|| self.glyph(FALLBACK_GLYPH)) else {
                warn!(
                    "character {ch:?} is missing from font {:?}; skipping",
                    self.family_name
                );
                continue;
            };
            if let Some(outline) = glyph.o.as_deref() {
                let glyph_contours = parse_outline(outline, scale, offset, params.curve_segments)
                    .map_err(|reason| TextLoadError::InvalidOutline { glyph: ch, reason })?;
                contours.extend(glyph_contours);
            }
            offset.x += glyph.ha * scale;
        }
        Ok(contours)
    }
}

/// Parses an outline command string (`m x y`, `l x y`, `q x y cx cy`,
/// `b x y c1x c1y c2x c2y`) into closed contours.
///
/// For curves the end point comes first, followed by the control points.
fn parse_outline(
    outline: &str,
    scale: f32,
    offset: Vec2,
    curve_segments: u32,
) -> Result<Vec<Vec<Vec2>>, String> {
    let mut tokens = outline.split_whitespace();
    let mut contours = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    let segments = curve_segments.max(1);

    let point = |tokens: &mut std::str::SplitWhitespace<'_>| -> Result<Vec2, String> {
        let mut coord = || -> Result<f32, String> {
            let token = tokens.next().ok_or("outline ended mid-command")?;
            token
                .parse::<f32>()
                .map_err(|err| format!("bad coordinate {token:?}: {err}"))
        };
        let x = coord()?;
        let y = coord()?;
        Ok(Vec2::new(x, y) * scale + offset)
    };

    while let Some(command) = tokens.next() {
        match command {
            "m" => {
                finish_contour(&mut current, &mut contours);
                current.push(point(&mut tokens)?);
            }
            "l" => current.push(point(&mut tokens)?),
            "q" => {
                let end = point(&mut tokens)?;
                let control = point(&mut tokens)?;
                let start = current.last().copied().ok_or("curve without start point")?;
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    current.push(quadratic(start, control, end, t));
                }
            }
            "b" => {
                let end = point(&mut tokens)?;
                let c1 = point(&mut tokens)?;
                let c2 = point(&mut tokens)?;
                let start = current.last().copied().ok_or("curve without start point")?;
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    current.push(cubic(start, c1, c2, end, t));
                }
            }
            "z" => finish_contour(&mut current, &mut contours),
            other => return Err(format!("unknown command {other:?}")),
        }
    }
    finish_contour(&mut current, &mut contours);
    Ok(contours)
}

fn finish_contour(current: &mut Vec<Vec2>, contours: &mut Vec<Vec<Vec2>>) {
    let mut contour = std::mem::take(current);
    contour.dedup_by(|a, b| a.distance_squared(*b) <= POINT_EPSILON);
    while contour.len() > 1
        && contour[0].distance_squared(contour[contour.len() - 1]) <= POINT_EPSILON
    {
        contour.pop();
    }
    if contour.len() >= 3 {
        contours.push(contour);
    }
}

const POINT_EPSILON: f32 = 1e-10;

fn quadratic(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    p0 * (k * k) + p1 * (2.0 * k * t) + p2 * (t * t)
}

fn cubic(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    p0 * (k * k * k) + p1 * (3.0 * k * k * t) + p2 * (3.0 * k * t * t) + p3 * (t * t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: &str = r#"{
        "familyName": "Boxes",
        "resolution": 1000,
        "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 800, "xMax": 1000 },
        "underlineThickness": 50,
        "glyphs": {
            "o": { "ha": 1000, "x_min": 0, "x_max": 1000,
                   "o": "m 0 0 l 800 0 l 800 800 l 0 800 z m 200 200 l 200 600 l 600 600 l 600 200 z" },
            "?": { "ha": 500, "x_min": 0, "x_max": 500, "o": "m 0 0 l 400 0 q 400 400 400 0 l 0 400" },
            "d": { "ha": 600, "x_min": 0, "x_max": 500, "o": "m 0 0 l 500 0 b 0 500 500 250 250 500 z" },
            " ": { "ha": 300, "x_min": 0, "x_max": 0, "o": "" }
        }
    }"#;

    fn params(size: f32) -> TextParams {
        TextParams {
            size,
            curve_segments: 4,
            ..TextParams::default()
        }
    }

    #[test]
    fn parses_glyph_table() {
        let face = Typeface::from_json(FONT).unwrap();
        assert_eq!(face.family_name, "Boxes");
        assert_eq!(face.glyph_count(), 4);
        assert_eq!(face.line_height_units, 1050.0);
    }

    #[test]
    fn layout_scales_and_advances() {
        let face = Typeface::from_json(FONT).unwrap();
        let contours = face.layout("o o", &params(2.0)).unwrap();
        assert_eq!(contours.len(), 4);
        // second "o" starts after 1000 + 300 units at 2/1000 scale
        assert!(contours[2][0].abs_diff_eq(Vec2::new(2.6, 0.0), 1e-5));
        assert!(contours[0][2].abs_diff_eq(Vec2::new(1.6, 1.6), 1e-5));
    }

    #[test]
    fn newline_moves_down_one_line() {
        let face = Typeface::from_json(FONT).unwrap();
        let contours = face.layout("o\no", &params(1.0)).unwrap();
        assert!(contours[2][0].abs_diff_eq(Vec2::new(0.0, -1.05), 1e-5));
    }

    #[test]
    fn unknown_characters_fall_back_to_question_mark() {
        let face = Typeface::from_json(FONT).unwrap();
        let contours = face.layout("x", &params(1.0)).unwrap();
        assert_eq!(contours.len(), 1);
        // move, line, four curve samples, line
        assert_eq!(contours[0].len(), 7);
    }

    #[test]
    fn malformed_outline_is_reported() {
        let json = FONT.replace("m 0 0 l 800 0", "m 0 0 k 800 0");
        let face = Typeface::from_json(&json).unwrap();
        let err = face.layout("o", &params(1.0)).unwrap_err();
        assert!(matches!(err, TextLoadError::InvalidOutline { glyph: 'o', .. }));
    }

    #[test]
    fn cubic_commands_are_flattened() {
        let face = Typeface::from_json(FONT).unwrap();
        let contours = face.layout("d", &params(1.0)).unwrap();
        assert_eq!(contours.len(), 1);
        let contour = &contours[0];
        // move, line, four curve samples
        assert_eq!(contour.len(), 6);
        assert!(contour[3].abs_diff_eq(Vec2::new(0.34375, 0.34375), 1e-5));
        assert!(contour[5].abs_diff_eq(Vec2::new(0.0, 0.5), 1e-5));
    }

    #[test]
    fn curves_end_on_their_end_point() {
        let end = Vec2::new(4.0, 0.0);
        let control = Vec2::new(2.0, 3.0);
        assert_eq!(quadratic(Vec2::ZERO, control, end, 1.0), end);
        assert_eq!(cubic(Vec2::ZERO, control, control, end, 0.0), Vec2::ZERO);
    }
}
