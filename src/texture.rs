use glam::Vec2;

/// RGBA8 image stored row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Texture {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(rgba)
    }
}

/// Color at a normalized offset along a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: [u8; 4],
}

impl ColorStop {
    pub const fn new(offset: f32, color: [u8; 4]) -> Self {
        Self { offset, color }
    }
}

/// Radial gradient between two concentric circles, evaluated the way a 2D
/// canvas fill does it.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub center: Vec2,
    pub inner_radius: f32,
    pub outer_radius: f32,
    stops: Vec<ColorStop>,
}

impl RadialGradient {
    pub fn new(center: Vec2, inner_radius: f32, outer_radius: f32) -> Self {
        Self {
            center,
            inner_radius,
            outer_radius,
            stops: Vec::new(),
        }
    }

    /// Adds a stop; stops are kept ordered by offset.
    pub fn with_stop(mut self, offset: f32, color: [u8; 4]) -> Self {
        let stop = ColorStop::new(offset.clamp(0.0, 1.0), color);
        let index = self.stops.partition_point(|s| s.offset <= stop.offset);
        self.stops.insert(index, stop);
        self
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color of the gradient at `point`.
    pub fn color_at(&self, point: Vec2) -> [u8; 4] {
        let span = self.outer_radius - self.inner_radius;
        let t = if span.abs() <= f32::EPSILON {
            1.0
        } else {
            (point.distance(self.center) - self.inner_radius) / span
        };
        self.color_at_offset(t)
    }

    fn color_at_offset(&self, t: f32) -> [u8; 4] {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return [0; 4];
        };
        if t <= first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }
        for pair in self.stops.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if t <= to.offset {
                let span = to.offset - from.offset;
                let local = if span <= f32::EPSILON {
                    1.0
                } else {
                    (t - from.offset) / span
                };
                return lerp_rgba(from.color, to.color, local);
            }
        }
        last.color
    }

    /// Fills a `width` x `height` image, sampling at pixel centers.
    pub fn paint(&self, width: u32, height: u32) -> Texture {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let point = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                pixels.extend_from_slice(&self.color_at(point));
            }
        }
        Texture {
            width,
            height,
            pixels,
        }
    }
}

fn lerp_rgba(from: [u8; 4], to: [u8; 4], t: f32) -> [u8; 4] {
    let mut out = [0; 4];
    for channel in 0..4 {
        let a = from[channel] as f32;
        let b = to[channel] as f32;
        out[channel] = (a + (b - a) * t).round().clamp(0.0, 255.0) as u8;
    }
    out
}

pub const SHADOW_TEXTURE_SIZE: u32 = 128;
const SHADOW_CORE: [u8; 4] = [210, 210, 210, 255];
const SHADOW_EDGE: [u8; 4] = [255, 255, 255, 255];

/// Soft shadow decal: light gray in the middle fading to white at the rim.
pub fn shadow_gradient(size: u32) -> RadialGradient {
    let half = size as f32 / 2.0;
    RadialGradient::new(Vec2::splat(half), 0.0, half)
        .with_stop(0.1, SHADOW_CORE)
        .with_stop(1.0, SHADOW_EDGE)
}

/// Paints the square shadow decal used under the scene.
pub fn shadow_texture(size: u32) -> Texture {
    shadow_gradient(size).paint(size, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_texture_is_deterministic() {
        let first = shadow_texture(SHADOW_TEXTURE_SIZE);
        let second = shadow_texture(SHADOW_TEXTURE_SIZE);
        assert_eq!(first.pixels.len(), 128 * 128 * 4);
        assert_eq!(first, second);
    }

    #[test]
    fn center_is_gray_and_corners_are_white() {
        let texture = shadow_texture(SHADOW_TEXTURE_SIZE);
        assert_eq!(texture.pixel(64, 64), Some(SHADOW_CORE));
        assert_eq!(texture.pixel(0, 0), Some(SHADOW_EDGE));
        assert_eq!(texture.pixel(127, 127), Some(SHADOW_EDGE));
        assert_eq!(texture.pixel(128, 0), None);
    }

    #[test]
    fn gradient_interpolates_between_stops() {
        let gradient = shadow_gradient(128);
        // a third of the way from the 0.1 stop to the 1.0 stop
        let radius = 64.0 * 0.4;
        let color = gradient.color_at(Vec2::new(64.0 + radius, 64.0));
        assert_eq!(color[0], 225);
        assert_eq!(color[3], 255);
    }

    #[test]
    fn brightness_never_decreases_outward() {
        let texture = shadow_texture(SHADOW_TEXTURE_SIZE);
        let mut previous = 0;
        for x in 64..128 {
            let value = texture.pixel(x, 64).map(|p| p[0]).unwrap_or_default();
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn stops_are_sorted_on_insert() {
        let gradient = RadialGradient::new(Vec2::ZERO, 0.0, 1.0)
            .with_stop(1.0, [0; 4])
            .with_stop(0.2, [255; 4]);
        let offsets: Vec<f32> = gradient.stops().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.2, 1.0]);
    }
}
