//! 256-bin histograms and the lookup tables built from them.
//!
//! Three flavours are provided: global equalization (used before detection and
//! by the luma/value enhancement modes), the masked cumulative rescale used for
//! per-channel enhancement, and contrast-limited adaptive equalization (CLAHE)
//! over a small tile grid.

use image::GrayImage;

/// Lookup table mapping one 8-bit level to another.
pub type Lut = [u8; 256];

pub fn identity_lut() -> Lut {
    let mut lut = [0u8; 256];
    for (i, item) in lut.iter_mut().enumerate() {
        *item = i as u8;
    }
    lut
}

/// Count occurrences of every level in `values`.
pub fn histogram<I>(values: I) -> [u32; 256]
where
    I: IntoIterator<Item = u8>,
{
    let mut hist = [0u32; 256];
    for value in values {
        hist[value as usize] += 1;
    }
    hist
}

/// Build a global equalization table: `round((cdf - cdf_min) * 255 / (total - cdf_min))`.
///
/// `cdf_min` is the cumulative count at the first populated level, so the
/// darkest level present always maps to 0 and the brightest to 255. A single
/// populated level (or an empty histogram) yields the identity.
pub fn equalization_lut(hist: &[u32; 256]) -> Lut {
    let total: u32 = hist.iter().sum();
    if total == 0 {
        return identity_lut();
    }

    let mut cdf = [0u32; 256];
    let mut cumulative = 0u32;
    let mut cdf_min = None;
    for (idx, count) in hist.iter().enumerate() {
        cumulative += *count;
        cdf[idx] = cumulative;
        if cdf_min.is_none() && *count > 0 {
            cdf_min = Some(cumulative);
        }
    }

    let Some(cdf_min) = cdf_min else {
        return identity_lut();
    };
    if cdf_min == total {
        return identity_lut();
    }

    let denom = (total - cdf_min) as f32;
    let mut lut = [0u8; 256];
    for (slot, &cdf_val) in lut.iter_mut().zip(cdf.iter()) {
        let numerator = cdf_val.saturating_sub(cdf_min) as f32;
        *slot = (numerator / denom * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Build the masked cumulative rescale used for per-channel enhancement.
///
/// Cumulative entries equal to zero (levels below the darkest populated one)
/// are masked out of the min/max computation and map to 0. The remaining
/// entries are rescaled with integer floor division to `0..=255`. When every
/// populated entry shares one cumulative value the channel is flat and the
/// identity is returned so it stays unchanged.
pub fn cumulative_rescale_lut(hist: &[u32; 256]) -> Lut {
    let mut cdf = [0u64; 256];
    let mut cumulative = 0u64;
    for (slot, count) in cdf.iter_mut().zip(hist.iter()) {
        cumulative += *count as u64;
        *slot = cumulative;
    }

    let Some(min) = cdf.iter().copied().find(|&value| value != 0) else {
        return identity_lut();
    };
    let max = cumulative;
    if max == min {
        return identity_lut();
    }

    let span = max - min;
    let mut lut = [0u8; 256];
    for (slot, &value) in lut.iter_mut().zip(cdf.iter()) {
        if value == 0 {
            continue;
        }
        *slot = ((value - min) * 255 / span) as u8;
    }
    lut
}

/// Apply a lookup table to every pixel of a grayscale image.
pub fn apply_lut(image: &GrayImage, lut: &Lut) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    out
}

/// Global histogram equalization of a grayscale image.
pub fn equalize_gray(image: &GrayImage) -> GrayImage {
    let hist = histogram(image.pixels().map(|p| p.0[0]));
    apply_lut(image, &equalization_lut(&hist))
}

/// Contrast-limited adaptive histogram equalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    /// Relative clip limit; the absolute limit is `clip_limit * tile_area / 256`.
    pub clip_limit: f32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles_x: 2,
            tiles_y: 2,
        }
    }
}

impl Clahe {
    /// Equalize `image` tile by tile and blend neighbouring tile tables bilinearly.
    ///
    /// Sizes that do not divide into the tile grid are padded by reflection
    /// (without repeating the edge pixel) so every tile has the same area.
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image.clone();
        }
        let tiles_x = self.tiles_x.clamp(1, width);
        let tiles_y = self.tiles_y.clamp(1, height);
        let (tile_w, tile_h) = padded_tile_size(width, height, tiles_x, tiles_y);
        let area = tile_w * tile_h;

        let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let mut hist = [0u32; 256];
                for y in ty * tile_h..(ty + 1) * tile_h {
                    let sy = reflect_101(y, height);
                    for x in tx * tile_w..(tx + 1) * tile_w {
                        let sx = reflect_101(x, width);
                        hist[image.get_pixel(sx, sy).0[0] as usize] += 1;
                    }
                }
                luts.push(self.tile_lut(hist, area));
            }
        }

        let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            let (ty1, ty2, ya) = neighbours(y, tile_h, tiles_y);
            for x in 0..width {
                let (tx1, tx2, xa) = neighbours(x, tile_w, tiles_x);
                let level = image.get_pixel(x, y).0[0] as usize;
                let top = lut_at(tx1, ty1)[level] as f32 * (1.0 - xa)
                    + lut_at(tx2, ty1)[level] as f32 * xa;
                let bottom = lut_at(tx1, ty2)[level] as f32 * (1.0 - xa)
                    + lut_at(tx2, ty2)[level] as f32 * xa;
                let value = top * (1.0 - ya) + bottom * ya;
                out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
            }
        }
        out
    }

    fn tile_lut(&self, mut hist: [u32; 256], area: u32) -> Lut {
        if area == 0 {
            return identity_lut();
        }
        let limit = ((self.clip_limit * area as f32 / 256.0) as u32).max(1);

        let mut excess = 0u32;
        for count in hist.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }

        let batch = excess / 256;
        let mut residual = excess - batch * 256;
        for count in hist.iter_mut() {
            *count += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1) as usize;
            for count in hist.iter_mut().step_by(step) {
                if residual == 0 {
                    break;
                }
                *count += 1;
                residual -= 1;
            }
        }

        let scale = 255.0 / area as f32;
        let mut lut = [0u8; 256];
        let mut sum = 0u32;
        for (slot, count) in lut.iter_mut().zip(hist.iter()) {
            sum += *count;
            *slot = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

/// Tile size after padding. When either side does not divide evenly, both
/// sides grow by `tiles - side % tiles`, which matches OpenCV.
fn padded_tile_size(width: u32, height: u32, tiles_x: u32, tiles_y: u32) -> (u32, u32) {
    if width % tiles_x == 0 && height % tiles_y == 0 {
        return (width / tiles_x, height / tiles_y);
    }
    let padded_w = width + tiles_x - width % tiles_x;
    let padded_h = height + tiles_y - height % tiles_y;
    (padded_w / tiles_x, padded_h / tiles_y)
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge.
fn reflect_101(index: u32, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let folded = index % period;
    if folded < len { folded } else { period - folded }
}

/// Indices of the two tiles bracketing `pos` along one axis and the blend weight
/// of the second.
fn neighbours(pos: u32, tile: u32, tiles: u32) -> (u32, u32, f32) {
    let f = pos as f32 / tile as f32 - 0.5;
    let first = f.floor();
    let weight = f - first;
    let lo = (first as i64).clamp(0, tiles as i64 - 1) as u32;
    let hi = (first as i64 + 1).clamp(0, tiles as i64 - 1) as u32;
    (lo, hi, weight)
}
