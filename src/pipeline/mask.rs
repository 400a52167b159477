//! Background synthesizer: local mask pass over cleanup regions.
//!
//! For each region this paints an approximation of the underlying background
//! directly onto a copy of the page — a solid color or a linear gradient
//! inferred from pixels sampled just outside the region, with feathered edges
//! so the patch dissolves into its surroundings instead of leaving a hard
//! rectangle.
//!
//! The pass serves two purposes: it reduces the work the external synthesis
//! model has to do (dissolve soft seams instead of inventing whole fills),
//! and it guarantees a deterministic fallback when reconstruction is skipped.
//! The whole function is pure: same image and regions in, same image out.

use super::consolidate::CleanupRegion;
use crate::geometry::NormBox;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use tracing::debug;

/// Distance, in pixels, from the region edge to each sample point.
const SAMPLE_OFFSET: f32 = 4.0;

/// Manhattan RGB distance above which edge colors count as a gradient.
const GRADIENT_THRESHOLD: f32 = 40.0;

/// How a region is filled, decided from the edge-sample averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Top-to-bottom linear gradient.
    Vertical,
    /// Left-to-right linear gradient.
    Horizontal,
    /// Flat fill with the average of all four edges.
    Solid,
}

/// Decide the fill mode from the vertical and horizontal edge differences.
///
/// Pure function of its inputs: a gradient is only used when one axis both
/// dominates the other and exceeds the threshold; everything else gets a
/// solid fill.
pub fn fill_mode(v_diff: f32, h_diff: f32, threshold: f32) -> FillMode {
    if v_diff > h_diff && v_diff > threshold {
        FillMode::Vertical
    } else if h_diff > v_diff && h_diff > threshold {
        FillMode::Horizontal
    } else {
        FillMode::Solid
    }
}

/// Paint approximate backgrounds over every region of a page image.
///
/// Returns a new image; the input is untouched.
pub fn mask_regions(image: &DynamicImage, regions: &[CleanupRegion]) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    for region in regions {
        paint_region(&mut canvas, region.bounds);
    }
    DynamicImage::ImageRgba8(canvas)
}

/// Average RGB color as floats, to avoid rounding until the final write.
#[derive(Debug, Clone, Copy)]
struct Shade {
    r: f32,
    g: f32,
    b: f32,
}

impl Shade {
    fn average(samples: &[Rgba<u8>]) -> Shade {
        let n = samples.len() as f32;
        Shade {
            r: samples.iter().map(|p| p.0[0] as f32).sum::<f32>() / n,
            g: samples.iter().map(|p| p.0[1] as f32).sum::<f32>() / n,
            b: samples.iter().map(|p| p.0[2] as f32).sum::<f32>() / n,
        }
    }

    fn manhattan(&self, other: &Shade) -> f32 {
        (self.r - other.r).abs() + (self.g - other.g).abs() + (self.b - other.b).abs()
    }

    fn lerp(&self, other: &Shade, t: f32) -> Shade {
        Shade {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    fn mix4(a: &Shade, b: &Shade, c: &Shade, d: &Shade) -> Shade {
        Shade {
            r: (a.r + b.r + c.r + d.r) / 4.0,
            g: (a.g + b.g + c.g + d.g) / 4.0,
            b: (a.b + b.b + c.b + d.b) / 4.0,
        }
    }

    fn to_rgba(self) -> Rgba<u8> {
        Rgba([
            self.r.round().clamp(0.0, 255.0) as u8,
            self.g.round().clamp(0.0, 255.0) as u8,
            self.b.round().clamp(0.0, 255.0) as u8,
            255,
        ])
    }
}

/// Read a pixel with boundary clamping.
fn sample(canvas: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let cx = (x.round() as i64).clamp(0, canvas.width() as i64 - 1) as u32;
    let cy = (y.round() as i64).clamp(0, canvas.height() as i64 - 1) as u32;
    *canvas.get_pixel(cx, cy)
}

fn paint_region(canvas: &mut RgbaImage, bounds: NormBox) {
    let (img_w, img_h) = (canvas.width() as f32, canvas.height() as f32);
    let (bx, by, bw, bh) = bounds.to_pixel_rect(canvas.width(), canvas.height());

    // Adaptive expansion: taller text gets proportionally more halo removed,
    // bounded so large boxes don't eat neighboring content.
    let expansion = (bh * 0.10).clamp(5.0, 15.0);

    let x0 = (bx - expansion).max(0.0);
    let y0 = (by - expansion).max(0.0);
    let x1 = (bx + bw + expansion).min(img_w);
    let y1 = (by + bh + expansion).min(img_h);

    let w = x1 - x0;
    let h = y1 - y0;
    if w <= 0.0 || h <= 0.0 {
        return;
    }

    // Three samples along each edge, a few pixels outward, averaged per side.
    let top = Shade::average(&[
        sample(canvas, x0, y0 - SAMPLE_OFFSET),
        sample(canvas, x0 + w / 2.0, y0 - SAMPLE_OFFSET),
        sample(canvas, x1, y0 - SAMPLE_OFFSET),
    ]);
    let bottom = Shade::average(&[
        sample(canvas, x0, y1 + SAMPLE_OFFSET),
        sample(canvas, x0 + w / 2.0, y1 + SAMPLE_OFFSET),
        sample(canvas, x1, y1 + SAMPLE_OFFSET),
    ]);
    let left = Shade::average(&[
        sample(canvas, x0 - SAMPLE_OFFSET, y0),
        sample(canvas, x0 - SAMPLE_OFFSET, y0 + h / 2.0),
        sample(canvas, x0 - SAMPLE_OFFSET, y1),
    ]);
    let right = Shade::average(&[
        sample(canvas, x1 + SAMPLE_OFFSET, y0),
        sample(canvas, x1 + SAMPLE_OFFSET, y0 + h / 2.0),
        sample(canvas, x1 + SAMPLE_OFFSET, y1),
    ]);

    let v_diff = top.manhattan(&bottom);
    let h_diff = left.manhattan(&right);
    let mode = fill_mode(v_diff, h_diff, GRADIENT_THRESHOLD);
    let all = Shade::mix4(&top, &bottom, &left, &right);

    // Feather radius scales with the patch but stays within fixed bounds so
    // small patches keep structure and big ones still blend.
    let radius = (w.min(h) * 0.25).clamp(10.0, 20.0);
    let margin = radius.ceil() as u32;

    let pw = w.ceil() as u32;
    let ph = h.ceil() as u32;
    debug!(
        "Masking region {}x{} at ({:.0},{:.0}) mode {:?} feather {:.0}px",
        pw, ph, x0, y0, mode, radius
    );

    // Render the fill into a scratch patch with transparent margins, blur it,
    // and alpha-composite it over the page. The margin pixels carry the fill
    // color at zero alpha so the blur never bleeds black into the edges.
    let sw = pw + 2 * margin;
    let sh = ph + 2 * margin;
    let mut scratch = RgbaImage::new(sw, sh);

    for sy in 0..sh {
        for sx in 0..sw {
            let inside = sx >= margin && sx < margin + pw && sy >= margin && sy < margin + ph;
            let shade = match mode {
                FillMode::Vertical => {
                    let span = (ph.saturating_sub(1)).max(1) as f32;
                    let t = ((sy as f32 - margin as f32) / span).clamp(0.0, 1.0);
                    top.lerp(&bottom, t)
                }
                FillMode::Horizontal => {
                    let span = (pw.saturating_sub(1)).max(1) as f32;
                    let t = ((sx as f32 - margin as f32) / span).clamp(0.0, 1.0);
                    left.lerp(&right, t)
                }
                FillMode::Solid => all,
            };
            let mut px = shade.to_rgba();
            px.0[3] = if inside { 255 } else { 0 };
            scratch.put_pixel(sx, sy, px);
        }
    }

    let feathered = imageops::blur(&scratch, radius / 2.0);
    imageops::overlay(
        canvas,
        &feathered,
        x0 as i64 - margin as i64,
        y0 as i64 - margin as i64,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn flat_page(color: [u8; 4], w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(color)))
    }

    fn region(y_min: f32, x_min: f32, y_max: f32, x_max: f32) -> CleanupRegion {
        CleanupRegion {
            bounds: NormBox::new(y_min, x_min, y_max, x_max),
        }
    }

    #[test]
    fn fill_mode_is_deterministic_and_threshold_gated() {
        assert_eq!(fill_mode(100.0, 10.0, 40.0), FillMode::Vertical);
        assert_eq!(fill_mode(10.0, 100.0, 40.0), FillMode::Horizontal);
        // Below threshold on both axes.
        assert_eq!(fill_mode(30.0, 20.0, 40.0), FillMode::Solid);
        // A dominating axis still needs to clear the threshold.
        assert_eq!(fill_mode(35.0, 5.0, 40.0), FillMode::Solid);
        // Ties never pick a gradient.
        assert_eq!(fill_mode(90.0, 90.0, 40.0), FillMode::Solid);
    }

    #[test]
    fn masking_preserves_dimensions_and_input() {
        let page = flat_page([200, 200, 200, 255], 400, 300);
        let out = mask_regions(&page, &[region(250.0, 250.0, 500.0, 750.0)]);
        assert_eq!(out.width(), 400);
        assert_eq!(out.height(), 300);
        // Input untouched.
        assert_eq!(page.to_rgba8().get_pixel(200, 100).0, [200, 200, 200, 255]);
    }

    #[test]
    fn uniform_background_fills_region_with_same_color() {
        let page = flat_page([120, 130, 140, 255], 400, 400);
        let out = mask_regions(&page, &[region(250.0, 250.0, 750.0, 750.0)]).to_rgba8();
        // Center of the region should match the surrounding flat color.
        let px = out.get_pixel(200, 200).0;
        assert_eq!(&px[..3], &[120, 130, 140]);
    }

    #[test]
    fn masking_is_deterministic() {
        let mut canvas = RgbaImage::from_pixel(300, 300, Rgba([90, 90, 90, 255]));
        // Non-uniform background: darker lower half triggers a gradient.
        for y in 150..300 {
            for x in 0..300 {
                canvas.put_pixel(x, y, Rgba([20, 20, 20, 255]));
            }
        }
        let page = DynamicImage::ImageRgba8(canvas);
        let regions = [region(300.0, 300.0, 700.0, 700.0)];
        let a = mask_regions(&page, &regions).to_rgba8();
        let b = mask_regions(&page, &regions).to_rgba8();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn no_regions_is_identity() {
        let page = flat_page([10, 20, 30, 255], 64, 64);
        let out = mask_regions(&page, &[]);
        assert_eq!(page.to_rgba8().as_raw(), out.to_rgba8().as_raw());
    }

    #[test]
    fn region_at_the_page_edge_stays_in_bounds() {
        // A zero-area box in the bottom-right corner: expansion and clamped
        // sampling must not read or write outside the canvas.
        let page = flat_page([10, 20, 30, 255], 64, 64);
        let out = mask_regions(&page, &[region(980.0, 980.0, 1000.0, 1000.0)]);
        assert_eq!(out.width(), 64);
        assert_eq!(out.height(), 64);
    }
}
