use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};

/// CLAHE clip limit and tile grid.
const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_TILES: u32 = 8;

/// Light blur applied before global Otsu thresholding (3x3 Gaussian).
const OTSU_BLUR_SIGMA: f32 = 0.8;

/// Adaptive threshold: Gaussian-weighted neighbourhood of a 31px block, minus C.
const ADAPTIVE_SIGMA: f32 = 5.0;
const ADAPTIVE_C: i32 = 2;

/// Structuring element for the white top-hat (wide and thin, like a text line).
const TOPHAT_KERNEL: (u32, u32) = (25, 3);

/// Structuring element for reconnecting broken strokes.
const CLOSE_KERNEL: (u32, u32) = (2, 1);

/// Enhancement strategy that produced a variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantTag {
    /// CLAHE -> Otsu -> close -> dark text
    EnhanceA,
    /// White top-hat -> adaptive -> close -> dark text
    EnhanceB,
    /// CLAHE -> adaptive -> close -> dark text
    EnhanceC,
    /// Upscaled grayscale, not binarized
    Plain,
}

impl VariantTag {
    pub const ALL: [VariantTag; 4] = [
        VariantTag::EnhanceA,
        VariantTag::EnhanceB,
        VariantTag::EnhanceC,
        VariantTag::Plain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnhanceA => "enhanceA",
            Self::EnhanceB => "enhanceB",
            Self::EnhanceC => "enhanceC",
            Self::Plain => "plain",
        }
    }
}

/// One candidate image for OCR.
#[derive(Clone, Debug)]
pub struct Variant {
    pub tag: VariantTag,
    pub image: GrayImage,
}

/// Builds the four OCR candidates for one HUD line.
///
/// The crop is converted to grayscale and upscaled to `target_height` (never
/// downscaled). Every variant is derived from that shared grayscale image only,
/// so any of them can be dropped without affecting the others. Output order is
/// always `VariantTag::ALL`. An empty crop yields no variants.
pub fn generate_variants(crop: &DynamicImage, target_height: u32) -> Vec<Variant> {
    let gray0 = crop.to_luma8();
    if gray0.width() == 0 || gray0.height() == 0 {
        return Vec::new();
    }
    let gray = upscale_to_height(&gray0, target_height);

    let enhance_a = {
        let equalized = clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_TILES);
        let binary = otsu_binarize(&equalized);
        ensure_dark_text(close_thin(&binary))
    };

    let enhance_b = {
        let background_removed = white_tophat(&gray, TOPHAT_KERNEL);
        let binary = adaptive_binarize(&background_removed);
        ensure_dark_text(close_thin(&binary))
    };

    let enhance_c = {
        let equalized = clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_TILES);
        let binary = adaptive_binarize(&equalized);
        ensure_dark_text(close_thin(&binary))
    };

    vec![
        Variant { tag: VariantTag::EnhanceA, image: enhance_a },
        Variant { tag: VariantTag::EnhanceB, image: enhance_b },
        Variant { tag: VariantTag::EnhanceC, image: enhance_c },
        Variant { tag: VariantTag::Plain, image: gray },
    ]
}

/// Splits a frame at its midline into the top and bottom HUD lines.
/// The top half gets `max(1, h / 2)` rows.
pub fn split_horizontal(img: &DynamicImage) -> (DynamicImage, DynamicImage) {
    let (w, h) = (img.width(), img.height());
    if h == 0 {
        return (img.clone(), img.clone());
    }
    let mid = (h / 2).max(1);
    let top = img.crop_imm(0, 0, w, mid);
    let bottom = img.crop_imm(0, mid, w, h - mid);
    (top, bottom)
}

/// Upscales with cubic interpolation so the image is `target_height` rows tall,
/// preserving aspect ratio. Images already tall enough are returned unchanged.
pub fn upscale_to_height(gray: &GrayImage, target_height: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || h >= target_height {
        return gray.clone();
    }
    let scale = target_height as f64 / h as f64;
    let new_width = ((w as f64 * scale).round() as u32).max(1);
    imageops::resize(gray, new_width, target_height, FilterType::CatmullRom)
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is divided into a `tiles x tiles` grid; each tile gets a clipped
/// histogram-equalization lookup table, and pixels are mapped by bilinear
/// interpolation between the four nearest tile tables.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    // Every tile must own at least one pixel
    let tile_w = w.div_ceil(tiles.clamp(1, w));
    let tile_h = h.div_ceil(tiles.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1.saturating_sub(x0)) * (y1.saturating_sub(y0));
            luts[(ty * tiles_x + tx) as usize] = clipped_equalization_lut(&mut hist, area, clip_limit);
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(w, h, |x, y| {
        let txf = x as f32 / tile_w as f32 - 0.5;
        let tyf = y as f32 / tile_h as f32 - 0.5;
        let tx1 = txf.floor();
        let ty1 = tyf.floor();
        let xa = txf - tx1;
        let ya = tyf - ty1;

        let clamp_x = |t: f32| (t.max(0.0) as u32).min(tiles_x - 1);
        let clamp_y = |t: f32| (t.max(0.0) as u32).min(tiles_y - 1);
        let (ax, bx) = (clamp_x(tx1), clamp_x(tx1 + 1.0));
        let (ay, by) = (clamp_y(ty1), clamp_y(ty1 + 1.0));

        let v = gray.get_pixel(x, y)[0] as usize;
        let top = lut_at(ax, ay)[v] as f32 * (1.0 - xa) + lut_at(bx, ay)[v] as f32 * xa;
        let bottom = lut_at(ax, by)[v] as f32 * (1.0 - xa) + lut_at(bx, by)[v] as f32 * xa;
        let value = top * (1.0 - ya) + bottom * ya;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clips a tile histogram, spreads the excess over all bins and returns the
/// cumulative mapping.
fn clipped_equalization_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / 256;
    let residual = excess - batch * 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step).take(residual as usize) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut sum = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        sum += bin;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Global threshold at the Otsu level of a lightly blurred copy. Pixels
/// strictly brighter than the level become white.
fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, OTSU_BLUR_SIGMA);
    let level = otsu_level(&blurred);
    threshold(&blurred, level, ThresholdType::Binary)
}

/// Local threshold against a Gaussian-weighted neighbourhood mean minus `ADAPTIVE_C`.
fn adaptive_binarize(gray: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, ADAPTIVE_SIGMA);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0] as i32;
        let t = local_mean.get_pixel(x, y)[0] as i32 - ADAPTIVE_C;
        if v > t { Luma([255u8]) } else { Luma([0u8]) }
    })
}

/// Removes slowly varying bright background, keeping small bright features:
/// `src - open(src)` with a rectangular element.
fn white_tophat(gray: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    let opened = grayscale_open(gray, &rect_mask(kernel));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0].saturating_sub(opened.get_pixel(x, y)[0])])
    })
}

/// Morphological closing with the thin stroke element.
fn close_thin(binary: &GrayImage) -> GrayImage {
    grayscale_close(binary, &rect_mask(CLOSE_KERNEL))
}

/// Solid `w x h` structuring element anchored at its centre.
fn rect_mask((w, h): (u32, u32)) -> Mask {
    let element = GrayImage::from_pixel(w, h, Luma([255u8]));
    Mask::from_image(&element, (w / 2) as u8, (h / 2) as u8)
}

/// Flips binarized images so the mean intensity is at least mid-range,
/// i.e. text ends up dark on a light background.
fn ensure_dark_text(mut binary: GrayImage) -> GrayImage {
    if mean_intensity(&binary) < 128.0 {
        imageops::invert(&mut binary);
    }
    binary
}

pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / count as f64
}
