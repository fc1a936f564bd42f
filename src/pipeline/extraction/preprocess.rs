//! Image normalization services for OCR input.
//!
//! **Services architecture**: each processing step is an independent, reusable service.
//! Services are composed by `NormalizationPipeline`, which runs them in a fixed order:
//!
//! 1. EXIF orientation correction (phone photos)
//! 2. Grayscale conversion (ITU-R BT.601 luma)
//! 3. Non-local-means denoising
//! 4. CLAHE (contrast limited adaptive histogram equalization)
//! 5. Otsu threshold selection + binary threshold
//!
//! Each stage assumes the output characteristics of the previous one. The CLAHE
//! step expects denoised input (it would otherwise amplify sensor noise tile by
//! tile), and Otsu expects the evened-out histogram CLAHE produces.
//!
//! Output keeps the input dimensions. No resize, no padding: Tesseract reads
//! the page at its native resolution.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};
use tracing::debug;

use super::types::NormalizedImage;
use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Largest accepted width or height, checked before the pixels are decoded.
/// A few hundred KB of PNG can declare hundreds of megapixels.
pub const MAX_INPUT_DIMENSION: u32 = 4096;

/// Denoising weights below this are treated as zero.
const MIN_NLM_WEIGHT: f64 = 1e-3;

// ═══════════════════════════════════════════════════════════
// Configuration types
// ═══════════════════════════════════════════════════════════

/// Non-local-means parameters.
///
/// Defaults match the common document-OCR setting: `h = 10`, 7x7 template
/// patches compared across a 21x21 search window.
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiseConfig {
    /// Filter strength. Larger removes more noise and more detail.
    pub strength: f32,
    /// Side of the square patch compared between pixels. Odd.
    pub template_window: u32,
    /// Side of the square area searched for similar patches. Odd.
    pub search_window: u32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            strength: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

/// CLAHE parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaheConfig {
    /// Histogram clip limit, relative to a flat histogram. `<= 0` disables clipping.
    pub clip_limit: f32,
    /// Number of tiles along x.
    pub tiles_x: u32,
    /// Number of tiles along y.
    pub tiles_y: u32,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles_x: 8,
            tiles_y: 8,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Service traits
// ═══════════════════════════════════════════════════════════

/// Fixes image orientation from EXIF metadata.
///
/// Phone photos embed rotation in EXIF tag 0x0112. Without correction,
/// portrait photos reach Tesseract sideways and come back as noise.
pub trait OrientationCorrector: Send + Sync {
    /// Correct image orientation based on EXIF metadata.
    ///
    /// `raw_bytes`: Original file bytes (needed for EXIF reading).
    /// `image`: Decoded image (rotation applied here).
    /// Returns the corrected image. No-op if no EXIF or orientation=1.
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage;
}

/// Suppresses sensor and compression noise while keeping stroke edges.
pub trait Denoiser: Send + Sync {
    fn denoise(&self, image: &GrayImage) -> GrayImage;
}

/// Evens out uneven lighting across the page.
pub trait ContrastEnhancer: Send + Sync {
    fn enhance(&self, image: &GrayImage) -> GrayImage;
}

/// Reduces a grayscale image to two levels (0 and 255).
pub trait Binarizer: Send + Sync {
    /// Returns the binarized image and the threshold that was applied.
    fn binarize(&self, image: &GrayImage) -> (GrayImage, u8);
}

/// Prepares raw image bytes for OCR.
///
/// Pure image-to-image transform: no I/O, no engine calls, fully testable.
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<NormalizedImage, ExtractionError>;
}

// ═══════════════════════════════════════════════════════════
// NormalizationPipeline: composes services
// ═══════════════════════════════════════════════════════════

/// Composes independent services into the OCR normalization chain.
///
/// Pipeline flow:
/// 1. Validate bytes (size bounds) and declared dimensions
/// 2. Decode image
/// 3. `orientation.correct()`: fix EXIF rotation
/// 4. Convert to grayscale
/// 5. `denoiser.denoise()`
/// 6. `enhancer.enhance()`
/// 7. `binarizer.binarize()`
pub struct NormalizationPipeline {
    orientation: Box<dyn OrientationCorrector>,
    denoiser: Box<dyn Denoiser>,
    enhancer: Box<dyn ContrastEnhancer>,
    binarizer: Box<dyn Binarizer>,
    max_input_dimension: u32,
}

impl NormalizationPipeline {
    pub fn new(
        orientation: Box<dyn OrientationCorrector>,
        denoiser: Box<dyn Denoiser>,
        enhancer: Box<dyn ContrastEnhancer>,
        binarizer: Box<dyn Binarizer>,
    ) -> Self {
        Self {
            orientation,
            denoiser,
            enhancer,
            binarizer,
            max_input_dimension: MAX_INPUT_DIMENSION,
        }
    }

    /// Reject images whose width or height exceeds `max`.
    pub fn with_max_input_dimension(mut self, max: u32) -> Self {
        self.max_input_dimension = max;
        self
    }

    /// Production pipeline: EXIF fix, NLM (h=10, 7, 21), CLAHE (2.0, 8x8), Otsu.
    pub fn standard() -> Self {
        Self::new(
            Box::new(ExifOrientationCorrector),
            Box::new(NonLocalMeansDenoiser::default()),
            Box::new(ClaheEnhancer::default()),
            Box::new(OtsuBinarizer),
        )
    }
}

impl Default for NormalizationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl ImagePreprocessor for NormalizationPipeline {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<NormalizedImage, ExtractionError> {
        // 1. Validate bytes and declared dimensions
        validate_image_bytes(image_bytes)?;
        validate_image_dimensions(image_bytes, self.max_input_dimension)?;

        // 2. Decode image
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| ExtractionError::ImageRead(format!("Failed to decode image: {e}")))?;

        // 3. Fix EXIF orientation
        let img = self.orientation.correct(image_bytes, img);

        // 4. Grayscale
        let gray = rgb_to_gray(&img.to_rgb8());
        let (w, h) = gray.dimensions();

        // 5-7. Denoise, enhance, binarize
        let denoised = self.denoiser.denoise(&gray);
        let enhanced = self.enhancer.enhance(&denoised);
        let (binary, threshold) = self.binarizer.binarize(&enhanced);

        debug!(
            size = format!("{w}x{h}"),
            threshold,
            "Image normalized for OCR"
        );

        Ok(NormalizedImage {
            image: binary,
            threshold,
        })
    }
}

/// Normalize raw image bytes with the production pipeline.
pub fn normalize_image(image_bytes: &[u8]) -> Result<NormalizedImage, ExtractionError> {
    NormalizationPipeline::standard().preprocess(image_bytes)
}

// ═══════════════════════════════════════════════════════════
// Production implementations
// ═══════════════════════════════════════════════════════════

// ── ExifOrientationCorrector ──────────────────────────────

/// EXIF-based orientation correction for phone photos.
///
/// EXIF orientation values:
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub struct ExifOrientationCorrector;

impl OrientationCorrector for ExifOrientationCorrector {
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        let orientation = read_exif_orientation(raw_bytes);
        apply_orientation(image, orientation)
    }
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// No-op orientation corrector. Returns the image unchanged.
/// Use for scanner output, which never carries a rotation tag.
pub struct NoOpOrientationCorrector;

impl OrientationCorrector for NoOpOrientationCorrector {
    fn correct(&self, _raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        image
    }
}

// ── NonLocalMeansDenoiser ─────────────────────────────────

/// Non-local-means denoiser.
///
/// Every output pixel is a weighted mean of the pixels in its search window,
/// weighted by how similar their surrounding template patches are:
/// `w = exp(-mean_sq_patch_diff / h^2)`.
pub struct NonLocalMeansDenoiser {
    config: DenoiseConfig,
}

impl Default for NonLocalMeansDenoiser {
    fn default() -> Self {
        Self::with_config(DenoiseConfig::default())
    }
}

impl NonLocalMeansDenoiser {
    pub fn with_config(config: DenoiseConfig) -> Self {
        Self { config }
    }
}

impl Denoiser for NonLocalMeansDenoiser {
    fn denoise(&self, image: &GrayImage) -> GrayImage {
        non_local_means(image, &self.config)
    }
}

// ── ClaheEnhancer ─────────────────────────────────────────

pub struct ClaheEnhancer {
    config: ClaheConfig,
}

impl Default for ClaheEnhancer {
    fn default() -> Self {
        Self::with_config(ClaheConfig::default())
    }
}

impl ClaheEnhancer {
    pub fn with_config(config: ClaheConfig) -> Self {
        Self { config }
    }
}

impl ContrastEnhancer for ClaheEnhancer {
    fn enhance(&self, image: &GrayImage) -> GrayImage {
        clahe(image, &self.config)
    }
}

// ── OtsuBinarizer ─────────────────────────────────────────

/// Global binarization with an automatically selected threshold.
pub struct OtsuBinarizer;

impl Binarizer for OtsuBinarizer {
    fn binarize(&self, image: &GrayImage) -> (GrayImage, u8) {
        let threshold = otsu_threshold(image);
        (apply_binary_threshold(image, threshold), threshold)
    }
}

/// Pass-through stage. Lets tests and callers drop a step from the chain.
pub struct NoOpStage;

impl Denoiser for NoOpStage {
    fn denoise(&self, image: &GrayImage) -> GrayImage {
        image.clone()
    }
}

impl ContrastEnhancer for NoOpStage {
    fn enhance(&self, image: &GrayImage) -> GrayImage {
        image.clone()
    }
}

// ═══════════════════════════════════════════════════════════
// Pixel algorithms (reusable)
// ═══════════════════════════════════════════════════════════

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let p = rgb.get_pixel(x, y);
            let luma = (0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32)
                .round()
                .min(255.0) as u8;
            gray.put_pixel(x, y, Luma([luma]));
        }
    }
    gray
}

/// Non-local-means denoising of a grayscale image.
///
/// For each offset in the search window, the squared difference between the
/// image and its shifted copy is summed into an integral image, so every
/// template distance is an O(1) lookup. Cost is O(pixels * search_window^2).
///
/// Weights come from a table indexed by the rounded mean patch distance,
/// cut off once they drop below `MIN_NLM_WEIGHT`.
///
/// Borders are mirrored without repeating the edge pixel (reflect-101).
pub fn non_local_means(img: &GrayImage, config: &DenoiseConfig) -> GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 || config.strength <= 0.0 {
        return img.clone();
    }

    let t = (config.template_window / 2) as usize;
    let s = (config.search_window / 2) as usize;
    let border = t + s;
    let pw = w + 2 * border;
    let ph = h + 2 * border;

    // Padded copy, so neighbor reads never leave the buffer.
    let mut padded = vec![0u8; pw * ph];
    for py in 0..ph {
        let sy = reflect101(py as i64 - border as i64, h);
        for px in 0..pw {
            let sx = reflect101(px as i64 - border as i64, w);
            padded[py * pw + px] = img.get_pixel(sx as u32, sy as u32).0[0];
        }
    }

    // Region covering every template window centered on an image pixel.
    let rw = w + 2 * t;
    let rh = h + 2 * t;
    let origin = border - t;
    let stride = rw + 1;
    let mut integral = vec![0u64; stride * (rh + 1)];

    let template_area = ((2 * t + 1) * (2 * t + 1)) as u64;
    let weights = nlm_weight_table(config.strength);

    let mut weight_sum = vec![0f32; w * h];
    let mut value_sum = vec![0f32; w * h];

    let span = s as isize;
    for dy in -span..=span {
        for dx in -span..=span {
            for ry in 0..rh {
                let py = origin + ry;
                let qy = (py as isize + dy) as usize;
                let mut row_sum = 0u64;
                for rx in 0..rw {
                    let px = origin + rx;
                    let qx = (px as isize + dx) as usize;
                    let d = padded[py * pw + px].abs_diff(padded[qy * pw + qx]) as u64;
                    row_sum += d * d;
                    integral[(ry + 1) * stride + rx + 1] = integral[ry * stride + rx + 1] + row_sum;
                }
            }

            for y in 0..h {
                let y1 = y + 2 * t + 1;
                let ny = (y + border) as isize + dy;
                for x in 0..w {
                    let x1 = x + 2 * t + 1;
                    let ssd = integral[y1 * stride + x1] + integral[y * stride + x]
                        - integral[y * stride + x1]
                        - integral[y1 * stride + x];
                    let dist = ((ssd + template_area / 2) / template_area) as usize;
                    let Some(&weight) = weights.get(dist) else {
                        continue;
                    };

                    let nx = (x + border) as isize + dx;
                    let neighbor = padded[ny as usize * pw + nx as usize] as f32;

                    weight_sum[y * w + x] += weight;
                    value_sum[y * w + x] += weight * neighbor;
                }
            }
        }
    }

    let mut output = GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            // The zero offset always contributes weight 1, so the sum is never zero.
            let v = (value_sum[i] / weight_sum[i]).round().clamp(0.0, 255.0) as u8;
            output.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }
    output
}

/// `exp(-d / h^2)` for every integer mean distance `d` whose weight is still
/// at least `MIN_NLM_WEIGHT`. Longer distances are not in the table.
fn nlm_weight_table(strength: f32) -> Vec<f32> {
    let h2 = strength as f64 * strength as f64;
    let max_dist = (-MIN_NLM_WEIGHT.ln() * h2).floor() as usize;
    (0..=max_dist.min(255 * 255))
        .map(|d| (-(d as f64) / h2).exp() as f32)
        .collect()
}

/// Contrast limited adaptive histogram equalization.
///
/// The image is split into a `tiles_x` x `tiles_y` grid. Each tile gets its own
/// equalization lookup table, built from a histogram clipped at
/// `clip_limit * tile_area / 256` with the excess spread evenly over all bins.
/// Output pixels blend the four nearest tile tables bilinearly.
pub fn clahe(img: &GrayImage, config: &ClaheConfig) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return img.clone();
    }

    let tiles_x = config.tiles_x.clamp(1, w) as usize;
    let tiles_y = config.tiles_y.clamp(1, h) as usize;
    let x_bounds = tile_bounds(w, tiles_x);
    let y_bounds = tile_bounds(h, tiles_y);

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; 256];
            for y in y_bounds[ty]..y_bounds[ty + 1] {
                for x in x_bounds[tx]..x_bounds[tx + 1] {
                    hist[img.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x_bounds[tx + 1] - x_bounds[tx]) * (y_bounds[ty + 1] - y_bounds[ty]);
            if config.clip_limit > 0.0 {
                let limit = ((config.clip_limit * area as f32 / 256.0) as u32).max(1);
                clip_histogram(&mut hist, limit);
            }
            luts[ty * tiles_x + tx] = equalization_lut(&hist, area);
        }
    }

    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;
    let columns: Vec<(usize, usize, f32)> = (0..w)
        .map(|x| interpolation_cell(x as f32 / tile_w - 0.5, tiles_x))
        .collect();

    let mut output = GrayImage::new(w, h);
    for y in 0..h {
        let (ty1, ty2, fy) = interpolation_cell(y as f32 / tile_h - 0.5, tiles_y);
        for x in 0..w {
            let (tx1, tx2, fx) = columns[x as usize];
            let v = img.get_pixel(x, y).0[0] as usize;

            let top = (1.0 - fx) * luts[ty1 * tiles_x + tx1][v] as f32
                + fx * luts[ty1 * tiles_x + tx2][v] as f32;
            let bottom = (1.0 - fx) * luts[ty2 * tiles_x + tx1][v] as f32
                + fx * luts[ty2 * tiles_x + tx2][v] as f32;
            let out = ((1.0 - fy) * top + fy * bottom).round().clamp(0.0, 255.0) as u8;
            output.put_pixel(x, y, Luma([out]));
        }
    }
    output
}

/// Otsu's threshold: the level that maximizes between-class variance.
///
/// Returns 0 for images with a single gray level.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[p.0[0] as usize] += 1;
    }

    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = 0f64;
    let mut weight_bg = 0u64;
    let mut sum_bg = 0f64;

    for t in 0..256usize {
        weight_bg += hist[t];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let diff = mean_bg - mean_fg;
        let variance = weight_bg as f64 * weight_fg as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Binary threshold: pixels strictly above `threshold` become 255, the rest 0.
pub fn apply_binary_threshold(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = img.clone();
    for p in output.pixels_mut() {
        p.0[0] = if p.0[0] > threshold { 255 } else { 0 };
    }
    output
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
/// Rejects clearly invalid input before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageRead(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageRead(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Reject images whose header declares a width or height above `max`.
///
/// Only the header is read; no pixel buffer is allocated. Formats whose
/// dimensions cannot be read up front are left to the decoder.
pub fn validate_image_dimensions(bytes: &[u8], max: u32) -> Result<(), ExtractionError> {
    let reader = match image::io::Reader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(reader) => reader,
        Err(_) => return Ok(()),
    };
    let (width, height) = match reader.into_dimensions() {
        Ok(dims) => dims,
        Err(_) => return Ok(()),
    };

    if width > max || height > max {
        return Err(ExtractionError::ImageRead(format!(
            "Image is {width}x{height}, larger than the {max}x{max} limit"
        )));
    }
    Ok(())
}

/// Encode a grayscale image as PNG bytes.
/// Default compression; the bytes only live for one OCR call.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge.
fn reflect101(i: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as i64;
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

/// Split `0..len` into `tiles` contiguous, non-empty ranges (requires `tiles <= len`).
fn tile_bounds(len: u32, tiles: usize) -> Vec<u32> {
    (0..=tiles)
        .map(|i| (i as u64 * len as u64 / tiles as u64) as u32)
        .collect()
}

/// Clip a histogram at `limit` and spread the excess evenly over all bins.
fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let residual = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }
}

/// Cumulative-histogram lookup table scaled to 0-255.
fn equalization_lut(hist: &[u32; 256], area: u32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }
    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Neighboring tile indices and blend factor for a fractional tile coordinate.
fn interpolation_cell(pos: f32, tiles: usize) -> (usize, usize, f32) {
    let first = pos.floor();
    let fraction = pos - first;
    let last_tile = tiles as i64 - 1;
    let lo = (first as i64).clamp(0, last_tile) as usize;
    let hi = (first as i64 + 1).clamp(0, last_tile) as usize;
    (lo, hi, fraction)
}

// ═══════════════════════════════════════════════════════════
// Mock implementations (testing)
// ═══════════════════════════════════════════════════════════

/// Mock image preprocessor for testing.
/// Returns a small white page without performing actual image processing.
pub struct MockImagePreprocessor {
    fail: bool,
}

impl MockImagePreprocessor {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePreprocessor for MockImagePreprocessor {
    fn preprocess(&self, _image_bytes: &[u8]) -> Result<NormalizedImage, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::ImageRead(
                "Mock preprocessing failure".into(),
            ));
        }

        Ok(NormalizedImage {
            image: GrayImage::from_pixel(32, 32, Luma([255])),
            threshold: 0,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
