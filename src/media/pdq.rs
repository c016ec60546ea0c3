//! 256-bit perceptual hashing with dihedral variants.
//!
//! The fingerprint is a 16x16 sign matrix of low-frequency DCT coefficients
//! computed over a 64x64 luminance downsample, thresholded at the median.
//! Visually similar inputs land within a small Hamming distance of each
//! other; the 8 dihedral transforms (identity, 3 rotations, 4 reflections)
//! let rotated and mirrored copies still match.

use image::RgbImage;
use std::fmt;

const HASH_BITS: usize = 256;
const DOWNSAMPLE_DIM: usize = 64;
const DCT_DIM: usize = 16;

/// A 256-bit perceptual fingerprint with Hamming-distance comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash256 {
    words: [u64; 4],
}

impl Hash256 {
    pub fn from_words(words: [u64; 4]) -> Self {
        Self { words }
    }

    fn set_bit(&mut self, bit: usize) {
        self.words[(bit & 255) >> 6] |= 1 << (bit & 63);
    }

    /// Number of differing bits, in `0..=256`. Cheap enough to use for
    /// pruning without normalization.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Normalized similarity in `[0, 1]`; 1.0 means identical.
    pub fn distance_normalized(&self, other: &Self) -> f32 {
        1.0 - self.hamming_distance(other) as f32 / HASH_BITS as f32
    }

    pub fn to_hex(&self) -> String {
        format!(
            "{:016x}{:016x}{:016x}{:016x}",
            self.words[3], self.words[2], self.words[1], self.words[0]
        )
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 {
            return None;
        }
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let end = 64 - i * 16;
            *word = u64::from_str_radix(&hex[end - 16..end], 16).ok()?;
        }
        Some(Self { words })
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

/// The 8 hashes of one input under the dihedral symmetry group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DihedralHashes {
    variants: [Hash256; 8],
}

impl DihedralHashes {
    /// The identity-orientation hash.
    pub fn primary(&self) -> Hash256 {
        self.variants[0]
    }

    pub fn variants(&self) -> &[Hash256; 8] {
        &self.variants
    }
}

/// Hash a decoded RGB image.
pub fn hash_rgb_image(image: &RgbImage) -> DihedralHashes {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let luma: Vec<f32> = image
        .pixels()
        .map(|p| {
            // Rec.601 luma, matching common perceptual hash implementations.
            0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32
        })
        .collect();
    hash_luma(&luma, width, height)
}

/// Hash a raw 8-bit luminance plane, e.g. a decoded video frame.
pub fn hash_luma_plane(luma: &[u8], width: usize, height: usize) -> DihedralHashes {
    let luma: Vec<f32> = luma.iter().map(|&v| v as f32).collect();
    hash_luma(&luma, width, height)
}

fn hash_luma(luma: &[f32], width: usize, height: usize) -> DihedralHashes {
    let plane = downsample(luma, width, height);
    let table = dct_table();
    let variants = std::array::from_fn(|i| hash_plane(&transform(&plane, i), &table));
    DihedralHashes { variants }
}

/// Box-average the source into a 64x64 plane. Sources smaller than 64 pixels
/// in a dimension repeat pixels instead of leaving cells empty.
fn downsample(luma: &[f32], width: usize, height: usize) -> Vec<f32> {
    let dim = DOWNSAMPLE_DIM;
    let mut out = vec![0.0f32; dim * dim];
    if width == 0 || height == 0 {
        return out;
    }
    for row in 0..dim {
        let y0 = (row * height / dim).min(height - 1);
        let y1 = ((row + 1) * height / dim).clamp(y0 + 1, height.max(y0 + 1));
        for col in 0..dim {
            let x0 = (col * width / dim).min(width - 1);
            let x1 = ((col + 1) * width / dim).clamp(x0 + 1, width.max(x0 + 1));
            let mut sum = 0.0f32;
            for y in y0..y1.min(height) {
                for x in x0..x1.min(width) {
                    sum += luma[y * width + x];
                }
            }
            let count = (y1.min(height) - y0) * (x1.min(width) - x0);
            out[row * dim + col] = sum / count.max(1) as f32;
        }
    }
    out
}

/// Apply one of the 8 dihedral transforms to a 64x64 plane.
/// Order: identity, rot90, rot180, rot270, flip-x, flip-y, transpose,
/// anti-transpose.
fn transform(plane: &[f32], variant: usize) -> Vec<f32> {
    let dim = DOWNSAMPLE_DIM;
    let last = dim - 1;
    let mut out = vec![0.0f32; dim * dim];
    for row in 0..dim {
        for col in 0..dim {
            let (src_row, src_col) = match variant {
                0 => (row, col),
                1 => (last - col, row),
                2 => (last - row, last - col),
                3 => (col, last - row),
                4 => (row, last - col),
                5 => (last - row, col),
                6 => (col, row),
                _ => (last - col, last - row),
            };
            out[row * dim + col] = plane[src_row * dim + src_col];
        }
    }
    out
}

/// Cosine basis for the 16 lowest non-DC frequencies over 64 samples.
fn dct_table() -> Vec<[f32; DOWNSAMPLE_DIM]> {
    let mut table = Vec::with_capacity(DCT_DIM);
    for u in 1..=DCT_DIM {
        let mut row = [0.0f32; DOWNSAMPLE_DIM];
        for (x, value) in row.iter_mut().enumerate() {
            *value = (std::f32::consts::PI / DOWNSAMPLE_DIM as f32
                * (x as f32 + 0.5)
                * u as f32)
                .cos();
        }
        table.push(row);
    }
    table
}

/// 16x16 DCT-II of the plane (DC row/column dropped), thresholded at the
/// median coefficient.
fn hash_plane(plane: &[f32], table: &[[f32; DOWNSAMPLE_DIM]]) -> Hash256 {
    let dim = DOWNSAMPLE_DIM;

    // Separable DCT: rows first, then columns.
    let mut rows = vec![0.0f32; DCT_DIM * dim];
    for u in 0..DCT_DIM {
        for y in 0..dim {
            let mut sum = 0.0f32;
            for x in 0..dim {
                sum += plane[x * dim + y] * table[u][x];
            }
            rows[u * dim + y] = sum;
        }
    }

    let mut coefficients = [0.0f32; HASH_BITS];
    for u in 0..DCT_DIM {
        for v in 0..DCT_DIM {
            let mut sum = 0.0f32;
            for y in 0..dim {
                sum += rows[u * dim + y] * table[v][y];
            }
            coefficients[u * DCT_DIM + v] = sum;
        }
    }

    let mut sorted = coefficients;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = (sorted[HASH_BITS / 2 - 1] + sorted[HASH_BITS / 2]) / 2.0;

    let mut hash = Hash256::default();
    for (bit, &coefficient) in coefficients.iter().enumerate() {
        if coefficient > median {
            hash.set_bit(bit);
        }
    }
    hash
}
