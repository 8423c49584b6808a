#![forbid(unsafe_code)]

//! Exact Euclidean signed distance fields for coverage bitmaps.
//!
//! Two squared-distance grids are seeded from coverage: `outer` holds the distance to the
//! nearest covered pixel, `inner` the distance to the nearest uncovered one. Each grid goes
//! through a separable 1-D lower-envelope transform (rows, then columns) and the signed
//! difference is encoded into one byte per pixel:
//!
//! ```text
//! value = clamp(round(255 - 255 * ((sqrt(outer) - sqrt(inner)) / radius + cutoff)), 0, 255)
//! ```
//!
//! Covered pixels therefore encode high and the value falls off with distance, reaching 0
//! roughly `radius` pixels outside the shape.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

use pulse_core::{BitmapImage, ConfigError, DistanceFieldConfig, PixelFormat};

/// Finite stand-in for +∞; keeps parabola intersections finite.
pub const INF: f64 = 1e20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFieldParams {
    /// Spread in pixels. Must be finite and positive.
    pub radius: f64,
    pub cutoff: f64,
    /// Transparent border added on every side of the output.
    pub padding: u32,
}

impl Default for DistanceFieldParams {
    fn default() -> Self {
        Self {
            radius: 8.0,
            cutoff: 0.25,
            padding: 0,
        }
    }
}

impl From<&DistanceFieldConfig> for DistanceFieldParams {
    fn from(cfg: &DistanceFieldConfig) -> Self {
        Self {
            radius: cfg.radius,
            cutoff: cfg.cutoff,
            padding: cfg.padding,
        }
    }
}

impl DistanceFieldParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::invalid(
                "sdf.radius",
                format!("must be finite and positive (got {})", self.radius),
            ));
        }
        if !self.cutoff.is_finite() {
            return Err(ConfigError::invalid(
                "sdf.cutoff",
                format!("must be finite (got {})", self.cutoff),
            ));
        }
        Ok(())
    }
}

/// Reusable transformer. Scratch buffers grow to the largest bitmap seen.
#[derive(Debug, Clone)]
pub struct DistanceField {
    params: DistanceFieldParams,
    outer: Vec<f64>,
    inner: Vec<f64>,
    scratch: Envelope,
}

impl DistanceField {
    pub fn new(params: DistanceFieldParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            params,
            outer: Vec::new(),
            inner: Vec::new(),
            scratch: Envelope::default(),
        })
    }

    pub fn params(&self) -> &DistanceFieldParams {
        &self.params
    }

    /// Encode `bitmap`'s coverage as a `Luma8` distance field of size
    /// `(width + 2 * padding) x (height + 2 * padding)`.
    pub fn transform(&mut self, bitmap: &BitmapImage) -> Result<BitmapImage, ConfigError> {
        let pad = self.params.padding as usize;
        let (w, h) = (bitmap.width() as usize, bitmap.height() as usize);
        let (gw, gh) = (w + 2 * pad, h + 2 * pad);
        let len = gw * gh;

        // Padding is transparent.
        self.outer.clear();
        self.outer.resize(len, INF);
        self.inner.clear();
        self.inner.resize(len, 0.0);

        for y in 0..h {
            for x in 0..w {
                let a = bitmap.coverage(x as u32, y as u32);
                let j = (y + pad) * gw + x + pad;
                if a >= 1.0 {
                    self.outer[j] = 0.0;
                    self.inner[j] = INF;
                } else if a > 0.0 {
                    let d = 0.5 - a;
                    self.outer[j] = if d > 0.0 { d * d } else { 0.0 };
                    self.inner[j] = if d < 0.0 { d * d } else { 0.0 };
                }
            }
        }

        edt_2d(&mut self.outer, gw, gh, &mut self.scratch);
        edt_2d(&mut self.inner, gw, gh, &mut self.scratch);

        let DistanceFieldParams { radius, cutoff, .. } = self.params;
        let bytes = self
            .outer
            .iter()
            .zip(&self.inner)
            .map(|(&o, &i)| {
                let d = o.sqrt() - i.sqrt();
                (255.0 - 255.0 * (d / radius + cutoff)).round().clamp(0.0, 255.0) as u8
            })
            .collect();

        BitmapImage::new(gw as u32, gh as u32, PixelFormat::Luma8, bytes)
    }
}

/// One-shot [`DistanceField::transform`].
pub fn distance_field(
    bitmap: &BitmapImage,
    params: DistanceFieldParams,
) -> Result<BitmapImage, ConfigError> {
    DistanceField::new(params)?.transform(bitmap)
}

/// In-place 1-D squared distance transform of `f` (squared distances, [`INF`] for "no seed").
///
/// Afterwards `f[q] = min_r (f[r] + (q - r)^2)`.
pub fn edt_1d(f: &mut [f64]) {
    let mut env = Envelope::default();
    let n = f.len();
    env.run(f, 0, 1, n);
}

// -------------------------------------------------------------------------------------------------
// Lower envelope of parabolas
// -------------------------------------------------------------------------------------------------

fn edt_2d(grid: &mut [f64], width: usize, height: usize, env: &mut Envelope) {
    for y in 0..height {
        env.run(grid, y * width, 1, width);
    }
    for x in 0..width {
        env.run(grid, x, width, height);
    }
}

#[derive(Debug, Clone, Default)]
struct Envelope {
    /// Samples of the line being transformed.
    f: Vec<f64>,
    /// Parabola vertices in the envelope.
    v: Vec<usize>,
    /// Boundaries between consecutive envelope parabolas.
    z: Vec<f64>,
}

impl Envelope {
    fn run(&mut self, grid: &mut [f64], offset: usize, stride: usize, length: usize) {
        if length == 0 {
            return;
        }
        self.f.clear();
        self.f
            .extend((0..length).map(|q| grid[offset + q * stride]));
        self.v.clear();
        self.v.resize(length, 0);
        self.z.clear();
        self.z.resize(length + 1, 0.0);

        let (f, v, z) = (&self.f, &mut self.v, &mut self.z);
        let mut k = 0usize;
        z[0] = -INF;
        z[1] = INF;

        for q in 1..length {
            let qf = q as f64;
            let mut s;
            loop {
                let r = v[k];
                let rf = r as f64;
                s = (f[q] - f[r] + qf * qf - rf * rf) / (qf - rf) / 2.0;
                if s <= z[k] && k > 0 {
                    k -= 1;
                } else {
                    break;
                }
            }
            // With k == 0 and s <= z[0] the new parabola replaces the first one.
            if s <= z[k] {
                v[k] = q;
                z[k] = -INF;
                z[k + 1] = INF;
                continue;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = INF;
        }

        k = 0;
        for q in 0..length {
            let qf = q as f64;
            while z[k + 1] < qf {
                k += 1;
            }
            let r = v[k];
            let qr = qf - r as f64;
            grid[offset + q * stride] = f[r] + qr * qr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luma(width: u32, height: u32, opaque: &[(u32, u32)]) -> BitmapImage {
        let mut img = BitmapImage::blank(width, height, PixelFormat::Luma8);
        for &(x, y) in opaque {
            img.set_luma(x, y, 255);
        }
        img
    }

    fn brute_force(f: &[f64]) -> Vec<f64> {
        (0..f.len())
            .map(|q| {
                f.iter()
                    .enumerate()
                    .map(|(r, &fr)| fr + (q as f64 - r as f64).powi(2))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    #[test]
    fn edt_1d_matches_brute_force() {
        let cases: [&[f64]; 5] = [
            &[INF, INF, 0.0, INF, INF, INF, INF],
            &[0.0, INF, INF, INF, INF, INF, 0.0],
            &[4.0, INF, 0.25, INF, 9.0, 0.0, INF, INF],
            &[0.0, 0.0, 0.0],
            &[INF],
        ];
        for case in cases {
            let mut f = case.to_vec();
            edt_1d(&mut f);
            let expect = brute_force(case);
            for (q, (got, want)) in f.iter().zip(&expect).enumerate() {
                assert!(
                    (got - want).abs() <= 1e-6 * want.max(1.0),
                    "{case:?} at {q}: {got} vs {want}"
                );
            }
        }
    }

    #[test]
    fn edt_2d_matches_nearest_seed_search() {
        let (width, height) = (11usize, 7usize);
        let mut state = 0x2545_f491u32;
        for _ in 0..20 {
            let mut grid = vec![INF; width * height];
            let mut seeds = Vec::new();
            for (i, cell) in grid.iter_mut().enumerate() {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                if (state >> 16) % 5 == 0 {
                    *cell = 0.0;
                    seeds.push((i % width, i / width));
                }
            }
            if seeds.is_empty() {
                continue;
            }

            let mut env = Envelope::default();
            edt_2d(&mut grid, width, height, &mut env);

            for y in 0..height {
                for x in 0..width {
                    let want = seeds
                        .iter()
                        .map(|&(sx, sy)| {
                            let dx = x as f64 - sx as f64;
                            let dy = y as f64 - sy as f64;
                            dx * dx + dy * dy
                        })
                        .fold(f64::INFINITY, f64::min);
                    assert_eq!(grid[y * width + x], want, "({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn edt_1d_single_seed_is_squared_distance() {
        let mut f = vec![INF; 9];
        f[4] = 0.0;
        edt_1d(&mut f);
        for (q, v) in f.iter().enumerate() {
            let d = q as f64 - 4.0;
            assert_eq!(*v, d * d);
        }
    }

    #[test]
    fn all_transparent_is_uniform() {
        let out = distance_field(&luma(6, 6, &[]), DistanceFieldParams::default()).unwrap();
        assert_eq!(out.format(), PixelFormat::Luma8);
        assert!(out.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn single_pixel_falls_off_with_distance() {
        let (n, c) = (15u32, 7u32);
        let out = distance_field(&luma(n, n, &[(c, c)]), DistanceFieldParams::default()).unwrap();
        let at = |x: u32, y: u32| out.bytes()[(y * n + x) as usize];

        // Center: inside by one pixel.
        assert_eq!(at(c, c), 223);
        // Along the row the value is non-increasing and hits 0 within the radius band.
        let row: Vec<u8> = (c..n).map(|x| at(x, c)).collect();
        assert!(row.windows(2).all(|w| w[0] >= w[1]), "{row:?}");
        assert!(row[1] < row[0]);
        assert_eq!(*row.last().unwrap_or(&1), 0);

        // Ordered by Euclidean distance, every pixel is non-increasing.
        let mut by_distance: Vec<(u32, u8)> = (0..n)
            .flat_map(|y| (0..n).map(move |x| (x, y)))
            .map(|(x, y)| {
                let dx = x.abs_diff(c);
                let dy = y.abs_diff(c);
                (dx * dx + dy * dy, at(x, y))
            })
            .collect();
        by_distance.sort();
        assert!(by_distance.windows(2).all(|w| w[0].1 >= w[1].1));

        // Symmetric about the seed.
        assert_eq!(at(c - 3, c), at(c + 3, c));
        assert_eq!(at(c, c - 2), at(c + 2, c));
    }

    #[test]
    fn padding_grows_output() {
        let params = DistanceFieldParams {
            padding: 3,
            ..DistanceFieldParams::default()
        };
        let out = distance_field(&luma(4, 2, &[(1, 1)]), params).unwrap();
        assert_eq!((out.width(), out.height()), (10, 8));
        // Seed moved by the padding.
        assert_eq!(out.bytes()[(4 * 10 + 4) as usize], 223);
    }

    #[test]
    fn rgba_uses_alpha() {
        let img = BitmapImage::new(
            3,
            1,
            PixelFormat::Rgba8,
            vec![255, 255, 255, 0, 0, 0, 0, 255, 255, 255, 255, 0],
        )
        .unwrap();
        let out = distance_field(&img, DistanceFieldParams::default()).unwrap();
        assert_eq!(out.bytes()[1], 223);
        assert!(out.bytes()[0] < 223);
    }

    #[test]
    fn half_coverage_sits_on_the_edge() {
        let mut img = luma(1, 1, &[]);
        img.set_luma(0, 0, 128);
        let out = distance_field(&img, DistanceFieldParams::default()).unwrap();
        // d ~ 0: 255 * (1 - cutoff)
        let v = out.bytes()[0];
        assert!((190..=192).contains(&v), "{v}");
    }

    #[test]
    fn rejects_bad_radius() {
        let params = DistanceFieldParams {
            radius: 0.0,
            ..DistanceFieldParams::default()
        };
        let err = DistanceField::new(params).unwrap_err();
        assert!(err.to_string().contains("sdf.radius"));
    }

    #[test]
    fn transformer_is_reusable() {
        let mut sdf = DistanceField::new(DistanceFieldParams::default()).unwrap();
        let big = sdf.transform(&luma(9, 9, &[(4, 4)])).unwrap();
        let small = sdf.transform(&luma(3, 3, &[(1, 1)])).unwrap();
        assert_eq!(small.bytes().len(), 9);
        assert_eq!(small.bytes()[4], big.bytes()[4 * 9 + 4]);
    }
}
