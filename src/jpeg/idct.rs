//! Zig-zag ordering and the 8x8 inverse DCT.

/// Natural (row major) index of each zig-zag position.
pub const ZIGZAG: [usize; 64] = [
  0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20, 13, 6, 7, 14, 21,
  28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59, 52, 45, 38, 31, 39, 46, 53, 60, 61,
  54, 47, 55, 62, 63,
];

/// A separable inverse DCT with a precomputed cosine basis.
#[derive(Debug, Clone)]
pub(crate) struct Idct {
  /// `basis[x * 8 + u] = C(u) * cos((2x + 1) * u * pi / 16)`, with
  /// `C(0) = 1/sqrt(2)` and `C(u) = 1` otherwise.
  basis: [f64; 64],
}
impl Idct {
  pub fn new() -> Self {
    let mut basis = [0.0; 64];
    for x in 0..8 {
      for u in 0..8 {
        let c = if u == 0 { core::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
        let angle = ((2 * x + 1) * u) as f64 * core::f64::consts::PI / 16.0;
        basis[x * 8 + u] = c * angle.cos();
      }
    }
    Self { basis }
  }

  /// Transforms dequantized coefficients in natural order into centered
  /// samples (level shift not applied).
  pub fn transform(&self, coefficients: &[i32; 64], out: &mut [f32; 64]) {
    // rows: tmp[v][x] = sum_u basis(x, u) * F[v][u]
    let mut tmp = [0.0_f64; 64];
    for v in 0..8 {
      let row = &coefficients[v * 8..v * 8 + 8];
      if row.iter().all(|&c| c == 0) {
        continue;
      }
      for x in 0..8 {
        let b = &self.basis[x * 8..x * 8 + 8];
        tmp[v * 8 + x] = row.iter().zip(b).map(|(&c, &k)| f64::from(c) * k).sum();
      }
    }
    // columns
    for y in 0..8 {
      let b = &self.basis[y * 8..y * 8 + 8];
      for x in 0..8 {
        let s: f64 = (0..8).map(|v| b[v] * tmp[v * 8 + x]).sum();
        out[y * 8 + x] = (s / 4.0) as f32;
      }
    }
  }
}
