use nalgebra::DMatrix;

pub fn normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (2.0 * core::f64::consts::PI * u2).cos()
}

/// `n` rows drawn from an isotropic Gaussian.
pub fn gaussian_blob(rng: &mut fastrand::Rng, n: usize, center: &[f64], std: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(n * center.len());
    for _ in 0..n {
        for &c in center {
            data.push(c + std * normal(rng));
        }
    }
    data
}

/// 450 points from N(0, I) followed by 50 from N((10, 10), 4I).
pub fn contaminated_2d(seed: u64) -> DMatrix<f64> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut data = gaussian_blob(&mut rng, 450, &[0.0, 0.0], 1.0);
    data.extend(gaussian_blob(&mut rng, 50, &[10.0, 10.0], 2.0));
    DMatrix::from_row_slice(500, 2, &data)
}

pub fn linspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| low + (high - low) * i as f64 / (n - 1) as f64)
        .collect()
}

/// Cartesian product of two axes in row-major order.
pub fn grid_points(xs: &[f64], ys: &[f64]) -> DMatrix<f64> {
    let mut data = Vec::with_capacity(xs.len() * ys.len() * 2);
    for &x in xs {
        for &y in ys {
            data.push(x);
            data.push(y);
        }
    }
    DMatrix::from_row_slice(xs.len() * ys.len(), 2, &data)
}
