use nalgebra::DMatrix;
use robust_kde::KernelShape;
use robust_kde::estimator::plain;
use robust_kde::normalize::grid_area;

use crate::common::{gaussian_blob, grid_points, linspace};

#[test]
fn density_is_non_negative_and_integrates_to_one() {
    let mut rng = fastrand::Rng::with_seed(1);
    let sample = DMatrix::from_row_slice(100, 2, &gaussian_blob(&mut rng, 100, &[0.0, 0.0], 1.0));
    let axis = linspace(-7.0, 7.0, 141);
    let eval = grid_points(&axis, &axis);

    let estimate = plain::fit(&sample, &eval, 0.4, KernelShape::Gaussian).unwrap();
    assert!(estimate.density.iter().all(|&v| v >= 0.0));

    let area = grid_area(&estimate.density, Some(&[axis.clone(), axis])).unwrap();
    assert!((area - 1.0).abs() < 0.02, "area {area}");
}

#[test]
fn every_kernel_shape_integrates_to_one_in_1d() {
    let sample = DMatrix::from_row_slice(4, 1, &[-1.0, 0.0, 0.3, 2.0]);
    let axis = linspace(-6.0, 8.0, 2801);
    let eval = DMatrix::from_row_slice(axis.len(), 1, &axis);
    for kernel in [
        KernelShape::Gaussian,
        KernelShape::Tophat,
        KernelShape::Epanechnikov,
        KernelShape::Exponential,
        KernelShape::Linear,
    ] {
        let estimate = plain::fit(&sample, &eval, 0.5, kernel).unwrap();
        let area = grid_area(&estimate.density, Some(&[axis.clone()])).unwrap();
        assert!((area - 1.0).abs() < 0.02, "{kernel}: area {area}");
    }
}

#[test]
fn kernel_names_parse() {
    assert_eq!("epanechnikov".parse::<KernelShape>().unwrap(), KernelShape::Epanechnikov);
    assert!("cosine".parse::<KernelShape>().is_err());
}
