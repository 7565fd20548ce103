use nalgebra::{DMatrix, DVector};
use robust_kde::estimator::mom::{medoid_index, pointwise_median};
use robust_kde::estimator::{MedianRule, MomKde, plain};
use robust_kde::normalize::{MonteCarlo, Proposal};
use robust_kde::{Error, FittedModel, KernelShape};

use crate::common::{gaussian_blob, grid_points, linspace};

#[test]
fn one_block_pointwise_is_plain_kde() {
    let mut rng = fastrand::Rng::with_seed(3);
    let sample = DMatrix::from_row_slice(80, 2, &gaussian_blob(&mut rng, 80, &[1.0, -1.0], 1.5));
    let axis = linspace(-4.0, 4.0, 9);
    let eval = grid_points(&axis, &axis);

    let plain = plain::fit(&sample, &eval, 0.6, KernelShape::Gaussian).unwrap();
    let mom = MomKde::new()
        .blocks(1)
        .normalize(false)
        .seed(9)
        .fit(&sample, &eval, 0.6, 0.2, None)
        .unwrap();

    assert!((&mom.density - &plain.density).norm() < 1e-12);
}

#[test]
fn geometric_median_of_identical_vectors() {
    let v = DVector::from_vec(vec![0.3, 0.0, 1.7, 0.2]);
    let vectors = vec![v.clone(); 7];
    assert_eq!(vectors[medoid_index(&vectors).unwrap()], v);
    assert_eq!(pointwise_median(&vectors).unwrap(), v);
}

#[test]
fn unknown_median_rule_is_rejected() {
    assert!(matches!(
        "average".parse::<MedianRule>(),
        Err(Error::UnknownMedianRule(_))
    ));
}

#[test]
fn too_many_blocks_is_rejected() {
    let sample = DMatrix::from_row_slice(6, 1, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    let eval = DMatrix::from_row_slice(1, 1, &[0.0]);
    assert!(matches!(
        MomKde::new().blocks(4).fit(&sample, &eval, 0.5, 0.1, None),
        Err(Error::InvalidBlockCount { blocks: 4, samples: 6 })
    ));
}

#[test]
fn uniform_and_kde_proposals_agree() {
    let mut rng = fastrand::Rng::with_seed(4);
    let sample = DMatrix::from_row_slice(60, 2, &gaussian_blob(&mut rng, 60, &[0.0, 0.0], 1.0));
    let eval = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);

    let area_with = |proposal| {
        let estimate = MomKde::new()
            .monte_carlo(MonteCarlo::new().n_samples(40_000).proposal(proposal))
            .seed(5)
            .fit(&sample, &eval, 0.5, 0.1, None)
            .unwrap();
        let FittedModel::MedianOfMeans(model) = estimate.model else {
            panic!("expected a median-of-means model");
        };
        model.area()
    };

    let uniform = area_with(Proposal::Uniform);
    let kde = area_with(Proposal::Kde { bandwidth: 1.0 });
    assert!((uniform - kde).abs() < 0.1 * kde, "uniform {uniform}, kde {kde}");
}

#[test]
fn injected_rng_makes_fits_reproducible() {
    let mut rng = fastrand::Rng::with_seed(6);
    let sample = DMatrix::from_row_slice(40, 1, &gaussian_blob(&mut rng, 40, &[0.0], 1.0));
    let eval = DMatrix::from_row_slice(2, 1, &[0.0, 0.5]);
    let cfg = MomKde::new()
        .median(MedianRule::Geometric)
        .monte_carlo(MonteCarlo::new().n_samples(2000));

    let a = cfg
        .fit_with_rng(&sample, &eval, 0.4, 0.1, None, &mut fastrand::Rng::with_seed(77))
        .unwrap();
    let b = cfg
        .fit_with_rng(&sample, &eval, 0.4, 0.1, None, &mut fastrand::Rng::with_seed(77))
        .unwrap();
    assert_eq!(a.density, b.density);
}
