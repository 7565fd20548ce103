//! A 2-D sample with 10% of its points in a distant, diffuse cluster.

use nalgebra::DMatrix;
use robust_kde::estimator::{MedianRule, MomKde, RobustKde, Spkde, plain};
use robust_kde::normalize::MonteCarlo;
use robust_kde::{DensityModel, EstimatorKind, KernelShape};

use crate::common::{contaminated_2d, grid_points, linspace};

const BANDWIDTH: f64 = 0.5;
const OUTLIER_FRACTION: f64 = 0.1;

fn probe() -> DMatrix<f64> {
    DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 10.0, 10.0])
}

#[test]
fn robust_estimators_suppress_the_outlier_cluster() {
    let sample = contaminated_2d(42);
    let eval = probe();
    let reference = plain::fit(&sample, &eval, BANDWIDTH, KernelShape::Gaussian).unwrap();
    let at_cluster = reference.density[1];
    assert!(at_cluster > 0.0);

    let hampel = RobustKde::hampel().fit(&sample, &eval, BANDWIDTH).unwrap();
    assert!(hampel.density[1] < at_cluster, "hampel");

    let huber = RobustKde::huber().fit(&sample, &eval, BANDWIDTH).unwrap();
    assert!(huber.density[1] < at_cluster, "huber");

    let spkde = Spkde::new()
        .fit(&sample, &eval, BANDWIDTH, OUTLIER_FRACTION)
        .unwrap();
    assert!(spkde.density[1] < at_cluster, "spkde");

    // about a third of the 101 blocks hold a cluster point, so the
    // pointwise median at the cluster comes from clean blocks
    let mom = MomKde::new()
        .median(MedianRule::Pointwise)
        .monte_carlo(MonteCarlo::new().n_samples(20_000))
        .seed(3)
        .fit(&sample, &eval, BANDWIDTH, OUTLIER_FRACTION, None)
        .unwrap();
    assert!(mom.density[1] < at_cluster, "mom");
    assert!(mom.density[0] > 0.0);
}

#[test]
fn divergences_against_inlier_density_are_finite() {
    let sample = contaminated_2d(7);
    let axis = linspace(-4.0, 14.0, 37);
    let eval = grid_points(&axis, &axis);
    let grid = [axis.clone(), axis];

    let truth: Vec<f64> = eval
        .row_iter()
        .map(|row| {
            let r2 = row[0] * row[0] + row[1] * row[1];
            (-0.5 * r2).exp() / (2.0 * core::f64::consts::PI)
        })
        .collect();

    for kind in EstimatorKind::ALL {
        let mut model =
            DensityModel::new(kind, OUTLIER_FRACTION, KernelShape::Gaussian, BANDWIDTH).seed(1);
        model.fit(&sample, &eval, Some(&grid)).unwrap();
        let scores = model.compute_score(&truth).unwrap();
        for value in [
            scores.kl_true_estimate,
            scores.kl_estimate_true,
            scores.jensen_shannon,
        ] {
            assert!(value.is_finite() && value >= 0.0, "{kind}: {scores:?}");
        }
    }
}
