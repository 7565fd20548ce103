use nalgebra::DMatrix;
use robust_kde::estimator::Spkde;
use robust_kde::qp::SmoSolver;
use robust_kde::{Error, FittedModel};

use crate::common::gaussian_blob;

#[test]
fn weights_stay_on_simplex() {
    let mut rng = fastrand::Rng::with_seed(10);
    let mut data = gaussian_blob(&mut rng, 70, &[0.0, 0.0], 1.0);
    data.extend(gaussian_blob(&mut rng, 10, &[6.0, -6.0], 0.5));
    let sample = DMatrix::from_row_slice(80, 2, &data);
    let eval = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);

    for frac in [0.0, 0.01, 0.125, 0.3, 0.6, 0.95] {
        let estimate = Spkde::new().fit(&sample, &eval, 0.6, frac).unwrap();
        let FittedModel::Qp(model) = &estimate.model else {
            panic!("expected a qp model");
        };
        let a = model.weights();
        assert!(a.iter().all(|&v| v >= -1e-9), "negative weight at {frac}");
        assert!((a.sum() - 1.0).abs() < 1e-9, "sum {} at {frac}", a.sum());
    }
}

#[test]
fn solver_cap_surfaces_as_error() {
    let mut rng = fastrand::Rng::with_seed(11);
    let sample = DMatrix::from_row_slice(30, 1, &gaussian_blob(&mut rng, 30, &[0.0], 1.0));
    let eval = DMatrix::from_row_slice(1, 1, &[0.0]);
    let spkde = Spkde::with_solver(SmoSolver::new().tolerance(0.0).max_iter(1));
    assert!(matches!(
        spkde.fit(&sample, &eval, 0.5, 0.3),
        Err(Error::QpNotConverged { .. })
    ));
}
