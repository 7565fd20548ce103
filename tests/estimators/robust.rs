use nalgebra::DMatrix;
use robust_kde::estimator::RobustKde;
use robust_kde::irls::{IrlsSolver, LossShape, RobustLoss};
use robust_kde::kernel::gaussian_gram;
use robust_kde::{Error, FittedModel};

use crate::common::gaussian_blob;

#[test]
fn hampel_without_redescent_equals_huber() {
    for &x in &[0.0, 0.2, 0.5, 1.0, 3.0, 40.0] {
        let hampel = RobustLoss::Hampel {
            a: 0.7,
            b: f64::INFINITY,
            c: f64::INFINITY,
        };
        let huber = RobustLoss::Huber { a: 0.7 };
        assert!((hampel.rho(x) - huber.rho(x)).abs() < 1e-12, "rho at {x}");
        assert!((hampel.psi(x) - huber.psi(x)).abs() < 1e-12, "psi at {x}");
    }
}

#[test]
fn huber_without_threshold_is_linear_influence() {
    let huber = RobustLoss::Huber { a: f64::INFINITY };
    for &x in &[0.0, 0.3, 2.0, 100.0] {
        assert!((huber.psi(x) - x).abs() < 1e-12);
    }
}

#[test]
fn irls_reports_trajectory() {
    let mut rng = fastrand::Rng::with_seed(8);
    let sample = DMatrix::from_row_slice(50, 2, &gaussian_blob(&mut rng, 50, &[0.0, 0.0], 1.0));
    let gram = gaussian_gram(&sample, &sample, 0.5).unwrap();
    let result = IrlsSolver::new()
        .solve(&gram, &LossShape::Huber.with_thresholds(0.5, 0.0, 0.0))
        .unwrap();
    assert_eq!(result.losses.len(), result.iterations + 1);
    assert!(result.iterations <= 100);
    assert!((result.weights.sum() - 1.0).abs() < 1e-9);
}

#[test]
fn loss_names_parse() {
    assert_eq!("hampel".parse::<LossShape>().unwrap(), LossShape::Hampel);
    assert!(matches!(
        "cauchy".parse::<LossShape>(),
        Err(Error::UnknownLoss(_))
    ));
}

#[test]
fn robust_model_evaluates_new_points() {
    let mut rng = fastrand::Rng::with_seed(9);
    let sample = DMatrix::from_row_slice(40, 1, &gaussian_blob(&mut rng, 40, &[0.0], 1.0));
    let eval = DMatrix::from_row_slice(1, 1, &[0.0]);
    let estimate = RobustKde::huber().fit(&sample, &eval, 0.4).unwrap();
    assert!(matches!(estimate.model, FittedModel::Robust(_)));

    let far = DMatrix::from_row_slice(2, 1, &[0.0, 50.0]);
    let density = estimate.model.evaluate(&far).unwrap();
    assert!((density[0] - estimate.density[0]).abs() < 1e-12);
    assert!(density[1] < 1e-100);
}
