use approx::assert_relative_eq;
use nalgebra::*;
use std::sync::Arc;
use factorised::DistrError;
use factorised::distr::*;
use factorised::divergence::*;

fn config(samples : usize) -> DivergenceConfig {
    DivergenceConfig { samples, seed : 11, fallback : true }
}

#[test]
fn monte_carlo_matches_closed_form() {
    let p = Normal::scalar(0., 1.).unwrap().expand(3).unwrap();
    let q = Normal::scalar(1., 1.).unwrap().expand(3).unwrap();
    let exact = kl_divergence(&p, &q).unwrap();
    let estimate = Divergence::empty(config(20_000)).kl(&p, &q).unwrap();
    assert_eq!(estimate.nrows(), 3);
    for (e, m) in exact.iter().zip(estimate.iter()) {
        assert_relative_eq!(*e, 0.5, epsilon = 1E-12);
        assert_relative_eq!(*m, 0.5, epsilon = 0.05);
    }
}

#[test]
fn monte_carlo_is_reproducible() {
    let p = Gamma::scalar(2., 1.).unwrap();
    let q = Normal::scalar(2., 1.).unwrap();
    let div = Divergence::new(config(500));
    assert!(!div.has_rule(&p, &q));
    assert_eq!(div.kl(&p, &q).unwrap(), div.kl(&p, &q).unwrap());
}

#[test]
fn mixed_families_use_fallback() {
    // KL(Gamma(2, 1) || N(2, 1)) = -H(p) - E_p[log q], with E_p[(x - 2)^2] = Var(x) = 2.
    let p = Gamma::scalar(2., 1.).unwrap();
    let q = Normal::scalar(2., 1.).unwrap();
    let expected = -p.entropy().unwrap()[0] + 0.5 * (2. * std::f64::consts::PI).ln() + 1.0;
    let kl = Divergence::new(config(20_000)).kl(&p, &q).unwrap();
    assert_relative_eq!(kl[0], expected, epsilon = 0.05);
}

#[test]
fn composite_divergence_sums_factor_divergences() {
    let p1 = Normal::scalar(0., 1.).unwrap().expand(2).unwrap();
    let q1 = Normal::scalar(1., 1.).unwrap().expand(2).unwrap();
    let p2 = MultiNormal::standard(2).unwrap().expand(2).unwrap();
    let q2 = MultiNormal::new(DVector::from_element(2, 1.), DMatrix::identity(2, 2)).unwrap().expand(2).unwrap();
    let p = Factorised::new(vec![Arc::new(p1), Arc::new(p2)]).unwrap();
    let q = Factorised::new(vec![Arc::new(q1), Arc::new(q2)]).unwrap();
    let kl = kl_divergence(&p, &q).unwrap();
    assert_eq!(kl.nrows(), 2);
    for k in kl.iter() {
        assert_relative_eq!(*k, 1.5, epsilon = 1E-10);
    }
}

#[test]
fn composite_divergence_requires_same_factor_count() {
    let n = || -> Arc<dyn Distribution> { Arc::new(Normal::standard()) };
    let p = Factorised::new(vec![n(), n()]).unwrap();
    let q = Factorised::new(vec![n()]).unwrap();
    assert_eq!(kl_divergence(&p, &q).unwrap_err(), DistrError::FactorCountMismatch { p : 2, q : 1 });
}

#[test]
fn composite_factor_errors_propagate() {
    let config = DivergenceConfig { fallback : false, ..Default::default() };
    let div = Divergence::new(config);
    let p = Factorised::new(vec![Arc::new(Gamma::scalar(2., 1.).unwrap())]).unwrap();
    let q = Factorised::new(vec![Arc::new(Normal::standard())]).unwrap();
    assert_eq!(div.kl(&p, &q).unwrap_err(), DistrError::NoRule { p : "Gamma", q : "Normal" });
}

#[test]
fn registered_rules_take_precedence() {
    let mut div = Divergence::new(config(10));
    div.register(|p : &Gamma, _ : &Normal, _ : &Divergence| Ok(DVector::from_element(p.batch_shape(), 42.)) );
    let p = Gamma::scalar(2., 1.).unwrap();
    let q = Normal::standard();
    assert!(div.has_rule(&p, &q));
    assert_eq!(div.kl(&p, &q).unwrap()[0], 42.);

    // The rule is also found for factors inside composites.
    let fp = Factorised::new(vec![Arc::new(p)]).unwrap();
    let fq = Factorised::new(vec![Arc::new(q)]).unwrap();
    assert_eq!(div.kl(&fp, &fq).unwrap()[0], 42.);
}

#[test]
fn batch_shapes_must_agree() {
    let p = Normal::scalar(0., 1.).unwrap().expand(2).unwrap();
    let q = Normal::scalar(0., 1.).unwrap().expand(3).unwrap();
    assert_eq!(
        kl_divergence(&p, &q).unwrap_err(),
        DistrError::ShapeMismatch { op : "kl_divergence", expected : 2, found : 3 }
    );
}

#[test]
fn config_defaults() {
    let config : DivergenceConfig = serde_json::from_str("{\"samples\" : 50}").unwrap();
    assert_eq!(config, DivergenceConfig { samples : 50, seed : 0, fallback : true });
    assert_eq!(Divergence::default().config(), &DivergenceConfig::default());
}
