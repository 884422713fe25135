use approx::assert_relative_eq;
use nalgebra::*;
use factorised::distr::*;
use statrs::distribution::Continuous;
use statrs::statistics::Distribution as _;

const EPS : f64 = 10E-8;

#[test]
fn normal() {
    for (loc, scale) in [(0.0, 1.0), (1.5, 0.3), (-2.0, 4.0)].iter() {
        let n = Normal::scalar(*loc, *scale).unwrap();
        let reference = statrs::distribution::Normal::new(*loc, *scale).unwrap();
        for x in (-10..10).map(|x| 0.5 * x as f64) {
            let ym = DMatrix::from_element(1, 1, x);
            let lp = n.log_prob((&ym).into()).unwrap();
            assert_relative_eq!(lp[0], reference.ln_pdf(x), epsilon = EPS);
        }
        assert_relative_eq!(n.entropy().unwrap()[0], reference.entropy().unwrap(), epsilon = EPS);
    }
}

#[test]
fn gamma() {
    for (shape, rate) in [(1.0, 1.0), (2.5, 0.5), (0.7, 3.0)].iter() {
        let g = Gamma::scalar(*shape, *rate).unwrap();
        let reference = statrs::distribution::Gamma::new(*shape, *rate).unwrap();
        for x in (1..20).map(|x| 0.25 * x as f64) {
            let ym = DMatrix::from_element(1, 1, x);
            let lp = g.log_prob((&ym).into()).unwrap();
            assert_relative_eq!(lp[0], reference.ln_pdf(x), epsilon = EPS);
        }
        assert_relative_eq!(g.entropy().unwrap()[0], reference.entropy().unwrap(), epsilon = EPS);
        assert_relative_eq!(g.mean().unwrap()[(0, 0)], shape / rate, epsilon = EPS);
    }
    let g = Gamma::scalar(2., 1.).unwrap();
    let ym = DMatrix::from_element(1, 1, -1.0);
    assert_eq!(g.log_prob((&ym).into()).unwrap()[0], std::f64::NEG_INFINITY);
}

#[test]
fn multinormal() {
    let mu = DVector::from_column_slice(&[1., -1.]);
    let sigma = DMatrix::from_row_slice(2, 2, &[2., 0.5, 0.5, 1.]);
    let mn = MultiNormal::new(mu.clone(), sigma.clone()).unwrap();
    let x = DVector::from_column_slice(&[0.3, 0.2]);

    let xc = &x - &mu;
    let inv = sigma.clone().try_inverse().unwrap();
    let maha = (xc.transpose() * inv * &xc)[0];
    let expected = -0.5 * maha - (2. * std::f64::consts::PI).ln() - 0.5 * sigma.determinant().ln();

    let ym = x.transpose();
    let lp = mn.log_prob((&ym).into()).unwrap();
    assert_relative_eq!(lp[0], expected, epsilon = EPS);

    let h = 1. + (2. * std::f64::consts::PI).ln() + 0.5 * sigma.determinant().ln();
    assert_relative_eq!(mn.entropy().unwrap()[0], h, epsilon = EPS);
    assert_eq!(mn.variance().unwrap(), DMatrix::from_row_slice(1, 2, &[2., 1.]));
}

#[test]
fn dirichlet() {
    // Dir(a, b) over two categories is a Beta(a, b) on the first coordinate.
    let d = Dirichlet::new(DVector::from_column_slice(&[2., 3.])).unwrap();
    let reference = statrs::distribution::Beta::new(2., 3.).unwrap();
    for x in (1..10).map(|x| 0.1 * x as f64) {
        let ym = DMatrix::from_row_slice(1, 2, &[x, 1. - x]);
        let lp = d.log_prob((&ym).into()).unwrap();
        assert_relative_eq!(lp[0], reference.ln_pdf(x), epsilon = EPS);
    }
    assert_relative_eq!(d.mean().unwrap()[(0, 0)], 0.4, epsilon = EPS);
    assert_relative_eq!(d.variance().unwrap()[(0, 0)], 6. / (25. * 6.), epsilon = EPS);
}

#[test]
fn expanded_parameters_repeat_over_batch() {
    let n = Normal::scalar(1., 2.).unwrap().expand(4).unwrap();
    assert_eq!(n.batch_shape(), 4);
    assert_eq!(n.event_shape(), None);
    assert_eq!(n.mean().unwrap(), DMatrix::from_element(4, 1, 1.));

    let d = Dirichlet::new(DVector::from_element(3, 2.)).unwrap().expand(4).unwrap();
    assert_eq!(d.alpha().shape(), (4, 3));
    assert_eq!(d.entropy().unwrap().nrows(), 4);
}

#[test]
fn closed_form_divergences() {
    let p = Normal::scalar(0., 1.).unwrap();
    let q = Normal::scalar(1., 1.).unwrap();
    assert_relative_eq!(p.kl(&q).unwrap()[0], 0.5, epsilon = EPS);

    let p = Normal::scalar(0., 1.).unwrap();
    let q = Normal::scalar(0., 2.).unwrap();
    assert_relative_eq!(p.kl(&q).unwrap()[0], 2f64.ln() + 1. / 8. - 0.5, epsilon = EPS);

    // Same covariance: the divergence reduces to half the Mahalanobis distance.
    let p = MultiNormal::standard(2).unwrap();
    let q = MultiNormal::new(DVector::from_column_slice(&[1., 1.]), DMatrix::identity(2, 2)).unwrap();
    assert_relative_eq!(p.kl(&q).unwrap()[0], 1.0, epsilon = EPS);

    let g = Gamma::scalar(2., 3.).unwrap();
    assert_relative_eq!(g.kl(&g).unwrap()[0], 0.0, epsilon = EPS);

    let d = Dirichlet::new(DVector::from_column_slice(&[1., 2., 3.])).unwrap();
    assert_relative_eq!(d.kl(&d).unwrap()[0], 0.0, epsilon = EPS);
}

#[test]
fn samples_lie_in_support() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    let g = Gamma::scalar(0.5, 2.).unwrap().expand(3).unwrap();
    let x = g.sample(200, &mut rng).unwrap();
    assert_eq!(x.shape(), (600, 1));
    assert!(g.support().contains((&x).into()).unwrap());

    let d = Dirichlet::new(DVector::from_column_slice(&[0.5, 1., 4.])).unwrap();
    let x = d.sample(200, &mut rng).unwrap();
    assert_eq!(x.shape(), (200, 3));
    assert!(d.support().contains((&x).into()).unwrap());
    assert!(d.has_rsample());
    let x = d.rsample(100, &mut rng).unwrap();
    assert!(d.support().contains((&x).into()).unwrap());
    assert!(d.log_prob((&x).into()).unwrap().iter().all(|l| l.is_finite() ));

    assert!(g.has_rsample());
    let x = g.rsample(100, &mut rng).unwrap();
    assert_eq!(x.shape(), (300, 1));
    assert!(g.support().contains((&x).into()).unwrap());
}

#[test]
fn families_serialize() {
    let g = Gamma::scalar(2., 0.5).unwrap().expand(3).unwrap();
    let loaded : Gamma = serde_json::from_str(&serde_json::to_string(&g).unwrap()).unwrap();
    assert_eq!(g, loaded);

    let mn = MultiNormal::standard(2).unwrap();
    let loaded : MultiNormal = serde_json::from_str(&serde_json::to_string(&mn).unwrap()).unwrap();
    assert_eq!(loaded.sigma(), mn.sigma());
}
