use factorised::distr::*;
use nalgebra::*;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::sync::Arc;

fn composite(widths : &[usize], batch : usize) -> Factorised {
    let factors = widths.iter()
        .map(|w| -> Arc<dyn Distribution> {
            if *w == 1 {
                Arc::new(Normal::standard().expand(batch).unwrap())
            } else {
                Arc::new(MultiNormal::standard(*w).unwrap().expand(batch).unwrap())
            }
        })
        .collect();
    Factorised::new(factors).unwrap()
}

proptest! {
    #[test]
    fn event_width_is_sum_of_widths(widths in prop::collection::vec(1usize..5, 1..6), batch in 1usize..4) {
        let f = composite(&widths, batch);
        prop_assert_eq!(f.event_shape(), Some(widths.iter().sum::<usize>()));
        prop_assert_eq!(f.widths(), &widths[..]);
        prop_assert_eq!(f.batch_shape(), batch);
    }

    #[test]
    fn partition_round_trips(
        widths in prop::collection::vec(1usize..5, 1..6),
        rows in 1usize..8,
        seed in any::<u64>()
    ) {
        let f = composite(&widths, 1);
        let width : usize = widths.iter().sum();
        let mut rng = StdRng::seed_from_u64(seed);
        let x = DMatrix::from_fn(rows, width, |_, _| rng.gen::<f64>() );
        let mut joined : DMatrix<f64> = DMatrix::zeros(rows, width);
        let mut offset = 0;
        for (part, w) in f.partition(&x).unwrap().zip(widths.iter()) {
            prop_assert_eq!(part.ncols(), *w);
            joined.columns_mut(offset, *w).copy_from(&part);
            offset += *w;
        }
        prop_assert_eq!(offset, width);
        prop_assert_eq!(joined, x);
    }

    #[test]
    fn self_divergence_vanishes(widths in prop::collection::vec(1usize..4, 1..4), batch in 1usize..4) {
        let f = composite(&widths, batch);
        let kl = factorised::divergence::kl_divergence(&f, &f).unwrap();
        prop_assert_eq!(kl.nrows(), batch);
        prop_assert!(kl.iter().all(|k| k.abs() < 1E-8 ));
    }
}
