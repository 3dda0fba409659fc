//! Property-based coverage of invariant 6 ("an NDP change followed by its
//! inverse produces an identical book, except where the forward leg
//! overflows and must report `NdpOverflow`"), generalized from the
//! teacher's fixed-point round-trip proptest to `Value::rescale`.

use proptest::prelude::*;

use super::value::{Ndp, Value};

fn ndp_strategy() -> impl Strategy<Value = Ndp> {
    (0u8..=Ndp::MAX).prop_map(Ndp::new_unchecked)
}

proptest! {
    #[test]
    fn rescale_up_then_down_round_trips_or_overflows(
        raw in any::<i64>().prop_filter("not a sentinel", |r| *r != i64::MIN && *r != i64::MIN + 1),
        from in ndp_strategy(),
        to in ndp_strategy(),
    ) {
        let value = Value::new(raw);
        match value.rescale(from, to) {
            Ok(scaled) => {
                if let Ok(back) = scaled.rescale(to, from) {
                    prop_assert_eq!(back, value);
                }
            }
            Err(_) => {
                prop_assert!(to.get() > from.get());
            }
        }
    }

    #[test]
    fn sentinels_always_pass_through(from in ndp_strategy(), to in ndp_strategy()) {
        prop_assert_eq!(Value::NULL.rescale(from, to).unwrap(), Value::NULL);
        prop_assert_eq!(Value::RESET.rescale(from, to).unwrap(), Value::RESET);
    }
}
