//! Fuzz target for `Value::rescale` round-tripping (invariant 6: an NDP
//! change followed by its inverse reproduces the original value, except
//! where the forward leg would overflow `i64` and must return
//! `NdpOverflow` instead of silently wrapping/truncating).

#![no_main]

use libfuzzer_sys::fuzz_target;
use md_core::core::{Ndp, Value};

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    raw: i64,
    from_ndp: u8,
    to_ndp: u8,
}

fuzz_target!(|input: Input| {
    let Ok(from) = Ndp::new(input.from_ndp % (Ndp::MAX + 1)) else { return };
    let Ok(to) = Ndp::new(input.to_ndp % (Ndp::MAX + 1)) else { return };
    let value = Value::new(input.raw);

    if value.is_null() || value.is_reset() {
        // Sentinels always pass through unchanged, regardless of NDP.
        assert_eq!(value.rescale(from, to).unwrap(), value);
        return;
    }

    match value.rescale(from, to) {
        Ok(scaled) => {
            // The inverse leg must either restore the original magnitude
            // exactly, or itself report overflow — it must never panic or
            // silently produce a different value than the original.
            match scaled.rescale(to, from) {
                Ok(back) => assert_eq!(back, value, "round trip changed value: {value:?} via ndp {from:?}->{to:?}->{from:?}"),
                Err(_) => {}
            }
        }
        Err(_) => {
            // Overflow is only legitimate when scaling up (more decimal
            // places multiplies the magnitude).
            assert!(to.get() > from.get(), "unexpected overflow scaling {from:?} -> {to:?}");
        }
    }
});
