//! Checked/unchecked contract assertions.
//!
//! Every container in this crate has two access tiers. In checked builds a
//! broken precondition (out-of-range index, unoccupied slot, pop on an empty
//! list, ...) panics with a `contract violation:` message. In unchecked builds
//! the checks are compiled out entirely and the same breach is undefined
//! behavior.
//!
//! Checks are active whenever `debug_assertions` are on, or when the crate is
//! built without the `unchecked` feature. Only a release build with
//! `--features unchecked` runs unchecked.

use core::fmt;

/// `true` when contract checks are compiled in.
pub const CHECKED: bool = cfg!(any(debug_assertions, not(feature = "unchecked")));

/// Reports a contract violation.
#[cold]
#[inline(never)]
#[track_caller]
pub fn violation(args: fmt::Arguments<'_>) -> ! {
    panic!("contract violation: {}", args)
}

/// Asserts a container precondition in checked builds.
///
/// The condition is not evaluated when [`CHECKED`] is `false`.
macro_rules! contract_assert {
    ($cond:expr, $($arg:tt)+) => {
        if $crate::contract::CHECKED && !($cond) {
            $crate::contract::violation(format_args!($($arg)+));
        }
    };
}

/// Asserts `index < len` in checked builds.
macro_rules! contract_index {
    ($index:expr, $len:expr) => {
        $crate::contract::contract_assert!(
            $index < $len,
            "index {} is out of range {}",
            $index,
            $len
        )
    };
}

pub(crate) use contract_assert;
pub(crate) use contract_index;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_in_debug() {
        if cfg!(debug_assertions) {
            assert!(CHECKED);
        }
    }

    #[test]
    fn test_passing_assert_is_silent() {
        contract_assert!(1 + 1 == 2, "arithmetic is broken");
        contract_index!(3usize, 4usize);
    }

    #[cfg(any(debug_assertions, not(feature = "unchecked")))]
    #[test]
    #[should_panic(expected = "contract violation: index 4 is out of range 4")]
    fn test_index_violation_message() {
        contract_index!(4usize, 4usize);
    }

    #[cfg(any(debug_assertions, not(feature = "unchecked")))]
    #[test]
    fn test_violation_is_catchable() {
        let result = std::panic::catch_unwind(|| {
            contract_assert!(false, "slot {} is not occupied", 7);
        });
        let payload = result.expect_err("violation must panic");
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert_eq!(message, "contract violation: slot 7 is not occupied");
    }
}
