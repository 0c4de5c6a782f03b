#![allow(unused_imports, unused_macros)]
use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, trace, warn};
    } else {
        // Arguments are still type checked so that the crate builds the same
        // way with and without the `log` feature.
        macro_rules! discard {
            ($($arg:tt)*) => {{
                let _ = format_args!($($arg)*);
            }};
        }

        pub(crate) use discard as debug;
        pub(crate) use discard as trace;
        pub(crate) use discard as warn;
    }
}
