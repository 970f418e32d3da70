//! Conditionally parallel iteration.
//!
//! With the `parallel` feature the macros below dispatch to rayon; without
//! it they fall back to the sequential std iterators, so the same call site
//! compiles either way. Callers that chain iterator adaptors need
//! `rayon::iter::ParallelIterator` in scope under the feature.
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//! #[cfg(feature = "parallel")]
//! use rayon::iter::ParallelIterator;
//!
//! let squares: Vec<usize> = iter_maybe_parallel!(0..n).map(|i| i * i).collect();
//! ```

/// Iterate over an owned collection or range, in parallel when enabled.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Iterate over a slice by reference, in parallel when enabled.
#[macro_export]
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

pub use iter_maybe_parallel;
pub use slice_maybe_parallel;
