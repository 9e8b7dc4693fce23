//! Numeric building blocks shared by the smoother and the variance adjuster.
//!
//! `accessor` abstracts over matrix storage, `vector` holds slice geometry
//! (dot products, distances to a line) and `logspace` the stable log-sum-exp
//! helpers used to aggregate kernel weights without under- or overflow.
pub mod accessor;
pub mod logspace;
pub mod vector;

pub use accessor::MatrixAccessor;
pub use logspace::{log_sum_exp, logspace_add};
pub use vector::{dot, l2_norm, squared_distance, squared_distance_to_line};
