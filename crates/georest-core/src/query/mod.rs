//! Query engine.
//!
//! Compiles filter trees into [`Predicate`]s, evaluates them against stored
//! records or renders them as PostGIS SQL, and runs sorted, paged reads.

mod compiler;
mod evaluator;
mod executor;
mod params;
mod predicate;
mod sql;
pub mod value_codec;

pub use compiler::{
    classify, compile_filter, ClauseOperator, Comparison, FilterCompiler, GeometryCase, InOperator,
    LikeOperator, NotNullOperator, NullOperator, OperatorTable,
};
pub use evaluator::{compare_values, like_match, values_equal, PredicateEvaluator, LIKE_CAST_LENGTH};
pub use executor::{QueryExecutor, ReadQuery};
pub use params::{OrderDirection, Paging, SortSpec};
pub use predicate::{CompareOp, Predicate, SpatialPredicate};
pub use sql::{SqlFragment, SqlRenderer};
