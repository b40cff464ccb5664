//! Query representation, dialect grammars, the fluent builder and result
//! processing.

mod builder;
pub mod grammar;
mod object;
pub mod processor;

pub use builder::QueryBuilder;
pub use grammar::QueryGrammar;
pub use object::{
    Aggregate, AggregateFunction, Boolean, Direction, JoinClause, JoinCondition, JoinType,
    Operator, Order, QueryObject, WhereClause,
};
pub use processor::{hydrate, DefaultProcessor, Processor};
