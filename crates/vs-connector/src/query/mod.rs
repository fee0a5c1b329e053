//! Search requests: builders, the wire schema, and the translator between them.

pub mod request;
pub mod translate;
pub mod wire;

pub use request::{
    AbstractSearchRequest, AlertSearch, EventSearch, SearchFilters, SortOrder, TimeBound,
};
pub use translate::{compile, translate, SearchInput};
pub use wire::{
    Condition, FilterGroup, InValue, Operator, Ordering, QueryBlock, RequestParams, RowsBlock,
    SortDirection, WireQuery, WireRequest,
};
