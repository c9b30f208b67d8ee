//! Storerace document store.
//!
//! An embedded document database on top of sled. Each collection is a sled
//! tree of JSON documents keyed by an order-preserving encoding of `_id`;
//! each secondary index is a separate tree. Queries support filters,
//! projections, sorts and explicit index hints, and [`Collection::aggregate`]
//! runs pipelines with join-equivalent `Lookup` stages.

pub mod collection;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod filter;
pub mod index;
pub mod pipeline;

pub use collection::{Collection, FindOptions, Update, UpdateResult};
pub use config::StoreConfig;
pub use database::Database;
pub use document::{Document, ID_FIELD};
pub use error::{Error, Result, WriteError, WriteErrorKind};
pub use filter::{Filter, ValueSet};
pub use index::{IndexSpec, SortOrder};
pub use pipeline::{Accumulator, AggregateOptions, Projection, Stage};
