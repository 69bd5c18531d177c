//! Read-only query layer over a published aggregate catalog.
//!
//! Works against any [`permits_core::store::CatalogReader`]. Every request is
//! checked against the catalog contract before a table is read. Transport
//! and presentation are the caller's responsibility.
//!
//! ```rust,ignore
//! let filters = FilterSet { zip_code: Some("92101".into()), ..Default::default() };
//! let rows = permits_query::query(&catalog, "approval_timelines", &filters)?;
//! ```

pub mod error;
pub mod filter;
pub mod options;

pub use error::QueryError;
pub use filter::query;
pub use options::{AggregateInfo, FilterOptions, describe, filter_options};
