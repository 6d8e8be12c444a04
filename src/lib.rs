//! Bounded cursor pagination over the Redshift control-plane list APIs.
//!
//! [`PageWalker`] drives any [`FetchPage`] source page by page, honouring a
//! total item limit, a preferred page size clamped into the service's
//! [`PageBounds`], a resume cursor and cancellation. The [`aws`] module binds
//! it to the Redshift `Describe*` operations.

pub mod aws;
mod cluster_status;
pub mod envelope;
pub mod error;
mod exponential_backoff;
pub mod page;
pub mod resources;
mod utils;
pub mod walker;
pub mod writer;

pub use crate::page::{Cursor, PageBounds, PageRequest, PageResult, WalkConfig};
pub use crate::walker::{
    fetch_fn, walk_all, walk_one_page, CancelHandle, Cancellation, Completion, FetchFn, FetchPage,
    Listing, PageWalker, WalkStatus,
};
