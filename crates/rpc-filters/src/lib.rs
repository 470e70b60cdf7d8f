#![doc = include_str!("../README.md")]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod config;
pub use config::{EvictionPolicy, FilterEnvConfig, FilterRpcConfig};

mod ctx;
pub use ctx::FilterRpcCtx;

mod error;
pub use error::{FilterError, FilterId};

mod eth;

mod feed;
pub use feed::{ChainEvent, ChainNotifier, ChangeFeed};

mod interest;
pub use interest::FilterDelta;

mod metrics;

mod query;

mod resolve;
pub use resolve::ChainHead;

mod source;
pub use source::{LogSource, LogSourceError, MemLogStore};

mod utils;

pub use ethfilter_types as types;

/// Instantiate the `eth` filter API router, with un-prefixed method names.
pub fn eth<S: LogSource>() -> ajj::Router<FilterRpcCtx<S>> {
    eth::eth()
}

/// Instantiate the filter API router, with methods under the `eth`
/// namespace.
pub fn router<S: LogSource>() -> ajj::Router<FilterRpcCtx<S>> {
    ajj::Router::new().nest("eth", eth::eth())
}
