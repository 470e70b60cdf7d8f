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

mod block;
pub use block::{BlockTransaction, FinalizedBlock};

mod criteria;
pub use criteria::{CriteriaError, FilterCriteria, matches};

mod log;
pub use log::{LogEntry, LogFilterElement};

mod request;
pub use request::{AddressSelector, BlockSelector, FilterRequest, LogFilter};

mod tag;
pub use tag::{BlockTag, ParseBlockTagError};

mod topics;
pub use topics::{MAX_TOPICS, TopicPattern};
