pub mod canonical;
pub mod client;
pub mod compare;

pub use canonical::{canonical_string, canonicalize};
pub use client::{ReportClient, ReportFetchError, ReportPoll};
pub use compare::{Comparator, CompareError, Comparison};
