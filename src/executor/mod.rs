pub mod fetch;
pub mod filter;
pub mod index_scan;
pub mod predicate;
pub mod scan;
