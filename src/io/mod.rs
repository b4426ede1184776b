/// CSV export of stored consumption history.
pub mod export;
