//! Query modules for the produce price SDK.
//!
//! Each module provides a query struct that borrows from a
//! [`Connection`](crate::connection::Connection) and exposes methods
//! returning `Result<T>` with typed record payloads.

pub mod records;
pub mod selection;

pub use records::RecordQuery;
pub use selection::SelectionQuery;
