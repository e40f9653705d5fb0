//! Relational model operations
//!
//! Every function takes a `&mut SqliteConnection` so callers decide the
//! transaction boundary (`&mut *tx` inside a reconciliation).

pub mod dimensions;
pub mod entities;
pub mod images;

pub use dimensions::*;
pub use entities::*;
pub use images::*;
