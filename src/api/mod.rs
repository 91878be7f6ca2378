//! Surfaces shared with the rest of the engine and with trigger bodies
//!
//! The session a context binds to, and the row set handles trigger bodies
//! read row images through.

mod row_set;
mod session;

pub use row_set::*;
pub use session::*;
