//! Union directory and open mode semantics over the 9P2000 data model.
//!
//! Nothing here performs I/O. Where a decision depends on the contents of a
//! directory the caller passes a closure that answers for one member.

pub mod error;
pub mod mount;
pub mod open;
mod union;

pub use error::{Error, Result};
pub use mount::{MountAction, MountFlag};
pub use open::{create_perm, Access, OpenMode};
pub use union::{Entry, Member, Union};
