//! # Order keys
//!
//! Fractional indexing for ordered lists: given the keys of two neighbors,
//! produce a new key that sorts strictly between them. Items can be
//! inserted and moved without renumbering anyone else, and independent
//! writers need nothing but the two neighbor keys to pick a position.
//!
//! ## Core idea
//! A key is a base-26 fraction written with `a`..`z`. Byte-wise order of
//! keys equals numeric order of the fractions, and there is always room
//! for one more digit, so a key between any two distinct keys exists:
//!
//! ```text
//!   between("b", "d")  = "c"
//!   between("b", "c")  = "bn"     (adjacent: go one digit deeper)
//!   between(-, -)      = "n"
//! ```
//!
//! The cost is key growth: inserting again and again at the same spot
//! lengthens keys without bound.
//!
//! On top of the generator sit an in-memory [`OrderedList`] and a
//! journaled [`Store`] that persists it, with transactions and undo.

pub mod error;
pub mod journal;
pub mod key;
pub mod list;
pub mod store;
pub mod types;

// Public re-exports for the top-level API
pub use error::{Error, Result};
pub use key::{OrderKey, is_well_formed, midpoint};
pub use list::{Item, OrderedList};
pub use store::{Options, Stats, Store, Transaction};
pub use types::{ItemId, Mutation, Value};
