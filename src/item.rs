//! Data model (§3): caller-owned records with a stable identifier. The engine never
//! mutates an item; identifier stability across `setItems`/`updateItem` calls is the
//! caller's contract, not something vlist can check.

use std::fmt::Display;
use std::hash::Hash;

/// An identifier usable as a stable key for an item — string or integer, per spec.
/// Implemented for the common id types; callers with a newtype id implement it too.
pub trait ItemId: Clone + Eq + Hash + Display + 'static {}

impl ItemId for String {}
impl ItemId for u64 {}
impl ItemId for i64 {}
impl ItemId for u32 {}
impl ItemId for i32 {}

/// A list item: caller-owned data plus a stable id. vlist is generic over `T: Identified`
/// rather than forcing callers to wrap their records in a vlist-owned type.
pub trait Identified {
    type Id: ItemId;

    fn id(&self) -> Self::Id;
}
