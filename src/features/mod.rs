//! Composable feature pipeline (§4.8, §4.9). Each feature is a plugin declaration run in
//! ascending priority order during `.build()`; features cooperate strictly through
//! [`crate::context::Context`]'s handler arrays and methods map, never through direct
//! references to one another (§9 "Feature discovery").

pub mod async_feature;
pub mod grid;
pub mod page;
pub mod scale;
pub mod scrollbar;
pub mod sections;
pub mod selection;
pub mod snapshots;

use crate::context::Shared;
use crate::item::Identified;

pub const DEFAULT_PRIORITY: i32 = 50;

pub trait Feature<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Other feature names this one cannot coexist with; checked at `.build()` (§4.9).
    fn conflicts(&self) -> &'static [&'static str] {
        &[]
    }

    fn setup(&self, ctx: &Shared<T>);

    fn destroy(&self, _ctx: &Shared<T>) {}
}

/// Sorts by ascending priority, stable on ties so registration order breaks ties, per
/// §4.8 step 5.
pub fn sort_by_priority<T>(features: &mut [Box<dyn Feature<T>>])
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    features.sort_by_key(|f| f.priority());
}

/// Checks declared conflicts symmetrically: if A declares it conflicts with B, or B
/// declares it conflicts with A, both being present is an error.
pub fn check_conflicts<T>(features: &[Box<dyn Feature<T>>]) -> Result<(), (String, String)>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    for a in features {
        for b in features {
            if a.name() == b.name() {
                continue;
            }
            if a.conflicts().contains(&b.name()) {
                return Err((a.name().to_string(), b.name().to_string()));
            }
        }
    }
    Ok(())
}
