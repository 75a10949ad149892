//! Field-level change computation.

use ferry_core::Fields;

/// Fields of `modified` whose value differs from `original`.
///
/// A field missing from `original` counts as changed. Fields only present in
/// `original` are not reported: removal is expressed by a delete mutation,
/// never by a diff. The result is a pure function of its inputs, so merge and
/// consolidation recompute it instead of trusting a stored `changes` map.
pub fn diff(original: &Fields, modified: &Fields) -> Fields {
    modified
        .iter()
        .filter(|(name, value)| original.get(name.as_str()) != Some(value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
