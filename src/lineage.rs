//! # Lineage Tracker
//! Attaches and extends a provenance trail as a datum passes through
//! stages. Purely functional: both operations return a new value and only
//! ever grow the transformations list.

use crate::model::{now_iso, DataLineage, RawDatum};

/// Create a lineage block stamped with current processing time, with an
/// optional first transformation note.
pub fn attach(mut datum: RawDatum, transformation: Option<&str>) -> RawDatum {
    let transformations = transformation
        .map(|t| vec![t.to_string()])
        .unwrap_or_default();
    datum.lineage = Some(DataLineage {
        source: datum.source.clone(),
        received_at: now_iso(),
        original_id: datum.id.clone(),
        transformations,
    });
    datum
}

/// Append a transformation note, creating the lineage block first if the
/// datum arrived without one.
pub fn add_transform(mut datum: RawDatum, transformation: &str) -> RawDatum {
    match datum.lineage {
        Some(ref mut lineage) => lineage.transformations.push(transformation.to_string()),
        None => return attach(datum, Some(transformation)),
    }
    datum
}
