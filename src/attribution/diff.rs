//! Coordinate change detection between two snapshots.

use crate::attribution::snapshot::{Coordinate, NaturalKey, Snapshot};

/// A row whose coordinates were newly populated or moved.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateChange {
    /// Natural key of the changed row.
    pub key: NaturalKey,
    /// Coordinates before the change; `None` when they were added.
    pub before: Option<Coordinate>,
    /// Coordinates after the change.
    pub after: Coordinate,
}

impl CoordinateChange {
    /// Returns true when the row had no coordinates before.
    pub fn is_addition(&self) -> bool {
        self.before.is_none()
    }
}

/// Finds rows of `after` whose coordinates were added or changed relative
/// to `before`, in `after` row order.
///
/// A key missing from `before` counts as an addition. Comparison is exact
/// on the parsed floating values.
pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> Vec<CoordinateChange> {
    let lookup = before.coordinate_lookup();

    after
        .rows()
        .iter()
        .filter_map(|row| {
            let after_coord = row.coordinate?;
            let before_coord = lookup.get(&row.key).copied().flatten();

            #[allow(clippy::float_cmp)]
            let changed = match before_coord {
                None => true,
                Some(prev) => prev.lat != after_coord.lat || prev.lng != after_coord.lng,
            };

            changed.then(|| CoordinateChange {
                key: row.key.clone(),
                before: before_coord,
                after: after_coord,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::attribution::snapshot::SnapshotRow;

    fn row(electorate: i64, coordinate: Option<(f64, f64)>) -> SnapshotRow {
        SnapshotRow {
            key: NaturalKey {
                province_number: 10,
                registrar_code: 1001,
                subdis_code: 100101,
                electorate,
                location: format!("หน่วย {electorate}"),
            },
            province: String::new(),
            registrar: String::new(),
            subdistrict: String::new(),
            coordinate: coordinate.map(|(lat, lng)| Coordinate { lat, lng }),
        }
    }

    #[test]
    fn unchanged_coordinates_are_not_reported() {
        let before = Snapshot::from_rows(vec![row(1, Some((13.7, 100.5)))]);
        let after = Snapshot::from_rows(vec![row(1, Some((13.7, 100.5)))]);
        assert!(diff_snapshots(&before, &after).is_empty());
    }

    #[test]
    fn newly_populated_coordinates_are_additions() {
        let before = Snapshot::from_rows(vec![row(1, None)]);
        let after = Snapshot::from_rows(vec![row(1, Some((13.7, 100.5)))]);
        let changes = diff_snapshots(&before, &after);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_addition());
    }

    #[test]
    fn key_absent_from_before_is_an_addition() {
        let before = Snapshot::from_rows(vec![]);
        let after = Snapshot::from_rows(vec![row(7, Some((13.7, 100.5)))]);
        let changes = diff_snapshots(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before, None);
        assert_eq!(changes[0].key.electorate, 7);
    }

    #[test]
    fn moved_coordinates_keep_previous_value() {
        let before = Snapshot::from_rows(vec![row(1, Some((13.7, 100.5)))]);
        let after = Snapshot::from_rows(vec![row(1, Some((13.8, 100.5)))]);
        let changes = diff_snapshots(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].before,
            Some(Coordinate {
                lat: 13.7,
                lng: 100.5
            })
        );
        assert_eq!(changes[0].after.lat, 13.8);
    }

    #[test]
    fn removed_coordinates_are_not_reported() {
        let before = Snapshot::from_rows(vec![row(1, Some((13.7, 100.5)))]);
        let after = Snapshot::from_rows(vec![row(1, None)]);
        assert!(diff_snapshots(&before, &after).is_empty());
    }

    proptest! {
        #[test]
        fn identical_snapshots_never_differ(
            coords in proptest::collection::vec(
                proptest::option::of((5.6f64..20.5, 97.3f64..105.6)),
                0..40,
            )
        ) {
            let rows: Vec<_> = coords
                .iter()
                .enumerate()
                .map(|(i, c)| row(i as i64, *c))
                .collect();
            let snapshot = Snapshot::from_rows(rows);
            prop_assert!(diff_snapshots(&snapshot, &snapshot).is_empty());
        }

        #[test]
        fn additions_from_empty_match_populated_rows(
            coords in proptest::collection::vec(
                proptest::option::of((5.6f64..20.5, 97.3f64..105.6)),
                0..40,
            )
        ) {
            let rows: Vec<_> = coords
                .iter()
                .enumerate()
                .map(|(i, c)| row(i as i64, *c))
                .collect();
            let after = Snapshot::from_rows(rows);
            let changes = diff_snapshots(&Snapshot::default(), &after);
            let populated = coords.iter().filter(|c| c.is_some()).count();
            prop_assert_eq!(changes.len(), populated);
            prop_assert!(changes.iter().all(CoordinateChange::is_addition));
        }
    }
}
