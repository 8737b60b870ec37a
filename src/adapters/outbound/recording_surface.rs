use crate::domains::overlay::{MapHandle, MapSurface, MarkerAppearance, OverlayKey, PathStyle};
use crate::domains::tracking::GeoPoint;
use std::collections::{BTreeMap, HashMap};

/// One call received by a `RecordingSurface`.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AddMarker { key: OverlayKey, handle: MapHandle, point: GeoPoint },
    UpdateMarker { handle: MapHandle, point: GeoPoint },
    RemoveMarker { handle: MapHandle },
    AddPath { key: OverlayKey, handle: MapHandle, points: [GeoPoint; 2] },
    UpdatePath { handle: MapHandle, points: [GeoPoint; 2] },
    RemovePath { handle: MapHandle },
    PanTo(GeoPoint),
    SetCenter(GeoPoint, u8),
}

impl SurfaceOp {
    pub fn is_camera(&self) -> bool {
        matches!(self, SurfaceOp::PanTo(_) | SurfaceOp::SetCenter(..))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedObject {
    Marker { point: GeoPoint, appearance: MarkerAppearance },
    Path { points: [GeoPoint; 2], style: PathStyle },
}

/// In-memory surface that remembers every call and what is currently on the map.
///
/// Calls with unknown handles or mismatched object kinds are collected in
/// `misuse` instead of panicking, so callers can assert on them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<SurfaceOp>,
    objects: HashMap<MapHandle, (OverlayKey, RecordedObject)>,
    misuse: Vec<String>,
    commits: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Returns and forgets the calls recorded so far.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn misuse(&self) -> &[String] {
        &self.misuse
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Live objects by key. A key present twice would show up as a shorter map
    /// than `object_count`.
    pub fn objects_by_key(&self) -> BTreeMap<OverlayKey, RecordedObject> {
        self.objects
            .values()
            .map(|(key, object)| (key.clone(), object.clone()))
            .collect()
    }

    pub fn object(&self, key: &OverlayKey) -> Option<&RecordedObject> {
        self.objects.values().find(|(k, _)| k == key).map(|(_, object)| object)
    }

    pub fn pans(&self) -> Vec<GeoPoint> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::PanTo(point) => Some(*point),
                _ => None,
            })
            .collect()
    }

    fn replace(&mut self, handle: MapHandle, object: RecordedObject, op: &str) {
        match self.objects.get_mut(&handle) {
            Some((_, existing)) if std::mem::discriminant(&*existing) == std::mem::discriminant(&object) => {
                *existing = object;
            }
            Some((key, _)) => self.misuse.push(format!("{} on {} of a different kind", op, key)),
            None => self.misuse.push(format!("{} on unknown handle {}", op, handle)),
        }
    }

    fn forget(&mut self, handle: MapHandle, want_path: bool, op: &str) {
        match self.objects.remove(&handle) {
            Some((key, object)) => {
                if matches!(object, RecordedObject::Path { .. }) != want_path {
                    self.misuse.push(format!("{} on {} of a different kind", op, key));
                }
            }
            None => self.misuse.push(format!("{} on unknown handle {}", op, handle)),
        }
    }
}

impl MapSurface for RecordingSurface {
    fn add_marker(&mut self, key: &OverlayKey, point: GeoPoint, appearance: &MarkerAppearance) -> MapHandle {
        let handle = MapHandle::fresh();
        self.objects.insert(
            handle,
            (
                key.clone(),
                RecordedObject::Marker {
                    point,
                    appearance: appearance.clone(),
                },
            ),
        );
        self.ops.push(SurfaceOp::AddMarker {
            key: key.clone(),
            handle,
            point,
        });
        handle
    }

    fn update_marker(&mut self, handle: MapHandle, point: GeoPoint, appearance: &MarkerAppearance) {
        let object = RecordedObject::Marker {
            point,
            appearance: appearance.clone(),
        };
        self.replace(handle, object, "update_marker");
        self.ops.push(SurfaceOp::UpdateMarker { handle, point });
    }

    fn remove_marker(&mut self, handle: MapHandle) {
        self.forget(handle, false, "remove_marker");
        self.ops.push(SurfaceOp::RemoveMarker { handle });
    }

    fn add_path(&mut self, key: &OverlayKey, points: [GeoPoint; 2], style: &PathStyle) -> MapHandle {
        let handle = MapHandle::fresh();
        self.objects
            .insert(handle, (key.clone(), RecordedObject::Path { points, style: *style }));
        self.ops.push(SurfaceOp::AddPath {
            key: key.clone(),
            handle,
            points,
        });
        handle
    }

    fn update_path(&mut self, handle: MapHandle, points: [GeoPoint; 2], style: &PathStyle) {
        self.replace(handle, RecordedObject::Path { points, style: *style }, "update_path");
        self.ops.push(SurfaceOp::UpdatePath { handle, points });
    }

    fn remove_path(&mut self, handle: MapHandle) {
        self.forget(handle, true, "remove_path");
        self.ops.push(SurfaceOp::RemovePath { handle });
    }

    fn pan_to(&mut self, point: GeoPoint) {
        self.ops.push(SurfaceOp::PanTo(point));
    }

    fn set_center(&mut self, point: GeoPoint, zoom: u8) {
        self.ops.push(SurfaceOp::SetCenter(point, zoom));
    }

    fn commit(&mut self) {
        self.commits += 1;
    }
}
