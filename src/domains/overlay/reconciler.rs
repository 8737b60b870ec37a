use super::keys::{OverlayKey, OverlayRole};
use super::scene::{OverlayShape, Scene};
use super::surface::{MapHandle, MapSurface};
use crate::domains::tracking::{GeoPoint, MissionId};
use std::collections::BTreeMap;

/// Positions closer than this (in degrees, per axis) are treated as unchanged.
pub const DEFAULT_POSITION_EPSILON_DEG: f64 = 1e-7;

pub const DEFAULT_ZOOM: u8 = 13;

/// How the camera reacts to overlay changes.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraMode {
    /// Multi-mission map: recentre on the viewer whenever their location changes,
    /// otherwise optionally pan to the live marker updated last in the pass.
    Overview { zoom: u8, follow_live: bool },
    /// Single-mission tracking: follow the live marker, otherwise sit on the pickup.
    Follow { mission_id: MissionId, zoom: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    PanTo(GeoPoint),
    SetCenter(GeoPoint, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLifecycle {
    Absent,
    Created,
    Updated(u32),
}

/// What is currently rendered for one key. Never leaves the reconciler.
#[derive(Debug)]
struct OverlayEntry {
    last_shape: OverlayShape,
    handle: MapHandle,
    updates: u32,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<OverlayKey>,
    pub updated: Vec<OverlayKey>,
    pub removed: Vec<OverlayKey>,
    pub camera: Option<CameraCommand>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.surface_calls() == 0
    }

    pub fn surface_calls(&self) -> usize {
        self.created.len() + self.updated.len() + self.removed.len() + usize::from(self.camera.is_some())
    }
}

/// Keeps a map surface in step with the desired overlay, one key at a time.
///
/// The entry map is only touched inside `reconcile` and `teardown`; each key
/// receives at most one surface mutation per pass.
pub struct OverlayReconciler<S: MapSurface> {
    surface: S,
    entries: BTreeMap<OverlayKey, OverlayEntry>,
    camera_mode: CameraMode,
    /// Last `SetCenter` issued; pans are never remembered.
    last_center: Option<CameraCommand>,
    epsilon_deg: f64,
}

impl<S: MapSurface> OverlayReconciler<S> {
    pub fn new(surface: S, camera_mode: CameraMode) -> Self {
        Self {
            surface,
            entries: BTreeMap::new(),
            camera_mode,
            last_center: None,
            epsilon_deg: DEFAULT_POSITION_EPSILON_DEG,
        }
    }

    pub fn with_epsilon(mut self, epsilon_deg: f64) -> Self {
        if epsilon_deg.is_finite() && epsilon_deg >= 0.0 {
            self.epsilon_deg = epsilon_deg;
        }
        self
    }

    pub fn camera_mode(&self) -> &CameraMode {
        &self.camera_mode
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &OverlayKey> {
        self.entries.keys()
    }

    pub fn lifecycle(&self, key: &OverlayKey) -> EntryLifecycle {
        match self.entries.get(key) {
            None => EntryLifecycle::Absent,
            Some(entry) if entry.updates == 0 => EntryLifecycle::Created,
            Some(entry) => EntryLifecycle::Updated(entry.updates),
        }
    }

    pub fn rendered_position(&self, key: &OverlayKey) -> Option<GeoPoint> {
        self.entries.get(key).map(|e| e.last_shape.anchor())
    }

    /// Brings the surface in line with `scene`: create, update, remove, then camera.
    pub fn reconcile(&mut self, scene: &Scene) -> ReconcileReport {
        let desired = scene.desired();
        let mut report = ReconcileReport::default();
        let mut moved_live: Vec<(MissionId, GeoPoint)> = Vec::new();

        for (key, shape) in &desired {
            match self.entries.get_mut(key) {
                None => {
                    let handle = add(&mut self.surface, key, shape);
                    self.entries.insert(
                        key.clone(),
                        OverlayEntry {
                            last_shape: shape.clone(),
                            handle,
                            updates: 0,
                        },
                    );
                    if let (OverlayRole::LiveMarker, Some(id)) = (key.role(), key.mission_id()) {
                        moved_live.push((id.clone(), shape.anchor()));
                    }
                    report.created.push(key.clone());
                }
                Some(entry) => {
                    if entry.last_shape.matches(shape, self.epsilon_deg) {
                        continue;
                    }
                    let moved = !entry.last_shape.anchor().approx_eq(&shape.anchor(), self.epsilon_deg);
                    update(&mut self.surface, entry.handle, shape);
                    entry.last_shape = shape.clone();
                    entry.updates = entry.updates.saturating_add(1);
                    if let (true, OverlayRole::LiveMarker, Some(id)) = (moved, key.role(), key.mission_id()) {
                        moved_live.push((id.clone(), shape.anchor()));
                    }
                    report.updated.push(key.clone());
                }
            }
        }

        let stale: Vec<OverlayKey> = self
            .entries
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = self.entries.remove(&key) {
                remove(&mut self.surface, &key, entry.handle);
                report.removed.push(key);
            }
        }

        report.camera = self.steer_camera(scene, &moved_live);
        self.surface.commit();
        report
    }

    fn steer_camera(&mut self, scene: &Scene, moved_live: &[(MissionId, GeoPoint)]) -> Option<CameraCommand> {
        let wanted = match &self.camera_mode {
            CameraMode::Follow { mission_id, zoom } => {
                let moved = moved_live.iter().rev().find(|(id, _)| id == mission_id);
                match moved {
                    Some((_, point)) => Some(CameraCommand::PanTo(*point)),
                    None if self.entries.contains_key(&OverlayKey::live(mission_id)) => None,
                    None => scene
                        .missions
                        .iter()
                        .find(|m| &m.mission.id == mission_id)
                        .map(|m| CameraCommand::SetCenter(m.mission.pickup, *zoom)),
                }
            }
            CameraMode::Overview { zoom, follow_live } => {
                let recentre = scene
                    .viewer
                    .map(|v| CameraCommand::SetCenter(v, *zoom))
                    .filter(|cmd| self.last_center != Some(*cmd));
                match (recentre, moved_live.last()) {
                    (Some(cmd), _) => Some(cmd),
                    (None, Some((_, point))) if *follow_live => Some(CameraCommand::PanTo(*point)),
                    _ => None,
                }
            }
        }?;

        // Pans always follow a real move; centring is only repeated for a new target.
        match wanted {
            CameraCommand::PanTo(point) => self.surface.pan_to(point),
            CameraCommand::SetCenter(point, zoom) => {
                if self.last_center == Some(wanted) {
                    return None;
                }
                self.surface.set_center(point, zoom);
                self.last_center = Some(wanted);
            }
        }
        Some(wanted)
    }

    /// Removes every rendered object. Returns how many were removed.
    pub fn teardown(&mut self) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let count = entries.len();
        for (key, entry) in entries {
            remove(&mut self.surface, &key, entry.handle);
        }
        self.last_center = None;
        self.surface.commit();
        count
    }
}

fn add<S: MapSurface>(surface: &mut S, key: &OverlayKey, shape: &OverlayShape) -> MapHandle {
    match shape {
        OverlayShape::Marker { point, appearance } => surface.add_marker(key, *point, appearance),
        OverlayShape::Path { points, style } => surface.add_path(key, *points, style),
    }
}

fn update<S: MapSurface>(surface: &mut S, handle: MapHandle, shape: &OverlayShape) {
    match shape {
        OverlayShape::Marker { point, appearance } => surface.update_marker(handle, *point, appearance),
        OverlayShape::Path { points, style } => surface.update_path(handle, *points, style),
    }
}

fn remove<S: MapSurface>(surface: &mut S, key: &OverlayKey, handle: MapHandle) {
    if key.role().is_path() {
        surface.remove_path(handle);
    } else {
        surface.remove_marker(handle);
    }
}
