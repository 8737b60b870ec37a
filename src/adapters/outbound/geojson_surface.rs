use crate::domains::overlay::{
    MapHandle, MapSurface, MarkerAppearance, OverlayKey, OverlayRole, PathStyle, SelectionListener,
};
use crate::domains::tracking::GeoPoint;
use geojson::{feature, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

struct RenderedFeature {
    key: OverlayKey,
    geometry: Value,
    properties: JsonObject,
}

#[derive(Debug, Default)]
struct WriteState {
    /// Generation of the newest collection on disk.
    written: u64,
    /// The last attempted write failed; the next commit retries.
    failed: bool,
}

/// One serialized collection waiting to be written.
struct OverlayWrite {
    path: PathBuf,
    body: String,
    generation: u64,
    state: Arc<Mutex<WriteState>>,
}

impl OverlayWrite {
    /// Writes are serialized on the state lock; a write older than what is
    /// already on disk is skipped.
    fn run(self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.written >= self.generation {
            return;
        }
        match std::fs::write(&self.path, self.body) {
            Ok(()) => {
                state.written = self.generation;
                state.failed = false;
            }
            Err(e) => {
                tracing::warn!("Failed to write overlay to {}: {}", self.path.display(), e);
                state.failed = true;
            }
        }
    }
}

/// Map surface that renders the overlay as a GeoJSON `FeatureCollection`.
///
/// Any GeoJSON-capable viewer can display the output file; the camera is kept
/// as a foreign member on the collection. Marker clicks come back in through
/// `select`, which forwards pickup selections to the listener given at
/// construction.
///
/// Inside a tokio runtime the file is written on the blocking pool so the
/// polling task never waits on disk; `flush` waits for the latest write.
pub struct GeoJsonSurface {
    features: HashMap<MapHandle, RenderedFeature>,
    camera: Option<(GeoPoint, u8)>,
    output: Option<PathBuf>,
    listener: Option<Arc<dyn SelectionListener>>,
    dirty: bool,
    generation: u64,
    writes: Arc<Mutex<WriteState>>,
    pending: Option<JoinHandle<()>>,
}

impl GeoJsonSurface {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            features: HashMap::new(),
            camera: None,
            output,
            listener: None,
            dirty: false,
            generation: 0,
            writes: Arc::new(Mutex::new(WriteState::default())),
            pending: None,
        }
    }

    /// Camera shown before the first pass moves it. Draws nothing.
    pub fn with_initial_view(mut self, center: GeoPoint, zoom: u8) -> Self {
        self.camera = Some((center, zoom));
        self.dirty = true;
        self
    }

    pub fn with_selection_listener(mut self, listener: Arc<dyn SelectionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn camera(&self) -> Option<(GeoPoint, u8)> {
        self.camera
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn handle_for(&self, key: &OverlayKey) -> Option<MapHandle> {
        self.features
            .iter()
            .find(|(_, f)| &f.key == key)
            .map(|(handle, _)| *handle)
    }

    /// Handles a click on a rendered object. Only pickup markers are selectable.
    pub fn select(&self, handle: MapHandle) -> bool {
        let Some(feature) = self.features.get(&handle) else {
            return false;
        };
        match (&self.listener, feature.key.role(), feature.key.mission_id()) {
            (Some(listener), OverlayRole::PickupMarker, Some(mission_id)) => {
                listener.on_mission_selected(mission_id);
                true
            }
            _ => false,
        }
    }

    pub fn feature_collection(&self) -> FeatureCollection {
        let mut rendered: Vec<&RenderedFeature> = self.features.values().collect();
        rendered.sort_by(|a, b| a.key.cmp(&b.key));

        let features = rendered
            .into_iter()
            .map(|f| Feature {
                bbox: None,
                geometry: Some(Geometry::new(f.geometry.clone())),
                id: Some(feature::Id::String(f.key.to_string())),
                properties: Some(f.properties.clone()),
                foreign_members: None,
            })
            .collect();

        let foreign_members = self.camera.map(|(center, zoom)| {
            let mut members = JsonObject::new();
            members.insert(
                "camera".to_string(),
                json!({ "center": [center.lng, center.lat], "zoom": zoom }),
            );
            members
        });

        FeatureCollection {
            bbox: None,
            features,
            foreign_members,
        }
    }

    pub fn to_geojson_string(&self) -> String {
        GeoJson::from(self.feature_collection()).to_string()
    }

    /// Waits until the most recent commit has reached the output file.
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Err(e) = pending.await {
                tracing::warn!("Overlay write task failed: {}", e);
            }
        }
    }

    fn insert(&mut self, key: &OverlayKey, geometry: Value, properties: JsonObject) -> MapHandle {
        let handle = MapHandle::fresh();
        self.features.insert(
            handle,
            RenderedFeature {
                key: key.clone(),
                geometry,
                properties,
            },
        );
        self.dirty = true;
        handle
    }

    fn replace(&mut self, handle: MapHandle, geometry: Value, properties: JsonObject) {
        if let Some(feature) = self.features.get_mut(&handle) {
            feature.geometry = geometry;
            feature.properties = with_identity(&feature.key, properties);
            self.dirty = true;
        } else {
            tracing::warn!("GeoJSON surface asked to update unknown handle {}", handle);
        }
    }

    fn drop_feature(&mut self, handle: MapHandle) {
        if self.features.remove(&handle).is_some() {
            self.dirty = true;
        } else {
            tracing::warn!("GeoJSON surface asked to remove unknown handle {}", handle);
        }
    }
}

fn position(point: &GeoPoint) -> Vec<f64> {
    vec![point.lng, point.lat]
}

fn with_identity(key: &OverlayKey, mut properties: JsonObject) -> JsonObject {
    properties.insert("role".to_string(), json!(key.role().as_str()));
    if let Some(id) = key.mission_id() {
        properties.insert("mission_id".to_string(), json!(id.as_str()));
    }
    properties
}

fn marker_properties(appearance: &MarkerAppearance) -> JsonObject {
    let variant = &appearance.variant;
    let label = &appearance.label;
    let mut props = JsonObject::new();
    props.insert("icon".to_string(), json!(variant.icon.glyph()));
    props.insert("color".to_string(), json!(variant.color));
    props.insert("pulsing".to_string(), json!(variant.pulsing));
    props.insert("badge".to_string(), json!(variant.badge));
    props.insert("elevated".to_string(), json!(variant.elevated));
    props.insert("title".to_string(), json!(label.title));
    props.insert("subtitle".to_string(), json!(label.subtitle));
    props.insert("detail".to_string(), json!(label.detail));
    props
}

fn path_properties(style: &PathStyle) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("stroke".to_string(), json!(style.color));
    props.insert("stroke-width".to_string(), json!(style.weight));
    props.insert("stroke-opacity".to_string(), json!(style.opacity));
    props.insert("dash-array".to_string(), json!(style.dash));
    props
}

impl MapSurface for GeoJsonSurface {
    fn add_marker(&mut self, key: &OverlayKey, point: GeoPoint, appearance: &MarkerAppearance) -> MapHandle {
        let props = with_identity(key, marker_properties(appearance));
        self.insert(key, Value::Point(position(&point)), props)
    }

    fn update_marker(&mut self, handle: MapHandle, point: GeoPoint, appearance: &MarkerAppearance) {
        self.replace(handle, Value::Point(position(&point)), marker_properties(appearance));
    }

    fn remove_marker(&mut self, handle: MapHandle) {
        self.drop_feature(handle);
    }

    fn add_path(&mut self, key: &OverlayKey, points: [GeoPoint; 2], style: &PathStyle) -> MapHandle {
        let line = Value::LineString(points.iter().map(position).collect());
        let props = with_identity(key, path_properties(style));
        self.insert(key, line, props)
    }

    fn update_path(&mut self, handle: MapHandle, points: [GeoPoint; 2], style: &PathStyle) {
        let line = Value::LineString(points.iter().map(position).collect());
        self.replace(handle, line, path_properties(style));
    }

    fn remove_path(&mut self, handle: MapHandle) {
        self.drop_feature(handle);
    }

    fn pan_to(&mut self, point: GeoPoint) {
        let zoom = self.camera.map(|(_, zoom)| zoom).unwrap_or(crate::domains::overlay::DEFAULT_ZOOM);
        self.camera = Some((point, zoom));
        self.dirty = true;
    }

    fn set_center(&mut self, point: GeoPoint, zoom: u8) {
        self.camera = Some((point, zoom));
        self.dirty = true;
    }

    /// Writes the collection to the output file when something changed or the
    /// previous write failed.
    fn commit(&mut self) {
        let retry = std::mem::take(&mut self.writes.lock().unwrap_or_else(PoisonError::into_inner).failed);
        if !self.dirty && !retry {
            return;
        }
        self.dirty = false;
        let Some(path) = self.output.clone() else {
            return;
        };

        self.generation += 1;
        let write = OverlayWrite {
            path,
            body: self.to_geojson_string(),
            generation: self.generation,
            state: self.writes.clone(),
        };
        match tokio::runtime::Handle::try_current() {
            // Superseded writes are left to finish; they skip themselves.
            Ok(runtime) => self.pending = Some(runtime.spawn_blocking(move || write.run())),
            Err(_) => write.run(),
        }
    }
}
