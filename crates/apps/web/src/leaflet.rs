use foundation::{LatLon, MarkerHandle, Viewport};
use layers::symbology::Glyph;
use layers::{ClusteringConfig, LayerId, MapBackend, MarkerSpec};
use tracing::warn;
use wasm_bindgen::prelude::*;

// Thin Leaflet bridge. Needs `L` and the markercluster plugin on the page.
#[wasm_bindgen(inline_js = "
const S = { map: null, layers: new Map(), markers: new Map() };

export function meshmap_create_map(elementId, baseLayer, onMoveEnd, onBaseLayer) {
    const map = L.map(elementId, { worldCopyJump: true });
    const bases = {
        'OpenStreetMap': L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
            maxZoom: 19,
            attribution: '&copy; OpenStreetMap contributors',
        }),
        'Esri Satellite': L.tileLayer(
            'https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}',
            { maxZoom: 19, attribution: 'Tiles &copy; Esri' },
        ),
    };
    (bases[baseLayer] || bases['OpenStreetMap']).addTo(map);
    L.control.layers(bases).addTo(map);
    map.on('moveend', () => {
        const c = map.getCenter();
        onMoveEnd(c.lat, c.lng, map.getZoom());
    });
    map.on('baselayerchange', (e) => onBaseLayer(e.name));
    S.map = map;
}

export function meshmap_set_view(lat, lon, zoom) {
    if (S.map) S.map.setView([lat, lon], zoom);
}

export function meshmap_create_cluster_layer(id, disableAt) {
    const layer = L.markerClusterGroup({ disableClusteringAtZoom: disableAt });
    S.layers.set(id, layer);
    if (S.map) S.map.addLayer(layer);
}

export function meshmap_remove_cluster_layer(id) {
    const layer = S.layers.get(id);
    if (!layer) return;
    if (S.map) S.map.removeLayer(layer);
    S.layers.delete(id);
}

function detailValue(value) {
    switch (value.kind) {
        case 'coords': {
            const a = document.createElement('a');
            a.target = '_blank';
            a.href = 'https://google.com/maps/place/' + value.text.replace(' ', '');
            a.textContent = value.text;
            return a;
        }
        case 'copy': {
            const a = document.createElement('a');
            a.href = '#';
            a.textContent = 'Copy to clipboard';
            a.addEventListener('click', (e) => {
                e.preventDefault();
                navigator.clipboard.writeText(value.text);
            });
            return a;
        }
        case 'instant':
            return document.createTextNode(new Date(value.text).toLocaleString());
        default:
            return document.createTextNode(value.text);
    }
}

function detailTable(rows) {
    const table = document.createElement('table');
    table.className = 'node-info';
    const body = table.createTBody();
    for (const row of rows) {
        const tr = body.insertRow();
        const label = document.createElement('b');
        label.textContent = row.label;
        tr.insertCell().append(label);
        tr.insertCell().append(detailValue(row.value));
    }
    return table;
}

export function meshmap_create_marker(key, lat, lon, kind, value, color, title, rows) {
    let icon;
    if (kind === 'badge') {
        const el = document.createElement('div');
        el.className = 'node-badge';
        el.style.background = color;
        el.textContent = value;
        icon = L.divIcon({ html: el, className: '', iconSize: [28, 28] });
    } else {
        icon = L.icon({ iconUrl: value, iconSize: [28, 28] });
    }
    const marker = L.marker([lat, lon], { icon, title });
    marker.bindPopup(() => detailTable(JSON.parse(rows)), { minWidth: 350, maxWidth: 350 });
    S.markers.set(key, marker);
}

export function meshmap_release_marker(key) {
    S.markers.delete(key);
}

function each(keys, f) {
    if (!keys) return;
    const out = [];
    for (const k of keys.split(',')) {
        const m = S.markers.get(k);
        if (m) out.push(m);
    }
    f(out);
}

export function meshmap_attach(id, keys) {
    const layer = S.layers.get(id);
    if (layer) each(keys, (ms) => layer.addLayers(ms));
}

export function meshmap_detach(id, keys) {
    const layer = S.layers.get(id);
    if (layer) each(keys, (ms) => layer.removeLayers(ms));
}

export function meshmap_focus(key, lat, lon, zoom) {
    if (!S.map) return;
    S.map.flyTo([lat, lon], zoom);
    const m = S.markers.get(key);
    if (m) S.map.once('moveend', () => m.openPopup());
}
")]
extern "C" {
    pub fn meshmap_create_map(
        element_id: &str,
        base_layer: &str,
        on_move_end: &JsValue,
        on_base_layer: &JsValue,
    );
    fn meshmap_set_view(lat: f64, lon: f64, zoom: f64);
    fn meshmap_create_cluster_layer(id: f64, disable_at: u8);
    fn meshmap_remove_cluster_layer(id: f64);
    #[allow(clippy::too_many_arguments)]
    fn meshmap_create_marker(
        key: &str,
        lat: f64,
        lon: f64,
        kind: &str,
        value: &str,
        color: &str,
        title: &str,
        rows: &str,
    );
    fn meshmap_release_marker(key: &str);
    fn meshmap_attach(id: f64, keys: &str);
    fn meshmap_detach(id: f64, keys: &str);
    fn meshmap_focus(key: &str, lat: f64, lon: f64, zoom: f64);
}

/// [`MapBackend`] drawing into a Leaflet map.
#[derive(Debug, Default)]
pub struct LeafletBackend {
    next_layer: u64,
}

fn join_keys(markers: &[MarkerHandle]) -> String {
    markers
        .iter()
        .map(MarkerHandle::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl MapBackend for LeafletBackend {
    fn create_cluster_layer(&mut self, config: ClusteringConfig) -> LayerId {
        self.next_layer += 1;
        meshmap_create_cluster_layer(self.next_layer as f64, config.disable_clustering_at_zoom);
        LayerId(self.next_layer)
    }

    fn remove_cluster_layer(&mut self, layer: LayerId) {
        meshmap_remove_cluster_layer(layer.0 as f64);
    }

    fn create_marker(&mut self, marker: MarkerHandle, spec: &MarkerSpec) {
        let (kind, value, color) = match &spec.style.glyph {
            Glyph::Badge { text, color } => ("badge", text.clone(), color.to_string()),
            Glyph::Icon { url } | Glyph::Fallback { url } => ("icon", url.clone(), String::new()),
        };
        let rows = match serde_json::to_string(&spec.detail) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(marker = %marker, "popup rows not encoded: {err}");
                "[]".to_string()
            }
        };
        meshmap_create_marker(
            &marker.to_string(),
            spec.position.lat,
            spec.position.lon,
            kind,
            &value,
            &color,
            &spec.style.title,
            &rows,
        );
    }

    fn release_marker(&mut self, marker: MarkerHandle) {
        meshmap_release_marker(&marker.to_string());
    }

    fn attach_markers(&mut self, layer: LayerId, markers: &[MarkerHandle]) {
        meshmap_attach(layer.0 as f64, &join_keys(markers));
    }

    fn detach_markers(&mut self, layer: LayerId, markers: &[MarkerHandle]) {
        meshmap_detach(layer.0 as f64, &join_keys(markers));
    }

    fn set_view(&mut self, viewport: Viewport) {
        meshmap_set_view(viewport.center.lat, viewport.center.lon, viewport.zoom);
    }

    fn focus_marker(&mut self, marker: MarkerHandle, position: LatLon, zoom: f64) {
        meshmap_focus(&marker.to_string(), position.lat, position.lon, zoom);
    }
}
