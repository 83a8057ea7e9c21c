use std::cell::RefCell;

use console_error_panic_hook::set_once;
use dataset::{Category, CategorySet, IngestReport};
use foundation::{Viewport, parse_timestamp};
use prefs::{
    BaseLayer, InMemoryPreferenceStore, LocalStoragePreferenceStore, PreferenceStore, PrefsError,
};
use serde::Serialize;
use tracing::{info, warn};
use viewstate::{AppContext, MapConfig, NodeSubmission, RefreshError, RefreshTicket};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

mod browser;
mod console;
mod leaflet;

use browser::{BrowserHistory, api_url_override, fetch_nodes, location_search, post_submission};
use leaflet::{LeafletBackend, meshmap_create_map};

type WebContext = AppContext<LeafletBackend, BrowserHistory>;

thread_local! {
    static CONTEXT: RefCell<Option<WebContext>> = const { RefCell::new(None) };
}

/// Runs `f` on the page context. Errors if called before `mesh_map_init` or
/// re-entrantly from inside another call.
fn with_context<R>(f: impl FnOnce(&mut WebContext) -> R) -> Result<R, JsValue> {
    CONTEXT.with(|cell| {
        let mut guard = cell
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("map context is busy"))?;
        let ctx = guard
            .as_mut()
            .ok_or_else(|| JsValue::from_str("map not initialized"))?;
        Ok(f(ctx))
    })
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn open_prefs() -> Box<dyn PreferenceStore> {
    match LocalStoragePreferenceStore::new() {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!("preferences kept in memory: {err}");
            Box::new(InMemoryPreferenceStore::new())
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    console::init_tracing();
    Ok(())
}

/// Creates the map in `element_id`, restores the URL view and starts the
/// first download. The returned promise settles like [`mesh_map_refresh`]'s,
/// resolving to the number of nodes loaded.
#[wasm_bindgen]
pub fn mesh_map_init(element_id: &str) -> Result<js_sys::Promise, JsValue> {
    let mut config = MapConfig::default();
    if let Some(url) = api_url_override() {
        config = config.with_nodes_url(url);
    }
    info!(nodes_url = %config.nodes_url, "starting map");

    let ctx = AppContext::new(config, LeafletBackend::default(), BrowserHistory, open_prefs());

    // Leaflet may fire these synchronously while the context is borrowed, so
    // they always re-enter on a later task.
    let on_move_end = Closure::<dyn FnMut(f64, f64, f64)>::new(|lat, lon, zoom| {
        spawn_local(async move {
            let settled = with_context(|ctx| {
                ctx.controller_mut()
                    .viewport_settled(Viewport::new(lat, lon, zoom))
            });
            if let Err(err) = settled {
                warn!("viewport change ignored: {:?}", err);
            }
        });
    });
    let on_base_layer = Closure::<dyn FnMut(String)>::new(|name: String| {
        spawn_local(async move {
            if let Err(err) = mesh_map_select_base_layer(&name) {
                warn!("base layer change ignored: {:?}", err);
            }
        });
    });
    meshmap_create_map(
        element_id,
        ctx.base_layer().name(),
        &on_move_end.into_js_value(),
        &on_base_layer.into_js_value(),
    );

    CONTEXT.with(|cell| *cell.borrow_mut() = Some(ctx));
    let ticket = with_context(|ctx| ctx.controller_mut().startup(&location_search()))?
        .map_err(to_js)?;
    Ok(refresh_promise(ticket))
}

/// Fetches the dataset for `ticket` and hands it to the controller. Fails
/// with the text to show when the download or its body is unusable.
async fn run_refresh(ticket: RefreshTicket) -> Result<IngestReport, JsValue> {
    let url = with_context(|ctx| ctx.controller().config().nodes_url.clone())?;
    let outcome = fetch_nodes(&url).await;
    match with_context(|ctx| ctx.controller_mut().complete_refresh(ticket, outcome))? {
        Ok(report) => {
            info!(
                accepted = report.accepted,
                rejected = report.rejected.len(),
                "nodes loaded"
            );
            Ok(report)
        }
        Err(err) => {
            warn!("refresh failed: {err}");
            Err(to_js(err))
        }
    }
}

/// Resolves to the number of nodes loaded.
fn refresh_promise(ticket: RefreshTicket) -> js_sys::Promise {
    future_to_promise(async move {
        let report = run_refresh(ticket).await?;
        Ok(JsValue::from_f64(report.accepted as f64))
    })
}

/// Starts a download unless one is already running. Resolves to `true` once
/// the nodes are on the map, `false` if a download was already running;
/// rejects with the failure text.
#[wasm_bindgen]
pub fn mesh_map_refresh() -> js_sys::Promise {
    future_to_promise(async move {
        match with_context(|ctx| ctx.controller_mut().begin_refresh())? {
            Ok(ticket) => {
                run_refresh(ticket).await?;
                Ok(JsValue::TRUE)
            }
            Err(RefreshError::InFlight) => Ok(JsValue::FALSE),
            Err(err) => Err(to_js(err)),
        }
    })
}

/// Text of the latest refresh failure, until a refresh succeeds.
#[wasm_bindgen]
pub fn mesh_map_last_error() -> Result<Option<String>, JsValue> {
    with_context(|ctx| ctx.controller().last_failure().map(ToString::to_string))
}

#[wasm_bindgen]
pub fn mesh_map_set_categories(codes: &[u8]) -> Result<(), JsValue> {
    let categories: CategorySet = codes
        .iter()
        .map(|&c| Category::from_code(c))
        .filter(|c| c.is_known())
        .collect();
    with_context(|ctx| ctx.controller_mut().set_categories(categories))
}

#[wasm_bindgen]
pub fn mesh_map_toggle_category(code: u8) -> Result<(), JsValue> {
    let category = Category::from_code(code);
    if !category.is_known() {
        return Err(JsValue::from_str(&format!("unknown node type {code}")));
    }
    with_context(|ctx| ctx.controller_mut().toggle_category(category))
}

/// `date` is `YYYY-MM-DD` or RFC 3339.
#[wasm_bindgen]
pub fn mesh_map_set_since(date: &str) -> Result<(), JsValue> {
    let since =
        parse_timestamp(date).ok_or_else(|| JsValue::from_str(&format!("invalid date {date}")))?;
    with_context(|ctx| ctx.controller_mut().set_since(since))
}

#[wasm_bindgen]
pub fn mesh_map_set_cluster_zoom(zoom: u8) -> Result<(), JsValue> {
    with_context(|ctx| ctx.controller_mut().set_cluster_zoom(zoom))
}

#[wasm_bindgen]
pub fn mesh_map_focus_node(public_key: &str) -> Result<bool, JsValue> {
    with_context(|ctx| ctx.controller_mut().focus_node(public_key).is_some())
}

#[derive(Serialize)]
struct SearchHit<'a> {
    public_key: &'a str,
    name: &'a str,
    category: &'static str,
    coords: &'a str,
}

/// JSON array of matches for the search box.
#[wasm_bindgen]
pub fn mesh_map_search(query: &str) -> Result<String, JsValue> {
    with_context(|ctx| {
        let hits: Vec<SearchHit<'_>> = ctx
            .controller()
            .search(query)
            .into_iter()
            .map(|n| SearchHit {
                public_key: n.public_key(),
                name: n.name(),
                category: n.category().label(),
                coords: n.coords(),
            })
            .collect();
        serde_json::to_string(&hits).map_err(to_js)
    })?
}

/// JSON object of the headline counters.
#[wasm_bindgen]
pub fn mesh_map_stats(now_ms: f64) -> Result<String, JsValue> {
    let now = foundation::from_unix_millis(now_ms as i64)
        .ok_or_else(|| JsValue::from_str("invalid time"))?;
    with_context(|ctx| serde_json::to_string(&ctx.controller().stats(now)).map_err(to_js))?
}

#[wasm_bindgen]
pub fn mesh_map_select_base_layer(name: &str) -> Result<(), JsValue> {
    let layer = BaseLayer::from_name(name)
        .ok_or_else(|| JsValue::from_str(&format!("unknown base layer {name}")))?;
    let saved: Result<(), PrefsError> = with_context(|ctx| ctx.select_base_layer(layer))?;
    saved.map_err(to_js)
}

/// Posts a node link. Resolves to the server message and refreshes the
/// dataset; rejects with the error text to show.
#[wasm_bindgen]
pub fn mesh_map_add_node(link: String) -> js_sys::Promise {
    future_to_promise(async move {
        let submission = NodeSubmission::from_link(&link).map_err(to_js)?;
        let url = with_context(|ctx| ctx.controller().config().nodes_url.clone())?;
        let message = post_submission(&url, &submission).await.map_err(to_js)?;
        info!(link = submission.link(), "node submitted");
        match with_context(|ctx| ctx.controller_mut().begin_refresh())? {
            Ok(ticket) => {
                if let Err(err) = run_refresh(ticket).await {
                    warn!("refresh after submission failed: {:?}", err);
                }
            }
            Err(err) => info!("no refresh after submission: {err}"),
        }
        Ok(JsValue::from_str(&message))
    })
}

/// JSON snapshot for debugging from the console.
#[wasm_bindgen]
pub fn mesh_map_debug() -> Result<String, JsValue> {
    with_context(|ctx| serde_json::to_string(&ctx.debug_snapshot(16)).map_err(to_js))?
}
