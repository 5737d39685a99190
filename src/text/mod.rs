//! 3D text meshes from typeface JSON fonts.
//!
//! Fonts arrive asynchronously (a worker thread natively, `fetch` on the
//! web). Whoever starts a load hands a [`PendingText`] to the application,
//! which polls it once per frame and receives an explicit
//! `Result<Mesh, TextLoadError>`.

mod extrude;
mod triangulate;
mod typeface;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Mesh;

pub use extrude::extrude;
pub use triangulate::{group_contours, signed_area, triangulate, Shape};
pub use typeface::{Glyph, Typeface};

/// Extrusion and layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextParams {
    /// Glyph height in world units.
    pub size: f32,
    /// Extrusion depth along +Z.
    #[serde(alias = "height")]
    pub depth: f32,
    /// Points emitted per outline curve.
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_segments: u32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            size: 2.0,
            depth: 0.5,
            curve_segments: 12,
            bevel_enabled: true,
            bevel_thickness: 0.1,
            bevel_size: 0.05,
            bevel_segments: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum TextLoadError {
    #[error("unable to read font {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to fetch font: {0}")]
    Fetch(String),
    #[error("font is not valid typeface JSON")]
    Parse(#[from] serde_json::Error),
    #[error("glyph {glyph:?} has a malformed outline: {reason}")]
    InvalidOutline { glyph: char, reason: String },
    #[error("{0}")]
    Unsupported(String),
    #[error("font has no outlines for {0:?}")]
    NoGlyphs(String),
    #[error("font loader stopped before producing a result")]
    WorkerFailed,
}

/// Where a font comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    Url(String),
    /// Typeface JSON already in memory.
    Inline(String),
}

impl FontSource {
    /// `http://` and `https://` locations are URLs, anything else a path.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub source: FontSource,
    pub content: String,
    pub params: TextParams,
}

impl TextRequest {
    pub fn new(source: FontSource, content: impl Into<String>, params: TextParams) -> Self {
        Self {
            source,
            content: content.into(),
            params,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Waiting,
    Ready(Result<Mesh, TextLoadError>),
    Taken,
}

/// Shared slot a text load delivers into. Clones observe the same slot.
#[derive(Debug, Clone)]
pub struct PendingText {
    slot: Arc<Mutex<Slot>>,
}

impl Default for PendingText {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingText {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Waiting)),
        }
    }

    /// A load that has already finished.
    pub fn resolved(result: Result<Mesh, TextLoadError>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Ready(result))),
        }
    }

    /// Stores the result of the load. Only the first delivery counts.
    pub fn fulfil(&self, result: Result<Mesh, TextLoadError>) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Waiting) {
            *slot = Slot::Ready(result);
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Waiting)
    }

    /// Takes the result if it has arrived. Returns `None` before that and
    /// after the result has been taken once.
    pub fn take(&self) -> Option<Result<Mesh, TextLoadError>> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(result) => Some(result),
            other => {
                *slot = other;
                None
            }
        }
    }
}

/// Builds the extruded mesh for `content` from typeface JSON.
pub fn build_text_mesh(
    json: &str,
    content: &str,
    params: &TextParams,
) -> Result<Mesh, TextLoadError> {
    let face = Typeface::from_json(json)?;
    let contours = face.layout(content, params)?;
    let shapes = group_contours(contours);
    if shapes.is_empty() {
        return Err(TextLoadError::NoGlyphs(content.to_string()));
    }
    let mesh = extrude(&shapes, params);
    debug!(
        "built text {content:?} with {} font {:?}: {} triangles",
        face.glyph_count(),
        face.family_name,
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Loads the font and builds the mesh on the calling thread.
///
/// URL sources need the browser's `fetch` and are rejected natively.
pub fn load_text(request: &TextRequest) -> Result<Mesh, TextLoadError> {
    match &request.source {
        FontSource::Inline(json) => build_text_mesh(json, &request.content, &request.params),
        FontSource::File(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| TextLoadError::Io {
                path: path.clone(),
                source,
            })?;
            build_text_mesh(&json, &request.content, &request.params)
        }
        FontSource::Url(url) => Err(TextLoadError::Unsupported(format!(
            "fetching fonts over the network is only available in the web build ({url})"
        ))),
    }
}

/// Runs [`load_text`] on a worker thread.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_text_load(request: TextRequest) -> PendingText {
    let pending = PendingText::new();
    let guard = DeliveryGuard(pending.clone());
    let spawned = std::thread::Builder::new()
        .name("font-loader".into())
        .spawn(move || {
            let result = load_text(&request);
            guard.0.fulfil(result);
        });
    if let Err(err) = spawned {
        log::error!("failed to start font loader: {err}");
        pending.fulfil(Err(TextLoadError::WorkerFailed));
    }
    pending
}

/// Fails the slot if the worker unwinds before delivering.
#[cfg(not(target_arch = "wasm32"))]
struct DeliveryGuard(PendingText);

#[cfg(not(target_arch = "wasm32"))]
impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        self.0.fulfil(Err(TextLoadError::WorkerFailed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, Instant};

    const FONT: &str = r#"{
        "familyName": "Block",
        "resolution": 1000,
        "boundingBox": { "yMin": 0, "xMin": 0, "yMax": 1000, "xMax": 1000 },
        "underlineThickness": 0,
        "glyphs": {
            "H": { "ha": 1000, "o": "m 0 0 l 1000 0 l 1000 1000 l 0 1000 z" },
            "O": { "ha": 1000, "o": "m 0 0 l 1000 0 l 1000 1000 l 0 1000 z m 250 250 l 250 750 l 750 750 l 750 250 z" },
            " ": { "ha": 500 }
        }
    }"#;

    fn wait_for(pending: &PendingText) -> Result<Mesh, TextLoadError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = pending.take() {
                return result;
            }
            assert!(Instant::now() < deadline, "font loader never delivered");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn builds_mesh_from_inline_font() {
        let request = TextRequest::new(FontSource::Inline(FONT.into()), "HO", TextParams::default());
        let mesh = load_text(&request).unwrap();
        assert!(mesh.triangle_count() > 0);
        assert_eq!(mesh.vertices.len(), mesh.indices.len());
    }

    #[test]
    fn whitespace_only_text_has_no_glyphs() {
        let err = build_text_mesh(FONT, "   ", &TextParams::default()).unwrap_err();
        assert!(matches!(err, TextLoadError::NoGlyphs(_)));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = build_text_mesh("{ nope", "H", &TextParams::default()).unwrap_err();
        assert!(matches!(err, TextLoadError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.typeface.json");
        let request = TextRequest::new(FontSource::File(path.clone()), "H", TextParams::default());
        match load_text(&request) {
            Err(TextLoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn urls_are_rejected_natively() {
        let source = FontSource::from_location("https://example.com/font.json");
        assert!(matches!(source, FontSource::Url(_)));
        let request = TextRequest::new(source, "H", TextParams::default());
        assert!(matches!(
            load_text(&request),
            Err(TextLoadError::Unsupported(_))
        ));
    }

    #[test]
    fn worker_delivers_file_font() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FONT.as_bytes()).unwrap();
        let request = TextRequest::new(
            FontSource::from_location(&file.path().to_string_lossy()),
            "H",
            TextParams::default(),
        );
        let pending = spawn_text_load(request);
        let mesh = wait_for(&pending).unwrap();
        assert!(!mesh.is_empty());
        assert!(pending.take().is_none());
    }

    #[test]
    fn first_delivery_wins() {
        let pending = PendingText::new();
        assert!(pending.take().is_none());
        assert!(pending.is_waiting());
        pending.fulfil(Err(TextLoadError::Fetch("offline".into())));
        pending.fulfil(Err(TextLoadError::WorkerFailed));
        assert!(matches!(pending.take(), Some(Err(TextLoadError::Fetch(_)))));
        assert!(pending.take().is_none());
    }

    #[test]
    fn params_accept_height_alias() {
        let params: TextParams = serde_json::from_str(r#"{ "height": 0.2 }"#).unwrap();
        assert_eq!(params.depth, 0.2);
        assert_eq!(params.size, 2.0);
    }
}
