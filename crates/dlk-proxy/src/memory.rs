//! In-process peer for tests and for the peer host.
//!
//! [`MemoryPeer`] answers [`ProxyRequest`]s from two panels held in memory,
//! one per [`ObjectKind`]. It can imitate an older peer (no individual
//! removal), an unreachable peer, and a peer whose title index lags behind
//! insertions.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use dlk_pack::{with_default_extension, WorkspaceReader, WorkspaceWriter};
use dlk_protocol::{codes, methods, ProxyRequest, ProxyResponse};
use dlk_types::{DataObject, ObjectKind};
use serde_json::Value;
use tracing::debug;

use crate::channel::ProxyChannel;
use crate::error::{ProxyError, ProxyResult};

/// Computation hook. Receives the operation name and its parameters.
pub type CalcHandler =
    Box<dyn Fn(&str, Option<Value>) -> Result<Option<Value>, String> + Send + Sync>;

#[derive(Default)]
struct PeerState {
    panels: BTreeMap<ObjectKind, Vec<DataObject>>,
    selection: Option<(ObjectKind, Vec<String>)>,
    /// Remaining title probes for which a freshly added object stays hidden.
    hidden: HashMap<(ObjectKind, String), u32>,
}

pub struct MemoryPeer {
    version: String,
    methods: Vec<String>,
    index_lag: u32,
    calc: Option<CalcHandler>,
    state: Mutex<PeerState>,
    available: AtomicBool,
    closes: AtomicUsize,
}

impl MemoryPeer {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            methods: methods::ALL.iter().map(|m| m.to_string()).collect(),
            index_lag: 0,
            calc: None,
            state: Mutex::new(PeerState::default()),
            available: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Imitate a peer that cannot remove individual objects.
    pub fn without_removal(mut self) -> Self {
        self.methods.retain(|m| m != methods::REMOVE_OBJECT);
        self
    }

    /// Hide each added object from the next `probes` title listings of its
    /// panel.
    pub fn with_index_lag(mut self, probes: u32) -> Self {
        self.index_lag = probes;
        self
    }

    pub fn with_calc(mut self, handler: CalcHandler) -> Self {
        self.calc = Some(handler);
        self
    }

    /// An unavailable peer fails every call at the transport level.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// How many times a channel to this peer was closed.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        let state = self.state.lock().expect("lock poisoned");
        state.panels.values().map(Vec::len).sum()
    }

    /// Titles in a panel, ignoring index lag.
    pub fn titles(&self, panel: ObjectKind) -> Vec<String> {
        let state = self.state.lock().expect("lock poisoned");
        state
            .panels
            .get(&panel)
            .map(|objs| objs.iter().map(|o| o.title().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn selection(&self) -> Option<(ObjectKind, Vec<String>)> {
        self.state.lock().expect("lock poisoned").selection.clone()
    }

    pub fn supports(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Answer one request. Failures become [`ProxyResponse::Error`].
    pub fn dispatch(&self, request: ProxyRequest) -> ProxyResponse {
        debug!(request = request.type_name(), "peer request");
        let mut state = self.state.lock().expect("lock poisoned");
        match request {
            ProxyRequest::GetVersion => ProxyResponse::Version(self.version.clone()),
            ProxyRequest::GetMethodList => ProxyResponse::Methods(self.methods.clone()),
            ProxyRequest::GetObjectTitles { panel } => {
                ProxyResponse::Titles(Self::visible_titles(&mut state, panel))
            }
            ProxyRequest::GetObject { title, panel } => state
                .panels
                .get(&panel)
                .and_then(|objs| objs.iter().find(|o| o.title() == title))
                .map(|o| ProxyResponse::Object(o.clone()))
                .unwrap_or_else(|| {
                    ProxyResponse::error(codes::NOT_FOUND, format!("no {panel} titled '{title}'"))
                }),
            ProxyRequest::AddObject { object } => {
                let panel = object.kind();
                let title = object.title().to_string();
                if self.index_lag > 0 {
                    state.hidden.insert((panel, title), self.index_lag);
                }
                state.panels.entry(panel).or_default().push(object);
                ProxyResponse::Ack
            }
            ProxyRequest::SelectObjects { titles, panel } => {
                let existing = state.panels.get(&panel);
                let missing: Vec<&String> = titles
                    .iter()
                    .filter(|t| !existing.is_some_and(|objs| objs.iter().any(|o| o.title() == t.as_str())))
                    .collect();
                if let Some(first) = missing.first() {
                    return ProxyResponse::error(
                        codes::NOT_FOUND,
                        format!("no {panel} titled '{first}'"),
                    );
                }
                state.selection = Some((panel, titles));
                ProxyResponse::Ack
            }
            ProxyRequest::RemoveObject { .. } => {
                if !self.supports(methods::REMOVE_OBJECT) {
                    return ProxyResponse::error(
                        codes::UNSUPPORTED,
                        "remove_object is not available on this peer",
                    );
                }
                if let Some((panel, titles)) = state.selection.take() {
                    if let Some(objs) = state.panels.get_mut(&panel) {
                        objs.retain(|o| !titles.iter().any(|t| t == o.title()));
                    }
                    for title in titles {
                        state.hidden.remove(&(panel, title));
                    }
                }
                ProxyResponse::Ack
            }
            ProxyRequest::ResetAll => {
                *state = PeerState::default();
                ProxyResponse::Ack
            }
            ProxyRequest::SaveWorkspace { path } => match Self::save(&state, Path::new(&path)) {
                Ok(()) => ProxyResponse::Ack,
                Err(e) => ProxyResponse::error(codes::INTERNAL, e),
            },
            ProxyRequest::LoadWorkspace { paths, reset_all } => {
                if reset_all {
                    *state = PeerState::default();
                }
                for path in paths {
                    let path = Path::new(&path);
                    if !path.exists() && !with_default_extension(path).exists() {
                        return ProxyResponse::error(
                            codes::NOT_FOUND,
                            format!("no such file: {}", path.display()),
                        );
                    }
                    if let Err(e) = Self::load(&mut state, path) {
                        return ProxyResponse::error(codes::INTERNAL, e);
                    }
                }
                ProxyResponse::Ack
            }
            ProxyRequest::Calc { name, params } => {
                drop(state);
                self.run_calc(&name, params)
            }
        }
    }

    fn visible_titles(state: &mut PeerState, panel: ObjectKind) -> Vec<String> {
        let PeerState { panels, hidden, .. } = state;
        let mut titles = Vec::new();
        for obj in panels.get(&panel).map(Vec::as_slice).unwrap_or_default() {
            let key = (panel, obj.title().to_string());
            match hidden.get_mut(&key) {
                Some(remaining) if *remaining > 0 => *remaining -= 1,
                _ => titles.push(key.1),
            }
        }
        hidden.retain(|_, remaining| *remaining > 0);
        titles
    }

    fn save(state: &PeerState, path: &Path) -> Result<(), String> {
        let mut writer = WorkspaceWriter::new();
        for obj in state.panels.values().flatten() {
            writer.add_object(obj.title(), obj).map_err(|e| e.to_string())?;
        }
        writer.finish(path).map_err(|e| e.to_string())?;
        Ok(())
    }

    fn load(state: &mut PeerState, path: &Path) -> Result<(), String> {
        let path = if path.exists() {
            path.to_path_buf()
        } else {
            with_default_extension(path)
        };
        let objects = WorkspaceReader::open(&path)
            .and_then(|r| r.objects())
            .map_err(|e| format!("{}: {e}", path.display()))?;
        for (name, mut obj) in objects {
            obj.set_title(&name);
            let panel = state.panels.entry(obj.kind()).or_default();
            panel.retain(|o| o.title() != name);
            panel.push(obj);
        }
        Ok(())
    }

    fn run_calc(&self, name: &str, params: Option<String>) -> ProxyResponse {
        let Some(handler) = &self.calc else {
            return ProxyResponse::error(
                codes::UNSUPPORTED,
                format!("calc '{name}': no computation engine on this peer"),
            );
        };
        let params = match params.map(|p| serde_json::from_str::<Value>(&p)).transpose() {
            Ok(p) => p,
            Err(e) => return ProxyResponse::error(codes::INTERNAL, format!("invalid params: {e}")),
        };
        match handler(name, params) {
            Ok(result) => ProxyResponse::CalcResult(result.map(|v| v.to_string())),
            Err(message) => ProxyResponse::error(codes::INTERNAL, message),
        }
    }
}

impl Default for MemoryPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyChannel for MemoryPeer {
    fn call(&self, request: ProxyRequest) -> ProxyResult<ProxyResponse> {
        if !self.is_available() {
            return Err(ProxyError::Transport("peer unavailable".into()));
        }
        Ok(self.dispatch(request))
    }

    fn endpoint(&self) -> String {
        "memory://peer".to_string()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MemoryPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPeer")
            .field("version", &self.version)
            .field("object_count", &self.object_count())
            .field("available", &self.is_available())
            .finish()
    }
}
