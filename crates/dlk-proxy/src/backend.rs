use std::path::Path;
use std::sync::Arc;

use dlk_protocol::{codes, methods};
use dlk_store::{BackendKind, StoreError, StoreResult, WorkspaceBackend};
use dlk_types::{DataObject, ObjectKind};
use serde_json::Value;
use tracing::debug;

use crate::channel::{PanelProbe, ProxyChannel};
use crate::error::ProxyError;

/// Backend storing objects in a remote peer reached over a [`ProxyChannel`].
///
/// Objects are addressed by title; each lives in the panel of its kind.
/// `rename` and overwriting `add` take several round trips and are not
/// atomic on the peer.
pub struct ProxyBackend {
    channel: Arc<dyn ProxyChannel>,
}

impl ProxyBackend {
    /// Wrap a channel, verifying the peer answers a version query.
    pub fn connect(channel: Arc<dyn ProxyChannel>) -> StoreResult<Self> {
        let version = channel.get_version().map_err(|e| {
            StoreError::Connection(format!("peer at {} did not answer: {e}", channel.endpoint()))
        })?;
        debug!(endpoint = %channel.endpoint(), version = %version, "connected to peer");
        Ok(Self { channel })
    }

    /// The raw channel, for peer operations outside the backend contract.
    pub fn channel(&self) -> Arc<dyn ProxyChannel> {
        Arc::clone(&self.channel)
    }

    fn probe(&self, panel: ObjectKind) -> PanelProbe {
        let probe = PanelProbe::run(self.channel.as_ref(), panel);
        if let PanelProbe::Unavailable(reason) = &probe {
            debug!(panel = %panel, reason = %reason, "panel probe failed, treating as empty");
        }
        probe
    }

    /// Panel holding `title`, signals first.
    fn panel_of(&self, title: &str) -> Option<ObjectKind> {
        ObjectKind::ALL
            .into_iter()
            .find(|panel| self.probe(*panel).contains(title))
    }

    /// Like [`panel_of`](Self::panel_of), but also fetches by title in
    /// each panel, so an object the peer has not indexed yet still counts.
    fn located(&self, title: &str) -> Option<ObjectKind> {
        self.panel_of(title).or_else(|| {
            ObjectKind::ALL
                .into_iter()
                .find(|panel| self.channel.get_object(title, *panel).is_ok())
        })
    }

    fn not_found(&self, name: &str) -> StoreError {
        StoreError::not_found(name, self.list().unwrap_or_default())
    }

    fn supports_removal(&self) -> StoreResult<bool> {
        let advertised = self.channel.get_method_list()?;
        Ok(advertised.iter().any(|m| m == methods::REMOVE_OBJECT))
    }
}

impl WorkspaceBackend for ProxyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RpcProxy
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.channel.endpoint())
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let mut titles = Vec::new();
        for panel in ObjectKind::ALL {
            titles.extend(self.probe(panel).into_titles());
        }
        Ok(titles)
    }

    fn get(&self, name: &str) -> StoreResult<DataObject> {
        match self.panel_of(name) {
            Some(panel) => Ok(self.channel.get_object(name, panel)?),
            None => Err(self.not_found(name)),
        }
    }

    fn add(&self, name: &str, mut object: DataObject, overwrite: bool) -> StoreResult<()> {
        if self.located(name).is_some() {
            if !overwrite {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            self.remove(name)?;
        }
        object.set_title(name);
        self.channel.add_object(object)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        let panel = self.located(name).ok_or_else(|| self.not_found(name))?;
        if !self.supports_removal()? {
            return Err(StoreError::Unsupported(
                "this peer cannot remove individual objects; use clear() instead".into(),
            ));
        }
        self.channel.select_objects(&[name.to_string()], panel)?;
        self.channel.remove_object(true)?;
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> StoreResult<()> {
        if !self.exists(old) {
            return Err(self.not_found(old));
        }
        if self.located(new).is_some() {
            return Err(StoreError::AlreadyExists(new.to_string()));
        }
        let object = self.get(old)?.retitled(new);
        self.remove(old)?;
        self.channel.add_object(object)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.list().is_ok_and(|names| names.iter().any(|n| n == name))
    }

    fn clear(&self) -> StoreResult<()> {
        Ok(self.channel.reset_all()?)
    }

    fn save(&self, path: &Path) -> StoreResult<()> {
        Ok(self.channel.save_workspace(&path.to_string_lossy())?)
    }

    fn load(&self, path: &Path) -> StoreResult<()> {
        let paths = [path.to_string_lossy().into_owned()];
        match self.channel.load_workspace(&paths, false) {
            Err(ProxyError::Remote { code: codes::NOT_FOUND, .. }) => {
                Err(StoreError::FileNotFound(path.to_path_buf()))
            }
            other => Ok(other?),
        }
    }

    fn calc(&self, name: &str, params: Option<&Value>) -> StoreResult<Option<Value>> {
        Ok(self.channel.calc(name, params)?)
    }

    fn shutdown(&self) {
        self.channel.close();
    }
}

impl std::fmt::Debug for ProxyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBackend")
            .field("endpoint", &self.channel.endpoint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPeer;
    use dlk_types::{Grid, Image, Signal};

    fn signal(title: &str, y: Vec<f64>) -> DataObject {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Signal::new(title, x, y).unwrap().into()
    }

    fn image(title: &str) -> DataObject {
        Image::new(title, Grid::filled(2, 2, 3.0)).into()
    }

    fn backend_with(peer: MemoryPeer) -> (Arc<MemoryPeer>, ProxyBackend) {
        let peer = Arc::new(peer);
        let backend = ProxyBackend::connect(peer.clone()).unwrap();
        (peer, backend)
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    #[test]
    fn connect_requires_live_peer() {
        let peer = Arc::new(MemoryPeer::new());
        peer.set_available(false);
        let err = ProxyBackend::connect(peer).unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn shutdown_closes_channel() {
        let (peer, backend) = backend_with(MemoryPeer::new());
        backend.shutdown();
        assert_eq!(peer.close_count(), 1);
        assert_eq!(backend.kind(), BackendKind::RpcProxy);
        assert_eq!(backend.endpoint().as_deref(), Some("memory://peer"));
    }

    // -----------------------------------------------------------------------
    // Contract
    // -----------------------------------------------------------------------

    #[test]
    fn add_get_across_panels() {
        let (_, backend) = backend_with(MemoryPeer::new());
        backend.add("s1", signal("whatever", vec![0.0, 1.0, 0.0]), false).unwrap();
        backend.add("i1", image("i1"), false).unwrap();

        assert_eq!(backend.list().unwrap(), vec!["s1", "i1"]);
        let got = backend.get("s1").unwrap();
        assert_eq!(got.title(), "s1");
        assert_eq!(got.as_signal().unwrap().y(), &[0.0, 1.0, 0.0]);
        assert_eq!(backend.get("i1").unwrap(), image("i1"));
    }

    #[test]
    fn add_existing_without_overwrite_fails() {
        let (_, backend) = backend_with(MemoryPeer::new());
        backend.add("s1", signal("s1", vec![1.0]), false).unwrap();
        let err = backend.add("s1", signal("s1", vec![2.0]), false).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn overwrite_replaces_content() {
        let (peer, backend) = backend_with(MemoryPeer::new());
        backend.add("s1", signal("s1", vec![1.0]), false).unwrap();
        backend.add("s1", signal("s1", vec![2.0]), true).unwrap();
        assert_eq!(peer.object_count(), 1);
        assert_eq!(backend.get("s1").unwrap().as_signal().unwrap().y(), &[2.0]);
    }

    #[test]
    fn overwrite_on_old_peer_is_unsupported() {
        let (peer, backend) = backend_with(MemoryPeer::new().without_removal());
        backend.add("s1", signal("s1", vec![1.0]), false).unwrap();
        let err = backend.add("s1", signal("s1", vec![2.0]), true).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(_)));
        assert_eq!(peer.object_count(), 1);
    }

    #[test]
    fn get_missing_lists_available() {
        let (_, backend) = backend_with(MemoryPeer::new());
        backend.add("i1", image("i1"), false).unwrap();
        match backend.get("nope").unwrap_err() {
            StoreError::NotFound { name, available } => {
                assert_eq!(name, "nope");
                assert_eq!(available, vec!["i1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn remove_selects_then_removes() {
        let (peer, backend) = backend_with(MemoryPeer::new());
        backend.add("a", image("a"), false).unwrap();
        backend.add("b", image("b"), false).unwrap();
        backend.remove("a").unwrap();
        assert_eq!(peer.titles(ObjectKind::Image), vec!["b"]);
        assert!(backend.remove("a").unwrap_err().is_not_found());
    }

    #[test]
    fn remove_on_old_peer_leaves_selection_untouched() {
        let (peer, backend) = backend_with(MemoryPeer::new().without_removal());
        backend.add("a", signal("a", vec![1.0]), false).unwrap();
        let err = backend.remove("a").unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(_)));
        assert!(peer.selection().is_none());
        // absent names still report NotFound first
        assert!(backend.remove("zzz").unwrap_err().is_not_found());
    }

    #[test]
    fn rename_retitles() {
        let (_, backend) = backend_with(MemoryPeer::new());
        backend.add("a", signal("a", vec![4.0, 5.0]), false).unwrap();
        backend.add("c", image("c"), false).unwrap();
        backend.rename("a", "b").unwrap();

        assert!(!backend.exists("a"));
        assert!(backend.exists("b"));
        assert_eq!(backend.get("b").unwrap().title(), "b");
        assert!(backend.rename("missing", "x").unwrap_err().is_not_found());
        assert!(matches!(
            backend.rename("b", "c").unwrap_err(),
            StoreError::AlreadyExists(_)
        ));
    }

    #[test]
    fn unreachable_peer_lists_empty_and_exists_false() {
        let (peer, backend) = backend_with(MemoryPeer::new());
        backend.add("a", image("a"), false).unwrap();
        peer.set_available(false);
        assert!(backend.list().unwrap().is_empty());
        assert!(!backend.exists("a"));
        assert!(matches!(backend.clear().unwrap_err(), StoreError::Connection(_)));
    }

    #[test]
    fn clear_resets_peer() {
        let (peer, backend) = backend_with(MemoryPeer::new());
        backend.add("a", image("a"), false).unwrap();
        backend.add("b", signal("b", vec![1.0]), false).unwrap();
        backend.clear().unwrap();
        assert_eq!(peer.object_count(), 0);
    }

    #[test]
    fn save_and_load_through_peer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.dlw");

        let (_, backend) = backend_with(MemoryPeer::new());
        backend.add("a", signal("a", vec![1.0, 2.0]), false).unwrap();
        backend.save(&path).unwrap();
        backend.clear().unwrap();
        backend.load(&path).unwrap();
        assert_eq!(backend.get("a").unwrap(), signal("a", vec![1.0, 2.0]));
    }

    #[test]
    fn load_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (_, backend) = backend_with(MemoryPeer::new());
        let err = backend.load(&dir.path().join("absent.dlw")).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Lagging index
    // -----------------------------------------------------------------------

    #[test]
    fn unindexed_name_is_taken() {
        let (peer, backend) = backend_with(MemoryPeer::new().with_index_lag(5));
        peer.add_object(signal("b", vec![1.0])).unwrap();
        assert!(!backend.exists("b"));

        let err = backend.add("b", signal("b", vec![2.0]), false).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        backend.add("a", image("a"), false).unwrap();
        let err = backend.rename("a", "b").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(peer.titles(ObjectKind::Signal), vec!["b"]);
    }

    #[test]
    fn overwrite_replaces_unindexed_object() {
        let (peer, backend) = backend_with(MemoryPeer::new().with_index_lag(5));
        peer.add_object(signal("b", vec![1.0])).unwrap();
        backend.add("b", signal("b", vec![2.0]), true).unwrap();
        assert_eq!(peer.object_count(), 1);
        let stored = peer.get_object("b", ObjectKind::Signal).unwrap();
        assert_eq!(stored.as_signal().unwrap().y(), &[2.0]);
    }

    #[test]
    fn calc_is_forwarded() {
        let peer = MemoryPeer::new().with_calc(Box::new(|name: &str, _params: Option<Value>| -> Result<Option<Value>, String> {
            Ok(Some(Value::String(format!("ran {name}"))))
        }));
        let (_, backend) = backend_with(peer);
        let result = backend.calc("fft", None).unwrap();
        assert_eq!(result, Some(Value::String("ran fft".into())));
    }
}
