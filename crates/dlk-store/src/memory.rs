use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use dlk_pack::{with_default_extension, WorkspaceReader, WorkspaceWriter};
use dlk_types::DataObject;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BackendKind, WorkspaceBackend};

/// In-process backend holding objects in a sorted map.
///
/// Objects are moved in on `add` and cloned out on `get`, so callers never
/// share state with the stored copy.
pub struct LocalStore {
    objects: RwLock<BTreeMap<String, DataObject>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Clone every entry, in name order.
    pub fn entries(&self) -> Vec<(String, DataObject)> {
        self.objects
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn names_of(map: &BTreeMap<String, DataObject>) -> Vec<String> {
        map.keys().cloned().collect()
    }

    fn resolve_load_path(path: &Path) -> StoreResult<PathBuf> {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        let with_ext = with_default_extension(path);
        if with_ext != path && with_ext.exists() {
            return Ok(with_ext);
        }
        Err(StoreError::FileNotFound(path.to_path_buf()))
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceBackend for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        Ok(Self::names_of(&self.objects.read().expect("lock poisoned")))
    }

    fn get(&self, name: &str) -> StoreResult<DataObject> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name, Self::names_of(&map)))
    }

    fn add(&self, name: &str, mut object: DataObject, overwrite: bool) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        if !overwrite && map.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        object.set_title(name);
        map.insert(name.to_string(), object);
        debug!(name, "object stored");
        Ok(())
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        if map.remove(name).is_none() {
            return Err(StoreError::not_found(name, Self::names_of(&map)));
        }
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        if !map.contains_key(old) {
            return Err(StoreError::not_found(old, Self::names_of(&map)));
        }
        if map.contains_key(new) {
            return Err(StoreError::AlreadyExists(new.to_string()));
        }
        if let Some(mut object) = map.remove(old) {
            object.set_title(new);
            map.insert(new.to_string(), object);
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(name)
    }

    fn clear(&self) -> StoreResult<()> {
        self.objects.write().expect("lock poisoned").clear();
        Ok(())
    }

    fn save(&self, path: &Path) -> StoreResult<()> {
        let mut writer = WorkspaceWriter::new();
        {
            let map = self.objects.read().expect("lock poisoned");
            for (name, object) in map.iter() {
                writer.add_object(name, object)?;
            }
        }
        let count = writer.len();
        let written = writer.finish(path)?;
        debug!(path = %written.display(), count, "workspace saved");
        Ok(())
    }

    /// Merge a saved workspace into the store. Same-named entries are
    /// replaced. A path without extension also matches its `.dlw` file.
    fn load(&self, path: &Path) -> StoreResult<()> {
        let path = Self::resolve_load_path(path)?;
        let objects = WorkspaceReader::open(&path)?.objects()?;
        let count = objects.len();
        let mut map = self.objects.write().expect("lock poisoned");
        map.extend(objects);
        debug!(path = %path.display(), count, "workspace loaded");
        Ok(())
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlk_pack::{encode_object, TYPE_ATTR};
    use dlk_types::{Grid, Image, ObjectKind, Signal};
    use proptest::prelude::*;

    fn signal(title: &str, y: Vec<f64>) -> DataObject {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Signal::new(title, x, y).unwrap().into()
    }

    fn image(title: &str) -> DataObject {
        Image::new(title, Grid::filled(2, 3, 1.0)).into()
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    #[test]
    fn add_list_get_remove_scenario() {
        let store = LocalStore::new();
        store.add("s1", signal("s1", vec![0.0, 1.0, 0.0]), false).unwrap();
        assert_eq!(store.list().unwrap(), vec!["s1"]);

        let got = store.get("s1").unwrap();
        assert_eq!(got.as_signal().unwrap().y(), &[0.0, 1.0, 0.0]);

        store.remove("s1").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn add_sets_title_to_name() {
        let store = LocalStore::new();
        store.add("renamed", signal("original", vec![1.0]), false).unwrap();
        assert_eq!(store.get("renamed").unwrap().title(), "renamed");
    }

    #[test]
    fn add_twice_without_overwrite_fails() {
        let store = LocalStore::new();
        store.add("a", signal("a", vec![1.0]), false).unwrap();
        let err = store.add("a", signal("a", vec![2.0]), false).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(n) if n == "a"));

        store.add("a", signal("a", vec![2.0]), true).unwrap();
        assert_eq!(store.get("a").unwrap().as_signal().unwrap().y(), &[2.0]);
    }

    #[test]
    fn get_missing_reports_available_names() {
        let store = LocalStore::new();
        store.add("b", image("b"), false).unwrap();
        store.add("a", image("a"), false).unwrap();
        match store.get("zzz").unwrap_err() {
            StoreError::NotFound { name, available } => {
                assert_eq!(name, "zzz");
                assert_eq!(available, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn remove_missing_is_not_found() {
        let store = LocalStore::new();
        assert!(store.remove("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn returned_objects_are_copies() {
        let store = LocalStore::new();
        store.add("s", signal("s", vec![1.0, 2.0]), false).unwrap();
        let mut got = store.get("s").unwrap();
        got.set_title("mutated");
        assert_eq!(store.get("s").unwrap().title(), "s");
    }

    #[test]
    fn rename_moves_and_retitles() {
        let store = LocalStore::new();
        let original = signal("a", vec![3.0, 4.0]);
        store.add("a", original.clone(), false).unwrap();
        store.rename("a", "b").unwrap();

        assert!(!store.exists("a"));
        assert!(store.exists("b"));
        let got = store.get("b").unwrap();
        assert_eq!(got.title(), "b");
        assert_eq!(got.retitled("a"), original);
    }

    #[test]
    fn rename_errors() {
        let store = LocalStore::new();
        store.add("a", image("a"), false).unwrap();
        store.add("b", image("b"), false).unwrap();

        assert!(store.rename("missing", "c").unwrap_err().is_not_found());
        let err = store.rename("a", "b").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(n) if n == "b"));
        // failed renames leave both entries in place
        assert_eq!(store.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn clear_empties_store() {
        let store = LocalStore::new();
        store.clear().unwrap();
        store.add("a", image("a"), false).unwrap();
        store.add("b", signal("b", vec![1.0]), false).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn rich_signal() -> DataObject {
        Signal::new("sig", vec![0.0, 1.0, 2.0], vec![5.0, 6.0, 7.0])
            .unwrap()
            .with_errors(Some(vec![0.1, 0.2, 0.3]), Some(vec![1.0, 1.5, 2.0]))
            .unwrap()
            .into()
    }

    fn masked_image() -> DataObject {
        let data = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let mask = Grid::from_rows(vec![vec![false, true], vec![true, false]]).unwrap();
        Image::new("img", data).with_mask(mask).unwrap().into()
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.dlw");

        let store = LocalStore::new();
        store.add("sig", rich_signal(), false).unwrap();
        store.add("img", masked_image(), false).unwrap();
        store.save(&path).unwrap();

        let loaded = LocalStore::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.list().unwrap(), vec!["img", "sig"]);

        let sig = loaded.get("sig").unwrap();
        assert_eq!(sig, rich_signal());
        let s = sig.as_signal().unwrap();
        assert!(s.xlabel.is_none());
        assert!(s.xunit.is_none());

        let img = loaded.get("img").unwrap();
        assert_eq!(img, masked_image());
        let i = img.as_image().unwrap();
        assert!(i.x0.is_none());
        assert!(i.zunit.is_none());
    }

    #[test]
    fn save_without_extension_then_load_by_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("session");

        let store = LocalStore::new();
        store.add("sig", rich_signal(), false).unwrap();
        store.save(&base).unwrap();
        assert!(dir.path().join("session.dlw").exists());

        let loaded = LocalStore::new();
        loaded.load(&base).unwrap();
        assert!(loaded.exists("sig"));
    }

    #[test]
    fn load_merges_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.dlw");

        let saved = LocalStore::new();
        saved.add("shared", signal("shared", vec![9.0]), false).unwrap();
        saved.save(&path).unwrap();

        let store = LocalStore::new();
        store.add("shared", signal("shared", vec![1.0]), false).unwrap();
        store.add("local", image("local"), false).unwrap();
        store.load(&path).unwrap();

        assert_eq!(store.list().unwrap(), vec!["local", "shared"]);
        assert_eq!(store.get("shared").unwrap().as_signal().unwrap().y(), &[9.0]);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.dlw");
        let err = LocalStore::new().load(&path).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(p) if p == path));
    }

    #[test]
    fn load_falls_back_to_structure_on_bad_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.dlw");

        let mut group = encode_object("sig", &rich_signal()).unwrap();
        group.set_attr(TYPE_ATTR, "ImageObj");
        let mut writer = WorkspaceWriter::new();
        writer.add_group(group);
        writer.finish(&path).unwrap();

        let store = LocalStore::new();
        store.load(&path).unwrap();
        assert_eq!(store.get("sig").unwrap().kind(), ObjectKind::Signal);
    }

    #[test]
    fn load_garbage_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.dlw");
        std::fs::write(&path, b"definitely not a workspace file").unwrap();
        let err = LocalStore::new().load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn add_then_get_preserves_content(
            name in "[a-z][a-z0-9_]{0,11}",
            y in prop::collection::vec(-1.0e9f64..1.0e9, 0..64),
        ) {
            let store = LocalStore::new();
            let object = signal(&name, y);
            store.add(&name, object.clone(), false).unwrap();
            prop_assert_eq!(store.get(&name).unwrap(), object);
        }
    }
}
