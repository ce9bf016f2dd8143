//! Savegame hooks. The host owns the savegame file; each registered resource
//! travels through it as opaque bytes under a stable key.

use std::collections::BTreeMap;

use bevy::prelude::*;

/// A resource stored in the host savegame under `SAVE_KEY`.
pub trait Saveable: Resource + Default {
    /// Stable across versions; used to find the bytes again on load.
    const SAVE_KEY: &'static str;

    /// `None` when there is nothing worth saving.
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// `bitcode::decode`, falling back to `T::default()` with a warning.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    bitcode::decode(bytes).unwrap_or_else(|e| {
        warn!("{key}: discarding {} undecodable bytes: {e}", bytes.len());
        T::default()
    })
}

struct SaveHooks {
    key: &'static str,
    save: fn(&World) -> Option<Vec<u8>>,
    load: fn(&mut World, Option<&[u8]>),
}

fn save_resource<T: Saveable>(world: &World) -> Option<Vec<u8>> {
    world.get_resource::<T>()?.save_to_bytes()
}

fn load_resource<T: Saveable>(world: &mut World, bytes: Option<&[u8]>) {
    world.insert_resource(bytes.map_or_else(T::default, T::load_from_bytes));
}

/// Loader resources that go into the host savegame.
#[derive(Resource, Default)]
pub struct LoaderSaveData {
    hooks: Vec<SaveHooks>,
}

impl LoaderSaveData {
    /// Returns `false` if the key is already taken.
    pub fn register<T: Saveable>(&mut self) -> bool {
        if self.hooks.iter().any(|h| h.key == T::SAVE_KEY) {
            warn!("save key '{}' registered twice", T::SAVE_KEY);
            return false;
        }
        self.hooks.push(SaveHooks {
            key: T::SAVE_KEY,
            save: save_resource::<T>,
            load: load_resource::<T>,
        });
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.hooks.iter().map(|h| h.key)
    }

    /// Bytes for every registered resource that has something to save.
    pub fn export(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        self.hooks
            .iter()
            .filter_map(|h| (h.save)(world).map(|bytes| (h.key.to_string(), bytes)))
            .collect()
    }

    /// Restore every registered resource. A key missing from `extensions`
    /// resets its resource, so nothing from the previous session survives
    /// loading a savegame. Unknown keys are ignored.
    pub fn import(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for hooks in &self.hooks {
            let bytes = extensions.get(hooks.key).map(Vec::as_slice);
            (hooks.load)(world, bytes);
        }
    }
}

/// Savegame entries for all loader resources. Empty without the plugin.
pub fn export_save_data(world: &World) -> BTreeMap<String, Vec<u8>> {
    world
        .get_resource::<LoaderSaveData>()
        .map(|data| data.export(world))
        .unwrap_or_default()
}

/// Restore loader resources from savegame entries.
pub fn import_save_data(world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
    if !world.contains_resource::<LoaderSaveData>() {
        return;
    }
    world.resource_scope(|world, data: Mut<LoaderSaveData>| data.import(world, extensions));
}
