// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Browser localStorage wrapper for persisting the deck collection.

use memodeck_core::MemoryStore;
use wasm_bindgen::prelude::*;
use web_sys::Storage as WebStorage;

/// The key under which the whole collection is stored as one JSON document.
pub const STORAGE_KEY: &str = "memoDeckData";

pub struct Storage {
    inner: Option<WebStorage>,
}

impl Storage {
    pub fn new() -> Self {
        let inner = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        Self { inner }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, JsValue> {
        match &self.inner {
            Some(storage) => storage.get_item(key),
            None => Ok(None),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), JsValue> {
        match &self.inner {
            Some(storage) => storage.set_item(key, value),
            None => Ok(()),
        }
    }

    /// Read the collection. A missing entry is an empty collection.
    pub fn load_store(&self) -> Result<MemoryStore, JsValue> {
        match self.get(STORAGE_KEY)? {
            Some(data) => MemoryStore::from_json(&data)
                .map_err(|e| JsValue::from_str(&format!("Failed to load decks: {}", e))),
            None => Ok(MemoryStore::default()),
        }
    }

    pub fn save_store(&self, store: &MemoryStore) -> Result<(), JsValue> {
        let data = store
            .to_json()
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize decks: {}", e)))?;
        self.set(STORAGE_KEY, &data)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
