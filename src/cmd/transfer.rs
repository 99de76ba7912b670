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

//! Exporting decks to JSON files and importing them back.

use std::fs::read_to_string;
use std::fs::write;
use std::path::Path;
use std::path::PathBuf;

use memodeck_core::DeckId;
use memodeck_core::DeckStore;
use memodeck_core::ImportOutcome;
use memodeck_core::error::Fallible;
use memodeck_core::exchange::export_file_name;
use memodeck_core::export_deck;
use memodeck_core::import_deck;
use memodeck_core::merge_import;
use walkdir::WalkDir;

/// Export a deck. With no output path the document is returned for printing;
/// an output directory receives a file named after the deck's title.
pub fn export_collection(
    store: &impl DeckStore,
    deck_id: &DeckId,
    output: Option<PathBuf>,
) -> Fallible<Option<String>> {
    let deck = store.deck(deck_id)?;
    let json = export_deck(&deck)?;
    match output {
        None => Ok(Some(json)),
        Some(path) => {
            let path = if path.is_dir() {
                path.join(export_file_name(&deck))
            } else {
                path
            };
            write(&path, json)?;
            log::info!("Exported deck {} to {}", deck.id, path.display());
            Ok(None)
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

/// Import every `.json` file under `paths`. A file that fails to parse is
/// reported and the rest are still imported.
pub fn import_collection(store: &mut impl DeckStore, paths: &[PathBuf]) -> Fallible<ImportReport> {
    let mut report = ImportReport::default();
    for file in json_files(paths)? {
        let outcome = read_to_string(&file)
            .map_err(Into::into)
            .and_then(|text| import_deck(&text))
            .and_then(|deck| merge_import(store, deck));
        match outcome {
            Ok(ImportOutcome::Imported) => report.imported += 1,
            Ok(ImportOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                log::error!("Failed to import file \"{}\": {e}", file.display());
                report.failed.push(file);
            }
        }
    }
    Ok(report)
}

fn json_files(paths: &[PathBuf]) -> Fallible<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && is_json(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use memodeck_core::Deck;
    use memodeck_core::MemoryStore;

    use super::*;
    use crate::helper::TEST_DECK_ID;
    use crate::helper::create_tmp_directory;
    use crate::helper::test_deck;

    #[test]
    fn test_export_to_directory_then_import() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let mut source = MemoryStore::default();
        source.insert_deck(test_deck())?;
        let id = DeckId::new(TEST_DECK_ID);
        assert_eq!(export_collection(&source, &id, Some(dir.clone()))?, None);
        assert!(dir.join("Capitals.json").exists());

        let mut target = MemoryStore::default();
        let report = import_collection(&mut target, &[dir.clone()])?;
        assert_eq!(report.imported, 1);
        assert_eq!(target.deck(&id)?, test_deck());

        // Same id again: skipped.
        let report = import_collection(&mut target, &[dir.join("Capitals.json")])?;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.imported, 0);
        Ok(())
    }

    #[test]
    fn test_export_to_stdout() -> Fallible<()> {
        let mut store = MemoryStore::default();
        store.insert_deck(test_deck())?;
        let json = export_collection(&store, &DeckId::new(TEST_DECK_ID), None)?.unwrap();
        assert!(json.contains("\"title\": \"Capitals\""));
        Ok(())
    }

    #[test]
    fn test_bad_file_does_not_stop_import() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        write(dir.join("a_broken.json"), "{ not json")?;
        write(dir.join("notes.txt"), "ignored")?;
        let other = Deck::new("other", "Other", "");
        write(dir.join("b_other.json"), export_deck(&other)?)?;

        let mut store = MemoryStore::default();
        let report = import_collection(&mut store, &[dir.clone()])?;
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, vec![dir.join("a_broken.json")]);
        assert!(store.contains(&DeckId::new("other"))?);
        Ok(())
    }
}
