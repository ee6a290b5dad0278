//! Directory scanner for discovering CSV files

use crate::error::Result;
use crate::parser::parse_csv;
use crate::registry::TableRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFile {
    /// Table identifier (file stem)
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered files, sorted by table name
    pub files: Vec<DiscoveredFile>,
}

impl ScanResult {
    /// Find a discovered file by table name
    pub fn find(&self, name: &str) -> Option<&DiscoveredFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// All discovered table names
    pub fn table_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// Number of discovered files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Scan one or more directories for CSV files.
///
/// Table names are file stems; when the same stem appears more than once
/// across the scanned roots, the first occurrence (in walk order) wins and
/// the rest are skipped with a warning.
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut file_map: BTreeMap<String, PathBuf> = BTreeMap::new();

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Only process CSV files
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    if file_map.contains_key(name) {
                        eprintln!(
                            "Warning: skipping {} (table '{}' already discovered)",
                            path.display(),
                            name
                        );
                        continue;
                    }
                    file_map.insert(name.to_string(), path.to_path_buf());
                }
            }
        }
    }

    let files = file_map
        .into_iter()
        .map(|(name, path)| DiscoveredFile { name, path })
        .collect();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
    })
}

/// Scan directories and parse every discovered file into a registry
pub fn load_tables<P: AsRef<Path>>(roots: &[P]) -> Result<TableRegistry> {
    let scan = scan_directory(roots)?;

    let mut registry = TableRegistry::new();
    for file in &scan.files {
        let table = parse_csv(&file.path)?;
        registry.insert(table)?;
    }

    Ok(registry)
}
