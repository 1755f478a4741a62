use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;

use crate::asset::Reference;
use crate::error::PrefetchError;

/// A save document, read wholly into memory and never mutated.
#[derive(Debug, Clone)]
pub struct SaveFile {
    path: PathBuf,
    root: Value,
}

impl SaveFile {
    pub fn load(path: &Path) -> Result<Self, PrefetchError> {
        let content = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => PrefetchError::SaveNotFound(path.to_path_buf()),
            _ => PrefetchError::SaveRead {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        })?;
        let root: Value =
            serde_json::from_str(&content).map_err(|err| PrefetchError::MalformedSave {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn from_value(root: Value) -> Self {
        Self {
            path: PathBuf::new(),
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        self.root
            .get("SaveName")
            .and_then(Value::as_str)
            .unwrap_or("???")
    }

    /// Walks the document depth-first and yields every cacheable URL field.
    /// Keys ending in `URL` are candidates; `PageURL` addresses the in-game
    /// tablet and is excluded, as are empty values. Deck art URLs can carry
    /// metadata in curly braces, which is stripped before emission.
    pub fn references(&self) -> References<'_> {
        let mut stack = Vec::new();
        if let Value::Object(map) = &self.root {
            stack.push((Vec::new(), map.iter()));
        }
        References { stack }
    }
}

pub struct References<'a> {
    stack: Vec<(Vec<String>, serde_json::map::Iter<'a>)>,
}

impl Iterator for References<'_> {
    type Item = Reference;

    fn next(&mut self) -> Option<Reference> {
        loop {
            let (path, entries) = self.stack.last_mut()?;
            let Some((key, value)) = entries.next() else {
                self.stack.pop();
                continue;
            };
            let path = path.clone();
            match value {
                Value::Object(map) => {
                    let mut child = path;
                    child.push(key.clone());
                    self.stack.push((child, map.iter()));
                }
                Value::Array(elements) => {
                    let mut child = path;
                    child.push(key.clone());
                    // Pushed in reverse so popping preserves element order.
                    for element in elements.iter().rev() {
                        if let Value::Object(map) = element {
                            self.stack.push((child.clone(), map.iter()));
                        }
                    }
                }
                Value::String(value) if key.ends_with("URL") && key != "PageURL" => {
                    let url = strip_braced_metadata(value);
                    if url.is_empty() {
                        continue;
                    }
                    let mut child = path;
                    child.push(key.clone());
                    return Some(Reference::new(child, url));
                }
                _ => {}
            }
        }
    }
}

fn strip_braced_metadata(url: &str) -> String {
    Regex::new(r"\{.*\}")
        .unwrap()
        .replace_all(url, "")
        .into_owned()
}
