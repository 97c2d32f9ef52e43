//! Named chain definitions turned into [`ChainSpec`] trees.
//!
//! Configuration refers to chains by name, so a definition can be reused by
//! several parents and, by mistake, by itself. The catalog checks every
//! reference and rejects cycles once, before any file is resolved.

use crate::chain::ChainSpec;
use crate::config::schema::ChainDefinition;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("chain cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("{referenced_by} references unknown chain '{name}'")]
    UnknownChain { name: String, referenced_by: String },

    #[error("chain '{name}' is defined more than once")]
    DuplicateChain { name: String },

    #[error("chain '{name}' is used as a root chain but declares an extractor")]
    RootExtractor { name: String },

    #[error("chain '{name}' is nested but declares no extractor")]
    MissingExtractor { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

#[derive(Debug, Clone)]
pub struct ChainCatalog {
    definitions: Vec<ChainDefinition>,
    by_name: HashMap<String, usize>,
}

impl ChainCatalog {
    pub fn from_definitions(definitions: &[ChainDefinition]) -> Result<Self, CatalogError> {
        let mut by_name = HashMap::new();
        for (idx, definition) in definitions.iter().enumerate() {
            if by_name.insert(definition.name.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateChain {
                    name: definition.name.clone(),
                });
            }
        }

        for definition in definitions {
            for child in &definition.children {
                if !by_name.contains_key(child) {
                    return Err(CatalogError::UnknownChain {
                        name: child.clone(),
                        referenced_by: format!("chain '{}'", definition.name),
                    });
                }
            }
        }

        let catalog = Self {
            definitions: definitions.to_vec(),
            by_name,
        };
        catalog.check_cycles()?;
        Ok(catalog)
    }

    fn check_cycles(&self) -> Result<(), CatalogError> {
        let mut marks: Vec<Option<Mark>> = vec![None; self.definitions.len()];
        for start in 0..self.definitions.len() {
            if marks[start].is_some() {
                continue;
            }
            // (definition, next child to visit)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Some(Mark::Visiting);

            while let Some(top) = stack.last_mut() {
                let (idx, next) = *top;
                let children = &self.definitions[idx].children;
                if next == children.len() {
                    marks[idx] = Some(Mark::Done);
                    stack.pop();
                    continue;
                }
                top.1 += 1;
                let child = self.by_name[&children[next]];

                match marks[child] {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => {
                        let from = stack.iter().position(|&(i, _)| i == child).unwrap_or(0);
                        let mut path: Vec<String> = stack[from..]
                            .iter()
                            .map(|&(i, _)| self.definitions[i].name.clone())
                            .collect();
                        path.push(self.definitions[child].name.clone());
                        return Err(CatalogError::Cycle { path });
                    }
                    None => {
                        marks[child] = Some(Mark::Visiting);
                        stack.push((child, 0));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn definitions(&self) -> &[ChainDefinition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&ChainDefinition> {
        self.by_name.get(name).map(|&idx| &self.definitions[idx])
    }

    /// Build the chain rooted at `name`.
    pub fn spec(&self, name: &str) -> Result<ChainSpec, CatalogError> {
        let definition = self.get(name).ok_or_else(|| CatalogError::UnknownChain {
            name: name.to_string(),
            referenced_by: "lookup".to_string(),
        })?;
        if definition.extract.is_some() {
            return Err(CatalogError::RootExtractor {
                name: name.to_string(),
            });
        }
        self.build(definition, ChainSpec::new(definition.entry))
    }

    fn build(&self, definition: &ChainDefinition, mut spec: ChainSpec) -> Result<ChainSpec, CatalogError> {
        if let Some(rewrite) = &definition.rewrite {
            spec = spec.with_rewriter(rewrite.build());
        }
        for child_name in &definition.children {
            let child = &self.definitions[self.by_name[child_name]];
            let Some(extract) = &child.extract else {
                return Err(CatalogError::MissingExtractor {
                    name: child.name.clone(),
                });
            };
            let nested = self.build(child, ChainSpec::nested(child.entry, extract.build()))?;
            spec = spec.with_child(nested);
        }
        Ok(spec)
    }

    /// Root chains, in definition order.
    pub fn roots(&self) -> impl Iterator<Item = &ChainDefinition> {
        self.definitions
            .iter()
            .filter(|definition| !definition.extensions.is_empty())
    }

    /// The first root chain that handles `path`'s extension.
    pub fn root_for_path(&self, path: &Path) -> Option<&ChainDefinition> {
        let ext = path.extension()?.to_str()?;
        self.roots().find(|definition| definition.handles_extension(ext))
    }

    /// Every extension handled by a root chain, lower-cased and deduplicated.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .roots()
            .flat_map(|definition| definition.extensions.iter())
            .map(|ext| ext.to_ascii_lowercase())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }
}
