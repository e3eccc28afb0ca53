//! Resolution of the entire dependency graph for a project.
//!
//! Starting from a seed set of resolved project files, the graph transitively
//! resolves every import into a closed set of files plus their import edges.
//! Solidity permits circular imports, so the structure makes no DAG
//! assumption: edges are recorded even when their target was already visited,
//! and a visited index guarantees termination.
//!
//! Traversal is breadth-first. All imports of one traversal level are
//! resolved concurrently (outstanding I/O, joined before the next level), but
//! the recorded file order is deterministic: first enqueued, first appended.
//! The build cache relies on that stable order being reproducible across
//! runs.

use std::collections::HashMap;

use futures_util::future::try_join_all;

use crate::{
    error::{Result, SolcError},
    resolver::{ResolvedFile, Resolver},
};

/// A fully-resolved solidity dependency graph. Each node is a file and edges
/// represent imports between them.
#[derive(Debug)]
pub struct Graph {
    /// all resolved files, in deterministic insertion order
    nodes: Vec<ResolvedFile>,
    /// The indices of `edges` correspond to the `nodes`. That is, `edges[0]`
    /// is the set of outgoing edges for `nodes[0]`.
    edges: Vec<Vec<usize>>,
    /// maps a source name to its index, for fast lookup
    indices: HashMap<String, usize>,
}

impl Graph {
    /// Resolves the transitive closure of the given seed files.
    ///
    /// Fails with [`SolcError::NonUniqueSourceName`] if two distinct files on
    /// disk claim the same logical name, and with the resolver's error if any
    /// import cannot be mapped to a file.
    pub async fn from_resolved_files(
        resolver: &Resolver,
        seeds: Vec<ResolvedFile>,
    ) -> Result<Graph> {
        let mut graph = Graph { nodes: Vec::new(), edges: Vec::new(), indices: HashMap::new() };

        let mut frontier = Vec::with_capacity(seeds.len());
        for file in seeds {
            if let Some(idx) = graph.insert(file)? {
                frontier.push(idx);
            }
        }

        while !frontier.is_empty() {
            // every pending import of this level, in deterministic order
            let pending: Vec<(usize, String)> = frontier
                .iter()
                .flat_map(|&idx| {
                    graph.nodes[idx].imports.iter().map(move |spec| (idx, spec.clone()))
                })
                .collect();

            // fan out the resolution I/O, join before recording anything
            let resolved = try_join_all(
                pending.iter().map(|(from, spec)| resolver.resolve_import(spec, &graph.nodes[*from])),
            )
            .await?;

            let mut next = Vec::new();
            for ((from, _), file) in pending.into_iter().zip(resolved) {
                let target = match graph.indices.get(&file.source_name) {
                    Some(&existing) => {
                        graph.check_identity(existing, &file)?;
                        existing
                    }
                    None => {
                        let idx = graph
                            .insert(file)?
                            .expect("source name was checked to be unknown");
                        next.push(idx);
                        idx
                    }
                };
                // record the edge even if the target was already visited,
                // this is what keeps cycles intact
                graph.edges[from].push(target);
            }
            frontier = next;
        }

        tracing::trace!("resolved {} files", graph.nodes.len());
        Ok(graph)
    }

    /// Appends a file, returning its index, or `None` if the identical file
    /// was already present (duplicate seed).
    fn insert(&mut self, file: ResolvedFile) -> Result<Option<usize>> {
        if let Some(&existing) = self.indices.get(&file.source_name) {
            self.check_identity(existing, &file)?;
            return Ok(None)
        }
        let idx = self.nodes.len();
        self.indices.insert(file.source_name.clone(), idx);
        self.nodes.push(file);
        self.edges.push(Vec::new());
        Ok(Some(idx))
    }

    fn check_identity(&self, existing: usize, file: &ResolvedFile) -> Result<()> {
        let known = &self.nodes[existing];
        if known.path != file.path {
            return Err(SolcError::NonUniqueSourceName {
                source_name: file.source_name.clone(),
                first: known.path.clone(),
                second: file.path.clone(),
            })
        }
        Ok(())
    }

    /// All resolved files in deterministic insertion order.
    pub fn resolved_files(&self) -> &[ResolvedFile] {
        &self.nodes
    }

    /// Returns all source names together with their index in the graph.
    pub fn files(&self) -> &HashMap<String, usize> {
        &self.indices
    }

    /// Gets a node by index.
    pub fn node(&self, index: usize) -> &ResolvedFile {
        &self.nodes[index]
    }

    /// Returns the node indices the given node imports.
    pub fn imported_nodes(&self, from: usize) -> &[usize] {
        &self.edges[from]
    }

    /// Returns the files directly imported by `file`.
    pub fn dependencies(&self, file: &ResolvedFile) -> Vec<&ResolvedFile> {
        self.indices
            .get(&file.source_name)
            .map(|&idx| self.edges[idx].iter().map(|&dep| &self.nodes[dep]).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
