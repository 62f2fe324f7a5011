//! Workspace ownership, generation tickets and deferred imports.
//!
//! An import captures a [`ImportTicket`] when it starts. By the time the
//! result arrives the user may have edited the document or started another
//! import; applying with an outdated ticket is refused and the tree is left
//! as it was.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use log::debug;

use super::{ImportDispatcher, ImportOutcome, ImportSource, ImportState};
use crate::error::{Error, Result};
use crate::model::DocumentTree;

/// Generation captured when an import started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTicket {
    generation: u64,
}

impl ImportTicket {
    /// Generation this ticket was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of applying an import to a workspace.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    /// The tree was replaced; carries the full state trace
    Applied {
        /// States including the final `Applied`
        states: Vec<ImportState>,
    },
    /// The workspace changed since the ticket was issued
    Stale {
        /// Generation on the ticket
        ticket: u64,
        /// Generation of the workspace
        current: u64,
    },
}

impl ApplyResult {
    /// Check whether the tree was replaced.
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyResult::Applied { .. })
    }
}

/// The document being edited, with a generation counter.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    tree: DocumentTree,
    generation: u64,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workspace holding an existing tree.
    pub fn with_tree(tree: DocumentTree) -> Self {
        Self {
            tree,
            generation: 0,
        }
    }

    /// Get the current tree.
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Get the current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Capture the current generation for an import about to start.
    pub fn ticket(&self) -> ImportTicket {
        ImportTicket {
            generation: self.generation,
        }
    }

    /// Edit the tree in place. Invalidates outstanding tickets.
    pub fn edit<F: FnOnce(&mut DocumentTree)>(&mut self, f: F) {
        f(&mut self.tree);
        self.generation += 1;
    }

    /// Replace the whole tree. Invalidates outstanding tickets.
    pub fn replace(&mut self, tree: DocumentTree) {
        self.tree = tree;
        self.generation += 1;
    }

    /// Swap in an import result if nothing changed since `ticket` was taken.
    pub fn apply(&mut self, ticket: ImportTicket, outcome: ImportOutcome) -> ApplyResult {
        if ticket.generation != self.generation {
            debug!(
                "discarding stale import (ticket {}, workspace {})",
                ticket.generation, self.generation
            );
            return ApplyResult::Stale {
                ticket: ticket.generation,
                current: self.generation,
            };
        }

        let ImportOutcome {
            tree, mut states, ..
        } = outcome;
        self.replace(tree);
        states.push(ImportState::Applied);
        ApplyResult::Applied { states }
    }
}

/// An import running on a worker thread.
#[derive(Debug)]
pub struct PendingImport {
    receiver: Receiver<Result<ImportOutcome>>,
}

impl PendingImport {
    /// Block until the import finishes.
    pub fn wait(self) -> Result<ImportOutcome> {
        self.receiver
            .recv()
            .map_err(|_| Error::Catastrophic("import worker exited without a result".into()))?
    }

    /// Take the result if it is ready.
    ///
    /// Returns `None` while the worker is still running.
    pub fn try_take(&self) -> Option<Result<ImportOutcome>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Catastrophic(
                "import worker exited without a result".into(),
            ))),
        }
    }
}

/// Run an import on a worker thread.
pub fn spawn_import(source: ImportSource, dispatcher: Arc<ImportDispatcher>) -> PendingImport {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let result = dispatcher.import(&source);
        let _ = tx.send(result);
    });
    PendingImport { receiver: rx }
}

/// Read a file asynchronously, then import it.
///
/// The read is the only suspension point; extraction runs to completion on
/// the calling task.
#[cfg(feature = "async")]
pub async fn import_path_async<P: AsRef<std::path::Path>>(
    path: P,
    dispatcher: &ImportDispatcher,
) -> Result<ImportOutcome> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::ReadFailure(format!("{}: {}", path.display(), e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dispatcher.import(&ImportSource::from_bytes(name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, Node};

    fn outcome_for(text: &str) -> ImportOutcome {
        ImportDispatcher::new()
            .import(&ImportSource::from_bytes("a.txt", text))
            .unwrap()
    }

    #[test]
    fn test_apply_with_fresh_ticket() {
        let mut workspace = Workspace::new();
        let ticket = workspace.ticket();
        let result = workspace.apply(ticket, outcome_for("hello"));
        match result {
            ApplyResult::Applied { states } => {
                assert_eq!(states.last(), Some(&ImportState::Applied));
            }
            other => panic!("expected Applied, got {:?}", other),
        }
        assert_eq!(workspace.tree().plain_text(), "hello");
        assert_eq!(workspace.generation(), 1);
    }

    #[test]
    fn test_edit_makes_ticket_stale() {
        let mut workspace = Workspace::with_tree(DocumentTree::from_html("<p>mine</p>"));
        let ticket = workspace.ticket();
        workspace.edit(|tree| tree.push(Node::Element(Element::new("p").with_text("typed"))));

        let result = workspace.apply(ticket, outcome_for("imported"));
        assert_eq!(
            result,
            ApplyResult::Stale {
                ticket: 0,
                current: 1
            }
        );
        assert_eq!(workspace.tree().plain_text(), "mine\ntyped");
    }

    #[test]
    fn test_second_import_wins() {
        let mut workspace = Workspace::new();
        let first = workspace.ticket();
        let second = workspace.ticket();
        assert!(workspace.apply(second, outcome_for("second")).is_applied());
        assert!(!workspace.apply(first, outcome_for("first")).is_applied());
        assert_eq!(workspace.tree().plain_text(), "second");
    }

    #[test]
    fn test_spawn_import_wait() {
        let dispatcher = Arc::new(ImportDispatcher::new());
        let pending = spawn_import(ImportSource::from_bytes("n.md", "# Hi"), dispatcher);
        let outcome = pending.wait().unwrap();
        assert!(outcome.html.contains("<h1>Hi</h1>"));
    }

    #[test]
    fn test_try_take_eventually_ready() {
        let dispatcher = Arc::new(ImportDispatcher::new());
        let pending = spawn_import(ImportSource::from_bytes("n.txt", "x"), dispatcher);
        let outcome = loop {
            if let Some(result) = pending.try_take() {
                break result.unwrap();
            }
            thread::yield_now();
        };
        assert_eq!(outcome.html, "x");
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_import_path_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n.txt");
        std::fs::write(&path, "async text").unwrap();
        let dispatcher = ImportDispatcher::new();

        let outcome = import_path_async(&path, &dispatcher).await.unwrap();
        assert_eq!(outcome.html, "async text");

        let err = import_path_async(dir.path().join("missing.txt"), &dispatcher)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadFailure(_)));
    }
}
