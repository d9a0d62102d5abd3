//! Node references: the indirection between a numeric id and either a live
//! [`CompactNodeRecord`] or its overflowed image in the persistent store. A
//! reference is the unit of eviction and reload, and is live XOR overflowed
//! at every instant. All state transitions for one id are serialized by the
//! reference's own mutex; references to distinct ids never contend.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::codec::NodeSerializer;
use crate::errors::SpillGraphError;
use crate::graph::GraphInner;
use crate::node::CompactNodeRecord;

/// Shared handle to a live record. Cheap to clone; mutate through the write
/// lock.
pub type RecordHandle = Arc<RwLock<CompactNodeRecord>>;

pub(crate) enum RefState {
    Empty,
    Live(RecordHandle),
    Removed,
}

struct RefInner {
    id: u64,
    label: String,
    graph: Weak<GraphInner>,
    state: Mutex<RefState>,
}

/// Lightweight `(id, label)` handle resolvable on demand to a live record.
/// Identity is the numeric id alone: two references sharing an id denote the
/// same node.
#[derive(Clone)]
pub struct NodeRef {
    inner: Arc<RefInner>,
}

impl NodeRef {
    pub(crate) fn new(
        id: u64,
        label: String,
        graph: Weak<GraphInner>,
        state: RefState,
    ) -> NodeRef {
        NodeRef {
            inner: Arc::new(RefInner {
                id,
                label,
                graph,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn is_live(&self) -> bool {
        matches!(*self.inner.state.lock(), RefState::Live(_))
    }

    pub fn is_removed(&self) -> bool {
        matches!(*self.inner.state.lock(), RefState::Removed)
    }

    /// Attaches a freshly built record to an empty reference.
    pub fn attach(&self, record: CompactNodeRecord) -> Result<RecordHandle, SpillGraphError> {
        let mut state = self.inner.state.lock();
        match &*state {
            RefState::Empty => {
                let handle: RecordHandle = Arc::new(RwLock::new(record));
                *state = RefState::Live(handle.clone());
                Ok(handle)
            }
            RefState::Live(_) => Err(SpillGraphError::invalid_input(format!(
                "node {} already has a live record",
                self.inner.id
            ))),
            RefState::Removed => Err(SpillGraphError::not_found(format!(
                "node {} was removed",
                self.inner.id
            ))),
        }
    }

    /// The live record, reloading it from the overflow store if this
    /// reference is currently overflowed. May block on file I/O.
    pub fn get(&self) -> Result<RecordHandle, SpillGraphError> {
        let mut state = self.inner.state.lock();
        match &*state {
            RefState::Live(handle) => Ok(handle.clone()),
            RefState::Removed => Err(SpillGraphError::not_found(format!(
                "node {} was removed",
                self.inner.id
            ))),
            RefState::Empty => {
                let graph = self.graph()?;
                let bytes = graph.store().read(self.inner.id)?.ok_or_else(|| {
                    // An empty reference promises a persisted image; a miss
                    // here is a store inconsistency, not a speculative read.
                    SpillGraphError::not_found(format!(
                        "node {} has no persisted image",
                        self.inner.id
                    ))
                })?;
                let (_, record) = graph.deserialize_node(&bytes)?;
                log::trace!("reloaded node {}", self.inner.id);
                let handle: RecordHandle = Arc::new(RwLock::new(record));
                *state = RefState::Live(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Persists the record if it is not already durably current, then
    /// detaches it. A no-op on an already-overflowed reference. May block on
    /// file I/O.
    pub fn evict(&self) -> Result<(), SpillGraphError> {
        let mut state = self.inner.state.lock();
        match &*state {
            RefState::Empty => Ok(()),
            RefState::Removed => Err(SpillGraphError::not_found(format!(
                "node {} was removed",
                self.inner.id
            ))),
            RefState::Live(handle) => {
                let graph = self.graph()?;
                let mut record = handle.write();
                if record.is_dirty() {
                    let bytes = NodeSerializer::serialize(self.inner.id, &record)?;
                    graph.store().persist(self.inner.id, &bytes)?;
                    record.mark_clean();
                }
                drop(record);
                log::trace!("evicted node {}", self.inner.id);
                *state = RefState::Empty;
                Ok(())
            }
        }
    }

    /// Deletes the persisted image, detaches any live record and makes the
    /// reference terminal. Both copies of the node are gone afterwards.
    pub fn remove(&self) -> Result<(), SpillGraphError> {
        let mut state = self.inner.state.lock();
        if matches!(*state, RefState::Removed) {
            return Ok(());
        }
        let graph = self.graph()?;
        graph.store().remove(self.inner.id)?;
        *state = RefState::Removed;
        drop(state);
        graph.forget_ref(self.inner.id);
        Ok(())
    }

    fn graph(&self) -> Result<Arc<GraphInner>, SpillGraphError> {
        self.inner.graph.upgrade().ok_or_else(|| {
            SpillGraphError::store_closed("owning graph was dropped".to_string())
        })
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.lock() {
            RefState::Empty => "empty",
            RefState::Live(_) => "live",
            RefState::Removed => "removed",
        };
        f.debug_struct("NodeRef")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("state", &state)
            .finish()
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for NodeRef {}

impl std::hash::Hash for NodeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}
