//! View layer boundary.
//!
//! The coordinator never inspects the UI directly. It asks a [`ViewState`]
//! whether the live view is showing and whether a chart mount point exists,
//! at the moment it needs to know.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// What the coordinator needs to know about the operator's views.
pub trait ViewState: Send + Sync {
    /// True while the live telemetry view is the visible one.
    fn is_live_view_active(&self) -> bool;

    /// True if a chart can currently be rendered into `id`.
    fn mount_point_exists(&self, id: &str) -> bool;
}

#[derive(Debug)]
struct ViewInner {
    current_view: usize,
    live_view_index: usize,
    mounts: HashSet<String>,
}

/// Thread-safe in-memory view state.
///
/// Front-ends report view switches and mount/unmount events into it; the
/// coordinator reads it through [`ViewState`].
#[derive(Debug)]
pub struct SharedViewState {
    inner: RwLock<ViewInner>,
}

impl SharedViewState {
    /// Start on view 0 with no mount points.
    pub fn new(live_view_index: usize) -> Self {
        Self {
            inner: RwLock::new(ViewInner {
                current_view: 0,
                live_view_index,
                mounts: HashSet::new(),
            }),
        }
    }

    pub fn set_current_view(&self, index: usize) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current_view = index;
    }

    pub fn current_view(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_view
    }

    pub fn live_view_index(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live_view_index
    }

    pub fn mount(&self, id: impl Into<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mounts
            .insert(id.into());
    }

    pub fn unmount(&self, id: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mounts
            .remove(id);
    }
}

impl ViewState for SharedViewState {
    fn is_live_view_active(&self) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.current_view == inner.live_view_index
    }

    fn mount_point_exists(&self, id: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .mounts
            .contains(id)
    }
}
