//! Hooks for incremental updates.
//!
//! A writer that rewrites the whole file has nothing to track, so the default
//! hooks do nothing. An incremental writer substitutes a tracker that records
//! which objects have to be appended to the revision.

use crate::object::ObjectRef;

/// Receives notifications about objects modified in place.
pub trait UpdateTracker {
    /// The object behind `obj_ref` was modified.
    fn mark_update(&mut self, _obj_ref: ObjectRef) {}

    /// A direct object inside the indirect object `container` was modified,
    /// so the container has to be rewritten.
    fn update_container(&mut self, _container: ObjectRef) {}
}

/// Tracker used by full rewrites.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl UpdateTracker for NoopTracker {}

/// Tracker that remembers every notification, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracker {
    /// Objects passed to [`UpdateTracker::mark_update`]
    pub marked: Vec<ObjectRef>,
    /// Containers passed to [`UpdateTracker::update_container`]
    pub containers: Vec<ObjectRef>,
}

impl UpdateTracker for RecordingTracker {
    fn mark_update(&mut self, obj_ref: ObjectRef) {
        self.marked.push(obj_ref);
    }

    fn update_container(&mut self, container: ObjectRef) {
        self.containers.push(container);
    }
}
