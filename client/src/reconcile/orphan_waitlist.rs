use std::{
    collections::{HashMap, HashSet, VecDeque},
    time::{Duration, Instant},
};

use log::{debug, info};

use objsync_shared::{GlobalId, LocalId, RegionHandle};

/// Parent an orphan is waiting for
pub type OrphanKey = (RegionHandle, LocalId);

/// Children whose declared parent has not been seen yet, keyed by the
/// parent's region-scoped local id
pub struct OrphanWaitlist {
    waiting_for_parent: HashMap<OrphanKey, HashSet<GlobalId>>,
    child_to_parent: HashMap<GlobalId, OrphanKey>,
    child_ttls: VecDeque<(Instant, GlobalId)>,
    child_ttl: Duration,
}

impl OrphanWaitlist {
    pub fn new(child_ttl: Duration) -> Self {
        Self {
            waiting_for_parent: HashMap::new(),
            child_to_parent: HashMap::new(),
            child_ttls: VecDeque::new(),
            child_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.child_to_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.child_to_parent.is_empty()
    }

    pub fn awaiting(&self, child: &GlobalId) -> Option<OrphanKey> {
        self.child_to_parent.get(child).copied()
    }

    /// Registers `child` as waiting for `parent`. A child waits for one
    /// parent at a time.
    pub fn queue(&mut self, parent: OrphanKey, child: GlobalId, now: Instant) {
        if self.child_to_parent.get(&child) == Some(&parent) {
            return;
        }
        self.remove_child(&child);
        self.waiting_for_parent.entry(parent).or_default().insert(child);
        self.child_to_parent.insert(child, parent);
        self.child_ttls.push_back((now, child));
    }

    /// Takes every child waiting for `parent`
    pub fn take_children(&mut self, parent: OrphanKey) -> Vec<GlobalId> {
        let Some(children) = self.waiting_for_parent.remove(&parent) else {
            return Vec::new();
        };
        let mut children: Vec<GlobalId> = children.into_iter().collect();
        children.sort();
        for child in &children {
            self.child_to_parent.remove(child);
            self.remove_ttl(child);
        }
        info!(
            "Releasing {} orphans waiting for local id {} in region {}",
            children.len(),
            parent.1,
            parent.0
        );
        children
    }

    pub fn remove_child(&mut self, child: &GlobalId) -> Option<OrphanKey> {
        let parent = self.child_to_parent.remove(child)?;
        let mut remove = false;
        if let Some(children) = self.waiting_for_parent.get_mut(&parent) {
            children.remove(child);
            remove = children.is_empty();
        }
        if remove {
            self.waiting_for_parent.remove(&parent);
        }
        self.remove_ttl(child);
        Some(parent)
    }

    /// Drops children that have waited longer than the ttl and returns them
    pub fn expire(&mut self, now: Instant) -> Vec<GlobalId> {
        let mut expired = Vec::new();
        loop {
            let Some((queued_at, _)) = self.child_ttls.front() else {
                break;
            };
            if now.saturating_duration_since(*queued_at) < self.child_ttl {
                break;
            }
            let Some((_, child)) = self.child_ttls.pop_front() else {
                break;
            };
            if let Some(parent) = self.remove_child(&child) {
                debug!(
                    "Orphan {} stopped waiting for local id {} in region {}",
                    child, parent.1, parent.0
                );
                expired.push(child);
            }
        }
        expired
    }

    fn remove_ttl(&mut self, child: &GlobalId) {
        if let Some(index) = self.child_ttls.iter().position(|(_, id)| id == child) {
            self.child_ttls.remove(index);
        }
    }
}
