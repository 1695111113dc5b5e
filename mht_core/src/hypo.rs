//! Track hypothesis nodes, the arena that owns them, and the tree growth
//! protocol.
//!
//! A track tree holds every surviving interpretation of one candidate
//! target; each root-to-leaf path is one possible history. Nodes are one
//! of seven roles (a closed tagged union, not open polymorphism):
//!
//! - **Root** — tree anchor, likelihood 0
//! - **Dummy** — placeholder child of ended branches, copies its parent's
//!   likelihood
//! - **FalseAlarm** — the report was clutter
//! - **Start** — the report began a new track
//! - **Continue** — an existing track, with a measurement
//! - **Skip** — an existing track, measurement missed
//! - **End** — the track ended
//!
//! Likelihood increments are fixed per role:
//!
//! ```text
//! dummy      = parent
//! false_alarm= report.false_alarm_log_likelihood()
//! start      = state.log_likelihood()
//! continue   = parent + continue + detect + state.log_likelihood()
//! skip       = parent + continue + skip   + state.log_likelihood()
//! end        = parent + skip + end
//! ```
//!
//! Every leaf must grow at least one child per scan — ended branches grow
//! a Dummy so the tree frontier stays at the current scan.

use crate::model::{Model, ModelState};
use crate::report::Report;
use crate::types::{HypoId, ReportId, ScanStamp, TrackId};
use std::collections::HashMap;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Node role
// ---------------------------------------------------------------------------

pub(crate) enum HypoKind {
    Root,
    Dummy,
    FalseAlarm,
    Start { state: Rc<dyn ModelState> },
    Continue { state: Rc<dyn ModelState> },
    Skip { state: Rc<dyn ModelState> },
    End,
}

impl HypoKind {
    /// True for roles that terminate the tree's usefulness on this path.
    pub(crate) fn ends_track(&self) -> bool {
        matches!(
            self,
            HypoKind::Dummy | HypoKind::FalseAlarm | HypoKind::End
        )
    }

    /// True for roles whose commitment must be reported via the event
    /// sink exactly once.
    pub(crate) fn must_verify(&self) -> bool {
        matches!(
            self,
            HypoKind::FalseAlarm
                | HypoKind::Start { .. }
                | HypoKind::Continue { .. }
                | HypoKind::Skip { .. }
                | HypoKind::End
        )
    }

}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

pub(crate) struct TrackHypo {
    /// The tree (and committed track id) this node belongs to.
    pub tree: TrackId,
    pub parent: Option<HypoId>,
    pub children: Vec<HypoId>,
    /// Scan index this node was born in; always parent's + 1.
    pub time_stamp: ScanStamp,
    /// At most one consumed report.
    pub report: Option<ReportId>,
    /// Path log-likelihood from the root, fixed at construction.
    pub log_likelihood: f64,
    pub kind: HypoKind,
}

impl TrackHypo {
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

pub(crate) struct TrackTree {
    /// Group label, recomputed each scan; -1 means unlabeled.
    pub group_label: i64,
    pub root: HypoId,
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Owns every live hypothesis node. Handles are never reused, so a handle
/// that fails to resolve identifies a pruned node; group hypotheses rely
/// on this to notice that pruning invalidated them.
#[derive(Default)]
pub(crate) struct HypoArena {
    nodes: HashMap<HypoId, TrackHypo>,
    next_id: u64,
}

impl HypoArena {
    pub(crate) fn contains(&self, id: HypoId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn get(&self, id: HypoId) -> &TrackHypo {
        self.nodes.get(&id).expect("dangling hypothesis handle")
    }

    pub(crate) fn get_mut(&mut self, id: HypoId) -> &mut TrackHypo {
        self.nodes.get_mut(&id).expect("dangling hypothesis handle")
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self) -> HypoId {
        let id = HypoId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a tree root. Roots carry likelihood 0 and are stamped one
    /// scan in the past so their children land on the current scan.
    pub(crate) fn insert_root(&mut self, tree: TrackId, time_stamp: ScanStamp) -> HypoId {
        let id = self.alloc();
        self.nodes.insert(
            id,
            TrackHypo {
                tree,
                parent: None,
                children: Vec::new(),
                time_stamp,
                report: None,
                log_likelihood: 0.0,
                kind: HypoKind::Root,
            },
        );
        id
    }

    /// Append a child under `parent`, stamping it with the parent's tree
    /// and the next scan index, and registering the report back-link.
    pub(crate) fn install_child(
        &mut self,
        parent: HypoId,
        kind: HypoKind,
        report: Option<ReportId>,
        log_likelihood: f64,
        reports: &mut HashMap<ReportId, Report>,
    ) -> HypoId {
        let id = self.alloc();
        let (tree, time_stamp) = {
            let p = self.get(parent);
            (p.tree, p.time_stamp + 1)
        };
        self.get_mut(parent).children.push(id);
        if let Some(r) = report {
            reports
                .get_mut(&r)
                .expect("child references a retired report")
                .hypo_links
                .push(id);
        }
        self.nodes.insert(
            id,
            TrackHypo {
                tree,
                parent: Some(parent),
                children: Vec::new(),
                time_stamp,
                report,
                log_likelihood,
                kind,
            },
        );
        id
    }

    /// Remove a parentless node only, severing its report back-link and
    /// detaching its children (the caller promotes one of them to root).
    pub(crate) fn remove_root(
        &mut self,
        id: HypoId,
        reports: &mut HashMap<ReportId, Report>,
    ) -> Vec<HypoId> {
        let node = self.nodes.remove(&id).expect("removing a dead root");
        assert!(node.parent.is_none(), "remove_root on a non-root node");
        if let Some(r) = node.report {
            if let Some(rep) = reports.get_mut(&r) {
                rep.unlink(id);
            }
        }
        for &c in &node.children {
            self.get_mut(c).parent = None;
        }
        node.children
    }

    /// Remove `id` and everything under it, severing report back-links on
    /// the way. Group-hypothesis links are left to die silently: a handle
    /// that no longer resolves no longer counts.
    pub(crate) fn remove_subtree(&mut self, id: HypoId, reports: &mut HashMap<ReportId, Report>) {
        if let Some(parent) = self.get(id).parent {
            let siblings = &mut self.get_mut(parent).children;
            if let Some(pos) = siblings.iter().position(|&c| c == id) {
                siblings.swap_remove(pos);
            }
        }
        let mut stack = vec![id];
        while let Some(h) = stack.pop() {
            let node = self.nodes.remove(&h).expect("subtree node vanished");
            if let Some(r) = node.report {
                if let Some(rep) = reports.get_mut(&r) {
                    rep.unlink(h);
                }
            }
            stack.extend(node.children);
        }
    }

    /// Collect the subtree of `root` in post-order (children before
    /// parents), for the unused-hypothesis sweep.
    pub(crate) fn post_order(&self, root: HypoId) -> Vec<HypoId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            order.push(h);
            stack.extend(self.get(h).children.iter().copied());
        }
        order.reverse();
        order
    }

    /// Leaves of the subtree under `root`.
    pub(crate) fn leaves(&self, root: HypoId) -> Vec<HypoId> {
        let mut leaves = Vec::new();
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            let node = self.get(h);
            if node.is_leaf() {
                leaves.push(h);
            } else {
                stack.extend(node.children.iter().copied());
            }
        }
        leaves
    }

    /// The set of reports consumed on the path from the root to `leaf`
    /// (inclusive).
    pub(crate) fn path_reports(&self, leaf: HypoId) -> Vec<ReportId> {
        let mut out = Vec::new();
        let mut cur = Some(leaf);
        while let Some(h) = cur {
            let node = self.get(h);
            if let Some(r) = node.report {
                out.push(r);
            }
            cur = node.parent;
        }
        out
    }

    /// The child of the root that lies on the path from the root down to
    /// `leaf`. `None` if `leaf` is the root itself.
    pub(crate) fn root_branch_of(&self, leaf: HypoId) -> Option<HypoId> {
        let mut cur = leaf;
        loop {
            let node = self.get(cur);
            match node.parent {
                Some(p) if self.get(p).parent.is_none() => return Some(cur),
                Some(p) => cur = p,
                None => return None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Growth protocol
// ---------------------------------------------------------------------------

/// Grow the children of `leaf` that do not depend on any report.
///
/// Ended branches (Dummy / FalseAlarm / End) grow a single Dummy that
/// carries the same likelihood, keeping the frontier current. Roots grow
/// a Dummy at likelihood 0 — the branch where this tree's seed report
/// belongs to some other tree. State-bearing nodes grow an End child
/// (when ending is possible) and one Skip child per coasted successor
/// state (when continuing is possible).
pub(crate) fn grow_default_children(
    arena: &mut HypoArena,
    reports: &mut HashMap<ReportId, Report>,
    leaf: HypoId,
) {
    let node = arena.get(leaf);
    let parent_ll = node.log_likelihood;
    match &node.kind {
        HypoKind::Root | HypoKind::Dummy | HypoKind::FalseAlarm | HypoKind::End => {
            arena.install_child(leaf, HypoKind::Dummy, None, parent_ll, reports);
        }
        HypoKind::Start { state } | HypoKind::Continue { state } | HypoKind::Skip { state } => {
            let state = Rc::clone(state);
            let model = state.model();
            let end_ll = model.end_log_likelihood(state.as_ref());
            let continue_ll = model.continue_log_likelihood(state.as_ref());
            let skip_ll = model.skip_log_likelihood(state.as_ref());

            if end_ll != f64::NEG_INFINITY {
                arena.install_child(
                    leaf,
                    HypoKind::End,
                    None,
                    parent_ll + skip_ll + end_ll,
                    reports,
                );
            }

            if continue_ll != f64::NEG_INFINITY {
                let n = model.begin_new_states(Some(state.as_ref()), None);
                for i in 0..n {
                    if let Some(next) = model.new_state(i, Some(state.as_ref()), None) {
                        let ll = parent_ll + continue_ll + skip_ll + next.log_likelihood();
                        arena.install_child(
                            leaf,
                            HypoKind::Skip { state: next },
                            None,
                            ll,
                            reports,
                        );
                    }
                }
                model.end_new_states();
            }
        }
    }
}

/// Grow the children of `leaf` that consume `report`.
///
/// State-bearing nodes grow one Continue child per successor the model
/// proposes under the report; ended branches grow nothing. Roots grow a
/// FalseAlarm child plus one Start child per seed state any registered
/// model proposes (this arm only runs for the fresh tree seeded by the
/// report itself).
pub(crate) fn grow_children_for(
    arena: &mut HypoArena,
    reports: &mut HashMap<ReportId, Report>,
    leaf: HypoId,
    report: ReportId,
    start_models: &[Rc<dyn Model>],
) {
    let node = arena.get(leaf);
    let parent_ll = node.log_likelihood;
    match &node.kind {
        HypoKind::Dummy | HypoKind::FalseAlarm | HypoKind::End => {}
        HypoKind::Root => {
            let falarm_ll = reports
                .get(&report)
                .expect("seeding from a retired report")
                .false_alarm_log_likelihood();
            arena.install_child(leaf, HypoKind::FalseAlarm, Some(report), falarm_ll, reports);

            for model in start_models {
                let n = {
                    let rep = reports.get(&report).expect("retired report");
                    model.begin_new_states(None, Some(rep.data()))
                };
                for i in 0..n {
                    let next = {
                        let rep = reports.get(&report).expect("retired report");
                        model.new_state(i, None, Some(rep.data()))
                    };
                    if let Some(state) = next {
                        let ll = state.log_likelihood();
                        arena.install_child(leaf, HypoKind::Start { state }, Some(report), ll, reports);
                    }
                }
                model.end_new_states();
            }
        }
        HypoKind::Start { state } | HypoKind::Continue { state } | HypoKind::Skip { state } => {
            let state = Rc::clone(state);
            let model = state.model();
            let continue_ll = model.continue_log_likelihood(state.as_ref());
            let detect_ll = model.detect_log_likelihood(state.as_ref());

            let n = {
                let rep = reports.get(&report).expect("retired report");
                model.begin_new_states(Some(state.as_ref()), Some(rep.data()))
            };
            for i in 0..n {
                let next = {
                    let rep = reports.get(&report).expect("retired report");
                    model.new_state(i, Some(state.as_ref()), Some(rep.data()))
                };
                if let Some(next) = next {
                    let ll = parent_ll + continue_ll + detect_ll + next.log_likelihood();
                    arena.install_child(
                        leaf,
                        HypoKind::Continue { state: next },
                        Some(report),
                        ll,
                        reports,
                    );
                }
            }
            model.end_new_states();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReportData;
    use std::any::Any;

    struct StubReport(f64);

    impl ReportData for StubReport {
        fn false_alarm_log_likelihood(&self) -> f64 {
            self.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn stub_report(map: &mut HashMap<ReportId, Report>, id: u64, falarm_ll: f64) -> ReportId {
        let rid = ReportId(id);
        map.insert(rid, Report::new(Box::new(StubReport(falarm_ll))));
        rid
    }

    #[test]
    fn install_child_stamps_tree_and_time() {
        let mut arena = HypoArena::default();
        let mut reports = HashMap::new();
        let root = arena.insert_root(TrackId(7), -1);
        let child = arena.install_child(root, HypoKind::Dummy, None, 0.0, &mut reports);

        assert_eq!(arena.get(child).tree, TrackId(7));
        assert_eq!(arena.get(child).time_stamp, 0, "child is one scan after its parent");
        assert_eq!(arena.get(root).children, vec![child]);
    }

    #[test]
    fn remove_subtree_severs_report_links() {
        let mut arena = HypoArena::default();
        let mut reports = HashMap::new();
        let rid = stub_report(&mut reports, 0, -2.0);

        let root = arena.insert_root(TrackId(0), -1);
        let fa = arena.install_child(root, HypoKind::FalseAlarm, Some(rid), -2.0, &mut reports);
        let dummy = arena.install_child(fa, HypoKind::Dummy, None, -2.0, &mut reports);
        assert!(reports[&rid].is_in_use());

        arena.remove_subtree(fa, &mut reports);
        assert!(!arena.contains(fa));
        assert!(!arena.contains(dummy));
        assert!(!reports[&rid].is_in_use(), "back-link must not dangle");
        assert!(arena.get(root).children.is_empty());
    }

    #[test]
    fn path_reports_walks_to_root() {
        let mut arena = HypoArena::default();
        let mut reports = HashMap::new();
        let r0 = stub_report(&mut reports, 0, -2.0);
        let r1 = stub_report(&mut reports, 1, -2.0);

        let root = arena.insert_root(TrackId(0), -1);
        let a = arena.install_child(root, HypoKind::FalseAlarm, Some(r0), -2.0, &mut reports);
        let b = arena.install_child(a, HypoKind::Dummy, None, -2.0, &mut reports);
        let c = arena.install_child(b, HypoKind::FalseAlarm, Some(r1), -4.0, &mut reports);

        let mut path = arena.path_reports(c);
        path.sort();
        assert_eq!(path, vec![r0, r1]);
        assert_eq!(arena.root_branch_of(c), Some(a));
        assert_eq!(arena.root_branch_of(root), None);
    }

    #[test]
    fn post_order_yields_children_first() {
        let mut arena = HypoArena::default();
        let mut reports = HashMap::new();
        let root = arena.insert_root(TrackId(0), -1);
        let a = arena.install_child(root, HypoKind::Dummy, None, 0.0, &mut reports);
        let b = arena.install_child(a, HypoKind::Dummy, None, 0.0, &mut reports);

        let order = arena.post_order(root);
        let pos = |id| order.iter().position(|&h| h == id).unwrap();
        assert!(pos(b) < pos(a), "child before parent");
        assert!(pos(a) < pos(root), "parent before root");
    }
}
