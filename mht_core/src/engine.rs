//! Engine orchestrator: the full hypothesis-management cycle for one scan.
//!
//! # Processing steps per scan
//! 1. Install the batch's reports; grow children on every active leaf;
//!    seed a fresh tree per report
//! 2. Advance the scan clock
//! 3. Clear the active-leaf index
//! 4. Import reports (assign assignment-matrix row numbers)
//! 5. Make a singleton group per fresh tree
//! 6. Label trees and reports by shared-report connectivity (union-find)
//! 7. Split groups that decomposed; merge groups sharing a label
//! 8. Per group: enumerate k-best successor joint hypotheses under the
//!    ratio/count caps, N-scanback pruning as soon as the best is known
//! 9. Sweep unused hypotheses (post-order)
//! 10. Verify-and-collapse tree roots, emitting track events
//! 11. Retire dead trees, reports and groups; rebuild the active-leaf list
//!
//! `clear()` drains the pipeline at shutdown by forcing each group down
//! to its single best hypothesis at progressively shallower depths.

use crate::assignment::{AssignmentProblem, AssignmentQueue};
use crate::events::EventSink;
use crate::group::{Group, GroupHypo};
use crate::hypo::{
    grow_children_for, grow_default_children, HypoArena, HypoKind, TrackTree,
};
use crate::model::{Model, ReportData};
use crate::report::Report;
use crate::types::{HypoId, ReportId, ScanStamp, TrackId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Pruning limits for the tracker.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// N-scanback horizon: a tree deeper than this is pruned down to a
    /// single choice from the root. Must be ≥ 1.
    pub max_depth: i64,
    /// Ratio pruning: group hypotheses below `best × ratio` are dropped.
    /// Must satisfy 0 < ratio ≤ 1; stored internally as its log.
    pub min_g_hypo_ratio: f64,
    /// K-best pruning: at most this many hypotheses per group. Must be ≥ 1.
    pub max_g_hypos: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_g_hypo_ratio: 0.001,
            max_g_hypos: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan input
// ---------------------------------------------------------------------------

struct ScanBatch {
    reports: Vec<Box<dyn ReportData>>,
    dt: f64,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Progress counters, for logging and tests.
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    pub track_trees: usize,
    pub track_hypos: usize,
    pub active_leaves: usize,
    pub groups: usize,
    pub group_hypos: usize,
    pub max_group_hypos: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct TrackerEngine {
    max_depth: i64,
    log_min_g_hypo_ratio: f64,
    max_g_hypos: usize,
    /// Models given a chance to seed a track from every new report.
    start_models: Vec<Rc<dyn Model>>,

    current_time: ScanStamp,
    next_track_id: u64,
    next_report_id: u64,

    arena: HypoArena,
    trees: HashMap<TrackId, TrackTree>,
    /// Tree iteration order (insertion order; removal preserves order).
    tree_order: Vec<TrackId>,
    /// Trees installed this scan, awaiting their singleton groups.
    new_trees: Vec<TrackId>,
    groups: Vec<Group>,
    reports: HashMap<ReportId, Report>,
    old_reports: Vec<ReportId>,
    new_reports: Vec<ReportId>,
    active_leaves: Vec<HypoId>,
    queue: VecDeque<ScanBatch>,
}

impl TrackerEngine {
    pub fn new(config: TrackerConfig, start_models: Vec<Rc<dyn Model>>) -> Self {
        assert!(config.max_depth >= 1, "max_depth must be at least 1");
        assert!(
            config.min_g_hypo_ratio > 0.0 && config.min_g_hypo_ratio <= 1.0,
            "min_g_hypo_ratio must be in (0, 1]"
        );
        assert!(config.max_g_hypos >= 1, "max_g_hypos must be at least 1");
        Self {
            max_depth: config.max_depth,
            log_min_g_hypo_ratio: config.min_g_hypo_ratio.ln(),
            max_g_hypos: config.max_g_hypos,
            start_models,
            current_time: 0,
            next_track_id: 0,
            next_report_id: 0,
            arena: HypoArena::default(),
            trees: HashMap::new(),
            tree_order: Vec::new(),
            new_trees: Vec::new(),
            groups: Vec::new(),
            reports: HashMap::new(),
            old_reports: Vec::new(),
            new_reports: Vec::new(),
            active_leaves: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Queue one scan's worth of measurements. `dt` is the time step the
    /// batch was recorded with; it is forwarded to the models.
    pub fn add_reports(&mut self, reports: Vec<Box<dyn ReportData>>, dt: f64) {
        self.queue.push_back(ScanBatch { reports, dt });
    }

    /// True while any track tree is still alive.
    pub fn is_in_use(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Number of completed scans.
    pub fn current_time(&self) -> ScanStamp {
        self.current_time
    }

    pub fn stats(&self) -> EngineStats {
        let group_hypos: usize = self.groups.iter().map(|g| g.ghypos.len()).sum();
        let max_group_hypos = self.groups.iter().map(|g| g.ghypos.len()).max().unwrap_or(0);
        EngineStats {
            track_trees: self.trees.len(),
            track_hypos: self.arena.len(),
            active_leaves: self.active_leaves.len(),
            groups: self.groups.len(),
            group_hypos,
            max_group_hypos,
        }
    }

    // -----------------------------------------------------------------------
    // scan
    // -----------------------------------------------------------------------

    /// Consume the oldest queued batch. Returns true iff a batch was
    /// processed; false when the queue is empty.
    pub fn scan(&mut self, sink: &mut dyn EventSink) -> bool {
        let Some(batch) = self.queue.pop_front() else {
            return false;
        };

        self.measure_and_validate(batch);
        self.current_time += 1;
        self.active_leaves.clear();
        self.import_new_reports();

        if self.trees.is_empty() {
            return true;
        }

        self.make_new_groups();
        self.find_group_labels();
        self.split_groups();
        self.merge_groups();

        self.prune_and_hypothesize();
        self.remove_unused_hypos();
        self.verify_tree_roots(sink);

        self.remove_unused_trees();
        self.remove_unused_reports();
        self.remove_unused_groups();

        self.update_active_leaves();
        true
    }

    /// Drain the pipeline: force every group down to its single best
    /// hypothesis at depth `max_depth`, then `max_depth − 1`, … 0,
    /// verifying collapsed roots at each step; finally verify whatever
    /// root remains per tree. Leaves the engine empty.
    pub fn clear(&mut self, sink: &mut dyn EventSink) {
        for depth in (0..=self.max_depth).rev() {
            let mut groups = std::mem::take(&mut self.groups);
            for group in &mut groups {
                // Lists are kept best-first, so truncation keeps the best.
                group.ghypos.truncate(1);
                if let Some(best) = group.ghypos.first() {
                    let picks: Vec<HypoId> = best.live_hypos(&self.arena).collect();
                    self.n_scanback_prune(&picks, depth);
                }
            }
            self.groups = groups;
            self.verify_tree_roots(sink);
            self.remove_unused_trees();
            self.remove_unused_reports();
            self.remove_unused_groups();
        }

        // Whatever survived is a bare chain already collapsed onto its
        // root; commit it and drop the tree.
        for tid in std::mem::take(&mut self.tree_order) {
            let tree = self.trees.remove(&tid).expect("tree list out of sync");
            if self.arena.contains(tree.root) {
                if self.arena.get(tree.root).kind.must_verify() {
                    self.emit_verify(sink, tree.root);
                }
                self.arena.remove_subtree(tree.root, &mut self.reports);
            }
        }
        self.groups.clear();
        self.old_reports.clear();
        self.reports.clear();
        self.active_leaves.clear();
    }

    // -----------------------------------------------------------------------
    // Step 1: measure and validate
    // -----------------------------------------------------------------------

    fn measure_and_validate(&mut self, batch: ScanBatch) {
        for model in &self.start_models {
            model.begin_scan(batch.dt);
        }

        for payload in batch.reports {
            let id = ReportId(self.next_report_id);
            self.next_report_id += 1;
            self.reports.insert(id, Report::new(payload));
            self.new_reports.push(id);
        }

        // Grow children on every active leaf: report-free children first,
        // then one pass per new report.
        let leaves = self.active_leaves.clone();
        for leaf in leaves {
            grow_default_children(&mut self.arena, &mut self.reports, leaf);
            for i in 0..self.new_reports.len() {
                let rid = self.new_reports[i];
                grow_children_for(
                    &mut self.arena,
                    &mut self.reports,
                    leaf,
                    rid,
                    &self.start_models,
                );
            }
        }

        // Seed a fresh tree per report. The root is stamped one scan in
        // the past so its children land on the current scan.
        for i in 0..self.new_reports.len() {
            let rid = self.new_reports[i];
            let tid = TrackId(self.next_track_id);
            self.next_track_id += 1;
            let root = self.arena.insert_root(tid, self.current_time - 1);
            self.trees.insert(
                tid,
                TrackTree {
                    group_label: -1,
                    root,
                },
            );
            self.tree_order.push(tid);
            self.new_trees.push(tid);
            grow_default_children(&mut self.arena, &mut self.reports, root);
            grow_children_for(&mut self.arena, &mut self.reports, root, rid, &self.start_models);
        }
    }

    // -----------------------------------------------------------------------
    // Step 4: import reports
    // -----------------------------------------------------------------------

    fn import_new_reports(&mut self) {
        for (row, rid) in self.new_reports.iter().enumerate() {
            self.reports
                .get_mut(rid)
                .expect("fresh report vanished")
                .row = row;
        }
        self.old_reports.append(&mut self.new_reports);
    }

    // -----------------------------------------------------------------------
    // Steps 5–7: grouping
    // -----------------------------------------------------------------------

    fn make_new_groups(&mut self) {
        for tid in std::mem::take(&mut self.new_trees) {
            let tree = &self.trees[&tid];
            self.groups.push(Group::singleton(tree, &self.arena));
        }
    }

    /// Label every tree and report with its connected component in the
    /// bipartite (reports, trees) sharing graph.
    fn find_group_labels(&mut self) {
        for tree in self.trees.values_mut() {
            tree.group_label = -1;
        }

        // Union-find over report nodes [0, n) and tree nodes [n, n + t).
        let n_reports = self.old_reports.len();
        let tree_node: HashMap<TrackId, usize> = self
            .tree_order
            .iter()
            .enumerate()
            .map(|(i, &tid)| (tid, n_reports + i))
            .collect();
        let mut uf = UnionFind::new(n_reports + self.tree_order.len());

        for (ri, rid) in self.old_reports.iter().enumerate() {
            for &h in &self.reports[rid].hypo_links {
                let tree = self.arena.get(h).tree;
                uf.union(ri, tree_node[&tree]);
            }
        }

        // One label per component, numbered in deterministic order.
        let mut label_of_root: HashMap<usize, i64> = HashMap::new();
        let mut next_label = 1i64;
        for (ri, rid) in self.old_reports.iter().enumerate() {
            let root = uf.find(ri);
            let label = *label_of_root.entry(root).or_insert_with(|| {
                let l = next_label;
                next_label += 1;
                l
            });
            self.reports.get_mut(rid).expect("report vanished").group_label = label;
        }
        for &tid in &self.tree_order {
            let root = uf.find(tree_node[&tid]);
            let label = *label_of_root.entry(root).or_insert_with(|| {
                let l = next_label;
                next_label += 1;
                l
            });
            self.trees.get_mut(&tid).expect("tree vanished").group_label = label;
        }
    }

    fn split_groups(&mut self) {
        let groups = std::mem::take(&mut self.groups);
        for group in groups {
            match group.split_if_you_must(&self.arena, &self.trees) {
                Some(children) => self.groups.extend(children),
                None => self.groups.push(group),
            }
        }
    }

    fn merge_groups(&mut self) {
        let groups = std::mem::take(&mut self.groups);
        let mut merged: Vec<(Option<i64>, Group)> = Vec::with_capacity(groups.len());
        for group in groups {
            let label = group.label(&self.arena, &self.trees);
            let existing = label
                .and_then(|l| merged.iter().position(|(ml, _)| *ml == Some(l)));
            match existing {
                Some(i) => merged[i].1.merge(
                    group,
                    &self.arena,
                    self.log_min_g_hypo_ratio,
                    self.max_g_hypos,
                ),
                None => merged.push((label, group)),
            }
        }
        self.groups = merged.into_iter().map(|(_, g)| g).collect();
    }

    // -----------------------------------------------------------------------
    // Step 8: prune and hypothesize
    // -----------------------------------------------------------------------

    fn prune_and_hypothesize(&mut self) {
        let mut groups = std::mem::take(&mut self.groups);
        for group in &mut groups {
            self.hypothesize_group(group);
        }
        self.groups = groups;
    }

    /// Enumerate this group's successor hypotheses best-first, applying
    /// N-scanback pruning as soon as the best one is known, and stopping
    /// at the ratio/count caps.
    fn hypothesize_group(&mut self, group: &mut Group) {
        let mut queue = AssignmentQueue::new();
        for (idx, gh) in group.ghypos.iter_mut().enumerate() {
            gh.record_problem_size(&self.arena);
            if let Some(problem) = AssignmentProblem::build(gh, &self.arena, &self.reports) {
                queue.push_problem(idx, problem);
            }
        }

        let mut new_hypos: Vec<GroupHypo> = Vec::new();
        let mut best_ll: Option<f64> = None;
        while new_hypos.len() < self.max_g_hypos {
            let Some(solution) = queue.pop_best() else {
                break;
            };
            if let Some(best) = best_ll {
                if solution.log_likelihood < best + self.log_min_g_hypo_ratio {
                    break;
                }
            }

            let mut gh = GroupHypo::new();
            for &child in &solution.children {
                gh.add_hypo(child, &self.arena);
            }
            new_hypos.push(gh);

            if best_ll.is_none() {
                best_ll = Some(solution.log_likelihood);
                let picks: Vec<HypoId> =
                    new_hypos[0].live_hypos(&self.arena).collect();
                self.n_scanback_prune(&picks, self.max_depth);

                // Pruning may have invalidated prior hypotheses; their
                // pending problems are dropped before continuing.
                let invalid: Vec<usize> = group
                    .ghypos
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.was_reduced(&self.arena))
                    .map(|(i, _)| i)
                    .collect();
                queue.drop_parents(&invalid);
            }
        }

        group.ghypos = new_hypos;
    }

    /// Retain, for each tree deeper than `depth` among the picked
    /// leaves' trees, only the root child on the path to the pick.
    fn n_scanback_prune(&mut self, picks: &[HypoId], depth: i64) {
        for &leaf in picks {
            if !self.arena.contains(leaf) {
                continue;
            }
            let node = self.arena.get(leaf);
            let root = self.trees[&node.tree].root;
            let tree_depth = node.time_stamp - self.arena.get(root).time_stamp;
            if tree_depth > depth {
                let keep = self
                    .arena
                    .root_branch_of(leaf)
                    .expect("picked leaf detached from its root");
                let others: Vec<HypoId> = self
                    .arena
                    .get(root)
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| c != keep)
                    .collect();
                for c in others {
                    self.arena.remove_subtree(c, &mut self.reports);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step 9: sweep
    // -----------------------------------------------------------------------

    /// Remove every hypothesis that is a leaf not referenced by any group
    /// hypothesis, cascading to parents left childless (post-order).
    fn remove_unused_hypos(&mut self) {
        let referenced: HashSet<HypoId> = self
            .groups
            .iter()
            .flat_map(|g| g.ghypos.iter())
            .flat_map(|gh| gh.live_hypos(&self.arena))
            .collect();

        for i in 0..self.tree_order.len() {
            let tid = self.tree_order[i];
            let root = self.trees[&tid].root;
            if !self.arena.contains(root) {
                continue;
            }
            for h in self.arena.post_order(root) {
                if !self.arena.contains(h) {
                    continue;
                }
                let node = self.arena.get(h);
                if node.is_leaf() && !referenced.contains(&h) {
                    self.arena.remove_subtree(h, &mut self.reports);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step 10: verify
    // -----------------------------------------------------------------------

    /// While a tree's root has exactly one child and does not end the
    /// track, commit it (if it must verify) and promote the child. A
    /// surviving end-node root is committed once; the tree sweep removes
    /// it right after.
    fn verify_tree_roots(&mut self, sink: &mut dyn EventSink) {
        for i in 0..self.tree_order.len() {
            let tid = self.tree_order[i];
            let tree = &self.trees[&tid];
            if !self.arena.contains(tree.root) {
                continue;
            }
            let mut root = tree.root;
            loop {
                let node = self.arena.get(root);
                if node.children.len() != 1 || node.kind.ends_track() {
                    break;
                }
                if node.kind.must_verify() {
                    self.emit_verify(sink, root);
                }
                let children = self.arena.remove_root(root, &mut self.reports);
                root = children[0];
                self.trees.get_mut(&tid).expect("tree vanished").root = root;
            }

            let node = self.arena.get(root);
            if node.kind.ends_track() && node.kind.must_verify() {
                self.emit_verify(sink, root);
            }
        }
    }

    fn emit_verify(&self, sink: &mut dyn EventSink, hypo: HypoId) {
        let node = self.arena.get(hypo);
        let t = node.time_stamp;
        let track = node.tree;
        match &node.kind {
            HypoKind::FalseAlarm => {
                let report = node.report.expect("false alarm without report");
                sink.false_alarm(t, self.reports[&report].data());
            }
            HypoKind::Start { state } => {
                let report = node.report.expect("start without report");
                sink.start_track(track, t, state.as_ref(), self.reports[&report].data());
            }
            HypoKind::Continue { state } => {
                let report = node.report.expect("continue without report");
                sink.continue_track(track, t, state.as_ref(), self.reports[&report].data());
            }
            HypoKind::Skip { state } => sink.skip_track(track, t, state.as_ref()),
            // An End node is born one scan after the last scan the target
            // existed; report that last scan.
            HypoKind::End => sink.end_track(track, t - 1),
            HypoKind::Root | HypoKind::Dummy => {
                unreachable!("roots and dummies never verify")
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step 11: retire
    // -----------------------------------------------------------------------

    /// A tree is dead when its root was swept, ends the track, or when
    /// nothing in it must verify and every leaf ends the track.
    fn remove_unused_trees(&mut self) {
        let mut dead: Vec<TrackId> = Vec::new();
        for &tid in &self.tree_order {
            let root = self.trees[&tid].root;
            if !self.arena.contains(root) {
                dead.push(tid);
                continue;
            }
            if self.arena.get(root).kind.ends_track() {
                dead.push(tid);
                continue;
            }
            let mut in_use = false;
            for h in self.arena.post_order(root) {
                let node = self.arena.get(h);
                if node.kind.must_verify() || (node.is_leaf() && !node.kind.ends_track()) {
                    in_use = true;
                    break;
                }
            }
            if !in_use {
                dead.push(tid);
            }
        }
        for tid in dead {
            let tree = self.trees.remove(&tid).expect("tree vanished");
            if self.arena.contains(tree.root) {
                self.arena.remove_subtree(tree.root, &mut self.reports);
            }
            self.tree_order.retain(|&t| t != tid);
        }
    }

    fn remove_unused_reports(&mut self) {
        let reports = &mut self.reports;
        self.old_reports.retain(|rid| {
            if reports[rid].is_in_use() {
                true
            } else {
                reports.remove(rid);
                false
            }
        });
    }

    fn remove_unused_groups(&mut self) {
        let arena = &self.arena;
        self.groups.retain(|g| g.is_in_use(arena));
    }

    fn update_active_leaves(&mut self) {
        self.active_leaves.clear();
        for &tid in &self.tree_order {
            let root = self.trees[&tid].root;
            self.active_leaves.extend(self.arena.leaves(root));
        }
    }

    // -----------------------------------------------------------------------
    // Invariant checks (test support)
    // -----------------------------------------------------------------------

    /// Walk every group, tree and report and assert the structural
    /// invariants that must hold after each `scan()`. Panics on the
    /// first violation.
    pub fn check_invariants(&self) {
        const EPS: f64 = 1e-6;

        // Trees: depth bound, link integrity.
        for (&tid, tree) in &self.trees {
            assert!(
                self.arena.contains(tree.root),
                "{tid}: root handle dangles"
            );
            let root_t = self.arena.get(tree.root).time_stamp;
            for h in self.arena.post_order(tree.root) {
                let node = self.arena.get(h);
                assert_eq!(node.tree, tid, "{tid}: node on the wrong tree");
                assert!(
                    node.time_stamp - root_t <= self.max_depth,
                    "{tid}: depth bound violated"
                );
                if let Some(p) = node.parent {
                    assert!(self.arena.contains(p), "{tid}: dangling parent link");
                    assert_eq!(
                        self.arena.get(p).time_stamp + 1,
                        node.time_stamp,
                        "{tid}: child time stamp must be parent's + 1"
                    );
                }
                if let Some(r) = node.report {
                    let rep = self.reports.get(&r).expect("node references dead report");
                    assert!(
                        rep.hypo_links.contains(&h),
                        "{tid}: report back-link missing"
                    );
                }
            }
        }

        // Reports: back-links resolve; each report in at most one group.
        for (&rid, report) in &self.reports {
            for &h in &report.hypo_links {
                assert!(
                    self.arena.contains(h),
                    "{rid}: back-link points at a dead hypothesis"
                );
            }
        }
        let mut report_group: HashMap<ReportId, usize> = HashMap::new();
        for (gi, group) in self.groups.iter().enumerate() {
            for gh in &group.ghypos {
                for h in gh.live_hypos(&self.arena) {
                    for r in self.arena.path_reports(h) {
                        let prev = report_group.insert(r, gi);
                        assert!(
                            prev.is_none() || prev == Some(gi),
                            "{r} claimed by two groups"
                        );
                    }
                }
            }
        }

        // Groups: one leaf per tree, conflict-freedom, likelihood
        // accounting, ratio and count bounds.
        for group in &self.groups {
            assert!(
                group.ghypos.len() <= self.max_g_hypos,
                "group holds more than max_g_hypos hypotheses"
            );
            let best = group
                .ghypos
                .first()
                .map(|g| g.log_likelihood)
                .unwrap_or(0.0);
            for gh in &group.ghypos {
                assert!(
                    gh.log_likelihood >= best + self.log_min_g_hypo_ratio - EPS,
                    "ratio bound violated"
                );
                let mut trees_seen = HashSet::new();
                let mut ll = 0.0;
                let mut reports_seen = HashSet::new();
                let mut live = 0usize;
                for h in gh.live_hypos(&self.arena) {
                    live += 1;
                    let node = self.arena.get(h);
                    assert!(node.is_leaf(), "group hypothesis picks a non-leaf");
                    assert!(
                        trees_seen.insert(node.tree),
                        "two picks from one tree"
                    );
                    ll += node.log_likelihood;
                    for r in self.arena.path_reports(h) {
                        assert!(
                            reports_seen.insert(r),
                            "two picked paths share {r}"
                        );
                    }
                }
                // A link dies when a bare-chain tree commits early; its
                // contribution legitimately stays in the stored sum.
                if live == gh.hypos.len() {
                    assert!(
                        (ll - gh.log_likelihood).abs() < EPS,
                        "likelihood accounting off: {} vs {}",
                        ll,
                        gh.log_likelihood
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Union-Find (path halving + union by rank)
// ---------------------------------------------------------------------------

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
