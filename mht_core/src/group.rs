//! Groups of coupled track trees and their joint hypotheses.
//!
//! A group is a maximal set of trees coupled through shared reports. Each
//! [`GroupHypo`] is one joint interpretation: exactly one leaf per tree in
//! the group, mutually compatible (no report used twice), scored as the
//! sum of the picked leaves' path log-likelihoods.
//!
//! Group hypotheses link to leaves through arena handles. When pruning
//! removes a picked leaf the link dies silently; the hypothesis notices
//! by comparing its recorded problem size against the count of links that
//! still resolve ([`GroupHypo::was_reduced`]).

use crate::hypo::{HypoArena, TrackTree};
use crate::types::{HypoId, TrackId};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// GroupHypo
// ---------------------------------------------------------------------------

pub(crate) struct GroupHypo {
    /// Sum of the picked leaves' path log-likelihoods.
    pub log_likelihood: f64,
    /// Link count recorded when this hypothesis was converted into an
    /// assignment problem. If N-scanback pruning has since removed any
    /// picked leaf, fewer links resolve than were recorded.
    pub num_used: usize,
    /// Picked leaves, one per tree of the group. Handles may be dead.
    pub hypos: Vec<HypoId>,
}

impl GroupHypo {
    pub(crate) fn new() -> Self {
        Self {
            log_likelihood: 0.0,
            num_used: 0,
            hypos: Vec::new(),
        }
    }

    pub(crate) fn add_hypo(&mut self, id: HypoId, arena: &HypoArena) {
        self.log_likelihood += arena.get(id).log_likelihood;
        self.hypos.push(id);
    }

    /// Links that still resolve to live hypotheses.
    pub(crate) fn live_hypos<'a>(&'a self, arena: &'a HypoArena) -> impl Iterator<Item = HypoId> + 'a {
        self.hypos.iter().copied().filter(|&h| arena.contains(h))
    }

    pub(crate) fn live_count(&self, arena: &HypoArena) -> usize {
        self.live_hypos(arena).count()
    }

    /// True once pruning has removed a leaf this hypothesis postulated.
    pub(crate) fn was_reduced(&self, arena: &HypoArena) -> bool {
        self.num_used > self.live_count(arena)
    }

    /// Record the link count at problem-construction time.
    pub(crate) fn record_problem_size(&mut self, arena: &HypoArena) {
        self.num_used = self.live_count(arena);
    }

    /// Sorted live pick set; identical sets mean identical hypotheses.
    fn pick_key(&self, arena: &HypoArena) -> Vec<HypoId> {
        let mut key: Vec<HypoId> = self.live_hypos(arena).collect();
        key.sort_unstable();
        key
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

pub(crate) struct Group {
    /// Best first once scored.
    pub ghypos: Vec<GroupHypo>,
}

impl Group {
    /// Fresh singleton group for a newly installed tree: one hypothesis
    /// picking the tree's root.
    pub(crate) fn singleton(tree: &TrackTree, arena: &HypoArena) -> Self {
        let mut gh = GroupHypo::new();
        gh.add_hypo(tree.root, arena);
        Self { ghypos: vec![gh] }
    }

    pub(crate) fn is_in_use(&self, arena: &HypoArena) -> bool {
        self.ghypos.iter().any(|g| g.live_count(arena) > 0)
    }

    /// The group label shared by this group's trees, read off the first
    /// live pick.
    pub(crate) fn label(&self, arena: &HypoArena, trees: &HashMap<TrackId, TrackTree>) -> Option<i64> {
        let gh = self.ghypos.first()?;
        let h = gh.live_hypos(arena).next()?;
        trees.get(&arena.get(h).tree).map(|t| t.group_label)
    }

    /// Distinct tree ids appearing across this group's hypotheses.
    pub(crate) fn tree_ids(&self, arena: &HypoArena) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self
            .ghypos
            .iter()
            .flat_map(|g| g.live_hypos(arena))
            .map(|h| arena.get(h).tree)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Sort best-first and apply ratio then count pruning.
    pub(crate) fn sort_and_prune(&mut self, log_min_ratio: f64, max_g_hypos: usize) {
        self.ghypos.sort_by(|a, b| {
            b.log_likelihood
                .partial_cmp(&a.log_likelihood)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(best) = self.ghypos.first().map(|g| g.log_likelihood) {
            let floor = best + log_min_ratio;
            self.ghypos.retain(|g| g.log_likelihood >= floor);
        }
        self.ghypos.truncate(max_g_hypos);
    }

    /// Merge `other` into `self`: materialize the product of the two
    /// hypothesis lists, truncating by ratio and count during
    /// construction.
    pub(crate) fn merge(
        &mut self,
        other: Group,
        arena: &HypoArena,
        log_min_ratio: f64,
        max_g_hypos: usize,
    ) {
        let mut product = Vec::with_capacity(self.ghypos.len() * other.ghypos.len());
        for a in &self.ghypos {
            for b in &other.ghypos {
                let mut gh = GroupHypo::new();
                for h in a.live_hypos(arena).chain(b.live_hypos(arena)) {
                    gh.add_hypo(h, arena);
                }
                product.push(gh);
            }
        }
        self.ghypos = product;
        self.sort_and_prune(log_min_ratio, max_g_hypos);
    }

    /// Split this group along the current tree labels. Returns one child
    /// group per distinct label when there are at least two; `None` when
    /// the group is still connected.
    ///
    /// Each hypothesis projects onto each child by keeping only the picks
    /// belonging to that label's trees; duplicate projections collapse.
    pub(crate) fn split_if_you_must(
        &self,
        arena: &HypoArena,
        trees: &HashMap<TrackId, TrackTree>,
    ) -> Option<Vec<Group>> {
        let mut labels: Vec<i64> = self
            .ghypos
            .iter()
            .flat_map(|g| g.live_hypos(arena))
            .map(|h| trees[&arena.get(h).tree].group_label)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        if labels.len() < 2 {
            return None;
        }

        let mut children = Vec::with_capacity(labels.len());
        for &label in &labels {
            let mut child = Group { ghypos: Vec::new() };
            for gh in &self.ghypos {
                let mut projected = GroupHypo::new();
                for h in gh.live_hypos(arena) {
                    if trees[&arena.get(h).tree].group_label == label {
                        projected.add_hypo(h, arena);
                    }
                }
                if projected.hypos.is_empty() {
                    continue;
                }
                child.ghypos.push(projected);
            }
            child.remove_repeats(arena);
            child.ghypos.sort_by(|a, b| {
                b.log_likelihood
                    .partial_cmp(&a.log_likelihood)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            children.push(child);
        }
        Some(children)
    }

    /// Collapse hypotheses with identical live pick sets (projections of
    /// distinct joint hypotheses often coincide after a split).
    pub(crate) fn remove_repeats(&mut self, arena: &HypoArena) {
        let mut seen: Vec<Vec<HypoId>> = Vec::with_capacity(self.ghypos.len());
        self.ghypos.retain(|gh| {
            let key = gh.pick_key(arena);
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
