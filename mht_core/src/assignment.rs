//! K-best successor enumeration over rectangular assignment problems.
//!
//! For each prior group hypothesis the engine builds one assignment
//! problem:
//!
//! - **Rows** are the hypothesis' picked leaves (every leaf received
//!   children when the scan's measurements were validated).
//! - **Columns** are the scan's new reports that some row can consume,
//!   plus an implicit no-report slot per row.
//! - A cell holds the most likely child of the row's leaf that consumes
//!   the column's report (Continue, or FalseAlarm/Start under a fresh
//!   root); the no-report slot holds the most likely report-free child
//!   (Dummy, Skip or End).
//!
//! A feasible solution explains every involved report exactly once; rows
//! left without a report take their no-report child. Solutions are drawn
//! in non-increasing total log-likelihood by Murty partitioning: each
//! emitted solution splits its subproblem space into disjoint
//! descendants (prefix fixed, one pair forbidden), each re-solved with
//! the Hungarian procedure and pushed onto one shared priority queue
//! spanning all of the group's problems.

use crate::group::GroupHypo;
use crate::hypo::HypoArena;
use crate::report::Report;
use crate::types::{HypoId, ReportId};
use std::collections::{BinaryHeap, HashMap};

/// Cost stand-in for an impossible pairing. Large enough to never win,
/// small enough that dual potentials keep full precision on real costs.
const FORBIDDEN: f64 = 1e9;

/// Any solution whose cost strays into this range used a forbidden cell.
const INFEASIBLE_THRESHOLD: f64 = 1e8;

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Cell {
    child: HypoId,
    log_likelihood: f64,
}

/// One rectangular assignment problem derived from a prior group
/// hypothesis.
pub(crate) struct AssignmentProblem {
    /// Picked leaves of the parent hypothesis, in link order.
    rows: Vec<HypoId>,
    /// Reports consumable by at least one row; index is the local column.
    col_reports: Vec<ReportId>,
    /// `cells[row][col]`; `None` means this row cannot consume the column.
    cells: Vec<Vec<Option<Cell>>>,
    /// Best report-free child per row; `None` means the row must consume
    /// a report.
    slack: Vec<Option<Cell>>,
}

impl AssignmentProblem {
    /// Build the problem for `parent`. Returns `None` when the parent has
    /// no live picks left.
    pub(crate) fn build(
        parent: &GroupHypo,
        arena: &HypoArena,
        reports: &HashMap<ReportId, Report>,
    ) -> Option<AssignmentProblem> {
        let rows: Vec<HypoId> = parent.live_hypos(arena).collect();
        if rows.is_empty() {
            return None;
        }

        let mut col_of: HashMap<ReportId, usize> = HashMap::new();
        let mut col_reports: Vec<ReportId> = Vec::new();
        let mut cells: Vec<Vec<Option<Cell>>> = vec![Vec::new(); rows.len()];
        let mut slack: Vec<Option<Cell>> = vec![None; rows.len()];

        for (ri, &row) in rows.iter().enumerate() {
            for &child_id in &arena.get(row).children {
                let child = arena.get(child_id);
                let cell = Cell {
                    child: child_id,
                    log_likelihood: child.log_likelihood,
                };
                match child.report {
                    Some(r) => {
                        // Column order follows the scan's report row
                        // numbering so problems agree across parents.
                        let ci = *col_of.entry(r).or_insert_with(|| {
                            col_reports.push(r);
                            col_reports.len() - 1
                        });
                        for row_cells in cells.iter_mut() {
                            if row_cells.len() <= ci {
                                row_cells.resize(ci + 1, None);
                            }
                        }
                        let slot = &mut cells[ri][ci];
                        if slot.map_or(true, |c| cell.log_likelihood > c.log_likelihood) {
                            *slot = Some(cell);
                        }
                    }
                    None => {
                        if slack[ri].map_or(true, |c| cell.log_likelihood > c.log_likelihood) {
                            slack[ri] = Some(cell);
                        }
                    }
                }
            }
        }
        let n_cols = col_reports.len();
        for row_cells in cells.iter_mut() {
            row_cells.resize(n_cols, None);
        }

        // Keep columns ordered by the reports' scan row index, so that
        // enumeration order is deterministic.
        let mut order: Vec<usize> = (0..n_cols).collect();
        order.sort_by_key(|&c| reports[&col_reports[c]].row);
        let col_reports = order.iter().map(|&c| col_reports[c]).collect();
        for row_cells in cells.iter_mut() {
            let reordered: Vec<Option<Cell>> = order.iter().map(|&c| row_cells[c]).collect();
            *row_cells = reordered;
        }

        Some(AssignmentProblem {
            rows,
            col_reports,
            cells,
            slack,
        })
    }

    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn n_cols(&self) -> usize {
        self.col_reports.len()
    }

    /// Solve under Murty constraints. `fixed[i]` pins column `i`'s
    /// consumer for every `i < fixed.len()`; `forbidden` bans individual
    /// (column, row) pairs. Returns the per-column row choice and the
    /// total log-likelihood (cells plus slacks), or `None` when no
    /// feasible assignment remains.
    fn solve(&self, fixed: &[usize], forbidden: &[(usize, usize)]) -> Option<Solution> {
        let n = self.n_rows();
        let m = self.n_cols();
        debug_assert!(m <= n, "every involved report has its fresh tree as a row");

        // Square matrix: report columns first, then no-report slots.
        let mut cost = vec![FORBIDDEN; n * n];
        for r in 0..n {
            for c in 0..m {
                if let Some(cell) = self.cells[r][c] {
                    if cell.log_likelihood != f64::NEG_INFINITY {
                        cost[r * n + c] = -cell.log_likelihood;
                    }
                }
            }
            if let Some(cell) = self.slack[r] {
                if cell.log_likelihood != f64::NEG_INFINITY {
                    for c in m..n {
                        cost[r * n + c] = -cell.log_likelihood;
                    }
                }
            }
        }

        for (c, &r) in fixed.iter().enumerate() {
            for other_r in 0..n {
                if other_r != r {
                    cost[other_r * n + c] = FORBIDDEN;
                }
            }
            for other_c in 0..n {
                if other_c != c {
                    cost[r * n + other_c] = FORBIDDEN;
                }
            }
        }
        for &(c, r) in forbidden {
            cost[r * n + c] = FORBIDDEN;
        }

        let row_assign = run_hungarian(&cost, n);

        // Decode: column -> row, rejecting forbidden picks.
        let mut col_row = vec![usize::MAX; m];
        let mut log_likelihood = 0.0;
        for (r, &c) in row_assign.iter().enumerate() {
            if c < m {
                if cost[r * n + c] >= INFEASIBLE_THRESHOLD {
                    return None;
                }
                col_row[c] = r;
                log_likelihood += self.cells[r][c]
                    .expect("feasible cell vanished")
                    .log_likelihood;
            } else {
                match self.slack[r] {
                    Some(cell) if cell.log_likelihood != f64::NEG_INFINITY => {
                        log_likelihood += cell.log_likelihood;
                    }
                    _ => return None,
                }
            }
        }
        if col_row.iter().any(|&r| r == usize::MAX) {
            return None;
        }

        Some(Solution {
            col_row,
            log_likelihood,
        })
    }

    /// Materialize the child picked for each row under `solution`.
    fn children_of(&self, solution: &Solution) -> Vec<HypoId> {
        let mut out = Vec::with_capacity(self.n_rows());
        for r in 0..self.n_rows() {
            let col = solution.col_row.iter().position(|&row| row == r);
            let cell = match col {
                Some(c) => self.cells[r][c].expect("solution picked an empty cell"),
                None => self.slack[r].expect("solution left a row without slack"),
            };
            out.push(cell.child);
        }
        out
    }
}

#[derive(Clone)]
struct Solution {
    /// Consumer row per report column.
    col_row: Vec<usize>,
    log_likelihood: f64,
}

// ---------------------------------------------------------------------------
// Hungarian procedure
// ---------------------------------------------------------------------------

/// O(n³) shortest-augmenting-path assignment on a square row-major cost
/// matrix. Returns `row_assign[row] = column`.
fn run_hungarian(cost: &[f64], n: usize) -> Vec<usize> {
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    // p[j] = row assigned to column j (1-indexed, 0 = none)
    let mut p = vec![0usize; n + 1];
    // way[j] = previous column in the augmenting path
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=n {
                if !used[j] {
                    let val = cost[(i0 - 1) * n + (j - 1)] - u[i0] - v[j];
                    if val < minv[j] {
                        minv[j] = val;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_assign = vec![0usize; n];
    for j in 1..=n {
        if p[j] != 0 {
            row_assign[p[j] - 1] = j - 1;
        }
    }
    row_assign
}

// ---------------------------------------------------------------------------
// Priority queue over subproblems (Murty)
// ---------------------------------------------------------------------------

struct SubProblem {
    problem: usize,
    /// Columns `0..fixed.len()` are pinned to these rows.
    fixed: Vec<usize>,
    forbidden: Vec<(usize, usize)>,
    solution: Solution,
    seq: u64,
}

impl PartialEq for SubProblem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for SubProblem {}
impl PartialOrd for SubProblem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SubProblem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap on likelihood; insertion order breaks ties so
        // enumeration stays deterministic.
        self.solution
            .log_likelihood
            .total_cmp(&other.solution.log_likelihood)
            .then(other.seq.cmp(&self.seq))
    }
}

/// A solution drawn from the queue: the parent problem it came from and
/// the child hypothesis per parent row.
pub(crate) struct EmittedSolution {
    pub parent: usize,
    pub children: Vec<HypoId>,
    pub log_likelihood: f64,
}

/// One queue over the subproblems of every assignment problem in a
/// group. `pop_best` yields solutions across all problems in
/// non-increasing log-likelihood order.
pub(crate) struct AssignmentQueue {
    problems: Vec<(usize, AssignmentProblem)>,
    heap: BinaryHeap<SubProblem>,
    next_seq: u64,
}

impl AssignmentQueue {
    pub(crate) fn new() -> Self {
        Self {
            problems: Vec::new(),
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Add `problem` (derived from parent hypothesis `parent`) and seed
    /// the queue with its unconstrained optimum.
    pub(crate) fn push_problem(&mut self, parent: usize, problem: AssignmentProblem) {
        if let Some(solution) = problem.solve(&[], &[]) {
            let idx = self.problems.len();
            let seq = self.alloc_seq();
            self.heap.push(SubProblem {
                problem: idx,
                fixed: Vec::new(),
                forbidden: Vec::new(),
                solution,
                seq,
            });
            self.problems.push((parent, problem));
        } else {
            self.problems.push((parent, problem));
        }
    }

    fn alloc_seq(&mut self) -> u64 {
        let s = self.next_seq;
        self.next_seq += 1;
        s
    }

    /// Pop the best pending solution and partition its subproblem space
    /// into descendants.
    pub(crate) fn pop_best(&mut self) -> Option<EmittedSolution> {
        let sub = self.heap.pop()?;
        let (parent, problem) = &self.problems[sub.problem];
        let emitted = EmittedSolution {
            parent: *parent,
            children: problem.children_of(&sub.solution),
            log_likelihood: sub.solution.log_likelihood,
        };

        // Murty partition over the report columns not already fixed.
        let mut descendants = Vec::new();
        for c in sub.fixed.len()..problem.n_cols() {
            let mut fixed = sub.fixed.clone();
            fixed.extend(sub.solution.col_row[sub.fixed.len()..c].iter().copied());
            let mut forbidden = sub.forbidden.clone();
            forbidden.push((c, sub.solution.col_row[c]));
            if let Some(solution) = problem.solve(&fixed, &forbidden) {
                descendants.push(SubProblem {
                    problem: sub.problem,
                    fixed,
                    forbidden,
                    solution,
                    seq: 0,
                });
            }
        }
        for mut d in descendants {
            d.seq = self.alloc_seq();
            self.heap.push(d);
        }

        Some(emitted)
    }

    /// Drop every pending subproblem whose parent hypothesis index is in
    /// `invalid` (N-scanback pruning reduced those hypotheses).
    pub(crate) fn drop_parents(&mut self, invalid: &[usize]) {
        if invalid.is_empty() {
            return;
        }
        let problems = &self.problems;
        let retained: Vec<SubProblem> = std::mem::take(&mut self.heap)
            .into_iter()
            .filter(|sub| !invalid.contains(&problems[sub.problem].0))
            .collect();
        self.heap = retained.into();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hungarian_3x3_known() {
        // [4, 1, 3]
        // [2, 0, 5]
        // [3, 2, 2]
        // Optimal: row0→col1 (1), row1→col0 (2), row2→col2 (2) = 5
        let cost = vec![4.0, 1.0, 3.0, 2.0, 0.0, 5.0, 3.0, 2.0, 2.0];
        let assign = run_hungarian(&cost, 3);
        let total: f64 = assign
            .iter()
            .enumerate()
            .map(|(r, &c)| cost[r * 3 + c])
            .sum();
        assert_abs_diff_eq!(total, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn hungarian_avoids_forbidden_cells() {
        // Row 0 is forbidden everywhere except column 1.
        let cost = vec![FORBIDDEN, 1.0, 2.0, FORBIDDEN, 3.0, FORBIDDEN];
        let assign = run_hungarian(&cost, 2);
        assert_eq!(assign[0], 1);
        assert_eq!(assign[1], 0);
    }

    use crate::hypo::HypoKind;
    use crate::types::TrackId;
    use std::any::Any;

    struct StubReport;

    impl crate::model::ReportData for StubReport {
        fn false_alarm_log_likelihood(&self) -> f64 {
            -1.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Two trees compete for one report:
    ///
    /// ```text
    /// row 0: report child ll -1, no-report child ll -3
    /// row 1: report child ll -2, no-report child ll  0
    /// ```
    ///
    /// Feasible joint choices: {-1 + 0} and {-3 + -2}, in that order.
    #[test]
    fn emits_solutions_best_first() {
        let mut arena = HypoArena::default();
        let mut reports: HashMap<ReportId, Report> = HashMap::new();
        let rid = ReportId(0);
        reports.insert(rid, Report::new(Box::new(StubReport)));

        let root0 = arena.insert_root(TrackId(0), -1);
        let a = arena.install_child(root0, HypoKind::FalseAlarm, Some(rid), -1.0, &mut reports);
        let b = arena.install_child(root0, HypoKind::Dummy, None, -3.0, &mut reports);
        let root1 = arena.insert_root(TrackId(1), -1);
        let c = arena.install_child(root1, HypoKind::FalseAlarm, Some(rid), -2.0, &mut reports);
        let d = arena.install_child(root1, HypoKind::Dummy, None, 0.0, &mut reports);

        let mut parent = GroupHypo::new();
        parent.add_hypo(root0, &arena);
        parent.add_hypo(root1, &arena);

        let problem =
            AssignmentProblem::build(&parent, &arena, &reports).expect("parent has live picks");
        let mut queue = AssignmentQueue::new();
        queue.push_problem(0, problem);

        let first = queue.pop_best().expect("a best solution exists");
        assert_abs_diff_eq!(first.log_likelihood, -1.0, epsilon = 1e-9);
        assert!(first.children.contains(&a) && first.children.contains(&d));

        let second = queue.pop_best().expect("one alternative exists");
        assert_abs_diff_eq!(second.log_likelihood, -5.0, epsilon = 1e-9);
        assert!(second.children.contains(&b) && second.children.contains(&c));

        assert!(
            queue.pop_best().is_none(),
            "the report cannot be explained a third way"
        );
    }

    /// With no reports, each row takes its best report-free child and
    /// exactly one solution exists.
    #[test]
    fn empty_scan_yields_single_solution() {
        let mut arena = HypoArena::default();
        let mut reports: HashMap<ReportId, Report> = HashMap::new();

        let root = arena.insert_root(TrackId(0), -1);
        let best = arena.install_child(root, HypoKind::Dummy, None, -0.5, &mut reports);
        arena.install_child(root, HypoKind::Dummy, None, -2.5, &mut reports);

        let mut parent = GroupHypo::new();
        parent.add_hypo(root, &arena);

        let problem = AssignmentProblem::build(&parent, &arena, &reports).unwrap();
        let mut queue = AssignmentQueue::new();
        queue.push_problem(0, problem);

        let only = queue.pop_best().expect("slack solution");
        assert_abs_diff_eq!(only.log_likelihood, -0.5, epsilon = 1e-9);
        assert_eq!(only.children, vec![best]);
        assert!(queue.pop_best().is_none());
    }
}
