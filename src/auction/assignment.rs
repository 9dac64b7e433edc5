//! Welfare-maximizing assignment of positions to bidders
//!
//! The value matrix has one row per bidder and one column per position;
//! there are never more rows than columns. Assignments map each row to a
//! distinct column.
use super::{tie_break, Amount, ClearingError, TieBreaker};

/// Column chosen for every row, in row order
pub type Assignment = Vec<usize>;

const INF: i64 = i64::MAX / 4;

pub fn welfare(values: &[Vec<Amount>], assignment: &[usize]) -> Amount {
    assignment
        .iter()
        .enumerate()
        .map(|(row, &col)| values[row][col])
        .sum()
}

/// Best achievable welfare
pub fn optimal_value(values: &[Vec<Amount>], positions: usize) -> Amount {
    optimal_assignment(values, positions).0
}

/// Best achievable welfare with one bidder left out
pub fn optimal_value_without(values: &[Vec<Amount>], positions: usize, excluded: usize) -> Amount {
    let rows: Vec<usize> = (0..values.len()).filter(|&r| r != excluded).collect();
    let cols: Vec<usize> = (0..positions).collect();
    solve(values, &rows, &cols).0
}

pub fn optimal_assignment(values: &[Vec<Amount>], positions: usize) -> (Amount, Assignment) {
    let rows: Vec<usize> = (0..values.len()).collect();
    let cols: Vec<usize> = (0..positions).collect();
    solve(values, &rows, &cols)
}

/// Every assignment reaching the optimal welfare
///
/// Candidates come out in lexicographic order of their columns, which keeps
/// a seeded tie-break reproducible. Returns `None` once more than `limit`
/// candidates exist.
pub fn optimal_allocations(
    values: &[Vec<Amount>],
    positions: usize,
    limit: usize,
) -> Option<Vec<Assignment>> {
    let mut search = TieSearch {
        values,
        best: optimal_value(values, positions),
        limit,
        taken: vec![false; positions],
        current: Vec::with_capacity(values.len()),
        found: Vec::new(),
    };
    if search.descend(0, 0) {
        Some(search.found)
    } else {
        None
    }
}

struct TieSearch<'v> {
    values: &'v [Vec<Amount>],
    best: Amount,
    limit: usize,
    taken: Vec<bool>,
    current: Assignment,
    found: Vec<Assignment>,
}

impl TieSearch<'_> {
    /// `false` when the limit was hit
    fn descend(&mut self, row: usize, value_so_far: Amount) -> bool {
        if row == self.values.len() {
            if self.found.len() >= self.limit {
                return false;
            }
            self.found.push(self.current.clone());
            return true;
        }

        for col in 0..self.taken.len() {
            if self.taken[col] {
                continue;
            }
            self.taken[col] = true;
            let value = value_so_far + self.values[row][col];

            // only branch where an optimal completion still exists
            let rest = completion_value(self.values, row + 1, &self.taken);
            if value + rest == self.best {
                self.current.push(col);
                let within_limit = self.descend(row + 1, value);
                self.current.pop();
                if !within_limit {
                    self.taken[col] = false;
                    return false;
                }
            }
            self.taken[col] = false;
        }
        true
    }
}

/// Optimal allocation built by visiting bidders in random order
///
/// Each bidder gets a uniformly drawn position among those that still allow
/// an optimal completion. Used when there are too many tied allocations to
/// draw from all of them.
pub fn random_priority_allocation(
    values: &[Vec<Amount>],
    positions: usize,
    tie_breaker: &mut dyn TieBreaker,
) -> Result<Assignment, ClearingError> {
    let best = optimal_value(values, positions);

    let mut order: Vec<usize> = (0..values.len()).collect();
    tie_break::shuffle(tie_breaker, &mut order);

    let mut assignment = vec![0; values.len()];
    let mut taken = vec![false; positions];
    let mut fixed = 0;
    for (k, &row) in order.iter().enumerate() {
        let later = &order[k + 1..];
        let mut feasible = Vec::new();
        for col in 0..positions {
            if taken[col] {
                continue;
            }
            taken[col] = true;
            let free: Vec<usize> = (0..positions).filter(|&c| !taken[c]).collect();
            if fixed + values[row][col] + solve(values, later, &free).0 == best {
                feasible.push(col);
            }
            taken[col] = false;
        }

        let col = feasible[tie_break::resolve(tie_breaker, feasible.len())?];
        taken[col] = true;
        fixed += values[row][col];
        assignment[row] = col;
    }
    Ok(assignment)
}

/// Best welfare of rows from `first_row` on over the columns not yet taken
fn completion_value(values: &[Vec<Amount>], first_row: usize, taken: &[bool]) -> Amount {
    let rows: Vec<usize> = (first_row..values.len()).collect();
    let cols: Vec<usize> = (0..taken.len()).filter(|&c| !taken[c]).collect();
    solve(values, &rows, &cols).0
}

/// Hungarian algorithm on the sub-matrix `rows` x `cols`
///
/// Minimizes negated values with row and column potentials, one augmenting
/// path per row, O(n²m). Requires `rows.len() <= cols.len()`. Returned
/// columns are original column indices.
fn solve(values: &[Vec<Amount>], rows: &[usize], cols: &[usize]) -> (Amount, Assignment) {
    let n = rows.len();
    let m = cols.len();
    debug_assert!(n <= m, "more rows than columns");
    if n == 0 {
        return (0, Vec::new());
    }

    // 1-based: row and column 0 are the virtual start of each augmenting path
    let cost = |i: usize, j: usize| -values[rows[i - 1]][cols[j - 1]];
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    let mut matched_row = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        matched_row[0] = i;
        let mut j0 = 0;
        let mut min_slack = vec![INF; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = matched_row[j0];
            let mut delta = INF;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let slack = cost(i0, j) - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[matched_row[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }
            j0 = j1;
            if matched_row[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            matched_row[j0] = matched_row[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    for j in 1..=m {
        if matched_row[j] != 0 {
            assignment[matched_row[j] - 1] = cols[j - 1];
        }
    }
    let value = assignment
        .iter()
        .enumerate()
        .map(|(i, &col)| values[rows[i]][col])
        .sum();
    (value, assignment)
}
