//! Linear assignment problem solver.
//!
//! Shortest augmenting path variant of the Hungarian algorithm with row and
//! column potentials, `O(n^3)` in the matrix dimension. Ties are broken
//! towards the lowest column index, so the same matrix always yields the same
//! matching.

use crate::matrix::Matrix;

/// A perfect matching of a square cost matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    /// `row_to_column[row]` is the column matched to `row`. Every column
    /// appears exactly once.
    pub row_to_column: Vec<usize>,
    /// Sum of the matched cells.
    pub cost: i64,
}

impl Matching {
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_to_column.iter().copied().enumerate()
    }
}

/// Returns the minimum-cost perfect matching of `costs`.
pub fn solve(costs: &Matrix<i64>) -> Matching {
    let n = costs.dim();
    if n == 0 {
        return Matching {
            row_to_column: Vec::new(),
            cost: 0,
        };
    }

    // Arithmetic happens in i128 so potentials can't overflow even when
    // sentinels sit close to i64::MAX. Index 0 is a virtual row/column.
    const INF: i128 = i128::MAX;
    let cost = |row: usize, column: usize| i128::from(costs.get(row - 1, column - 1));

    let mut u = vec![0i128; n + 1];
    let mut v = vec![0i128; n + 1];
    // row_of[column] is the row currently matched to a column, 0 if none.
    let mut row_of = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        row_of[0] = row;
        let mut current = 0;
        let mut min_slack = vec![INF; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[current] = true;
            let matched_row = row_of[current];
            let mut delta = INF;
            let mut next = 0;

            for column in 1..=n {
                if used[column] {
                    continue;
                }
                let slack = cost(matched_row, column) - u[matched_row] - v[column];
                if slack < min_slack[column] {
                    min_slack[column] = slack;
                    way[column] = current;
                }
                if min_slack[column] < delta {
                    delta = min_slack[column];
                    next = column;
                }
            }

            for column in 0..=n {
                if used[column] {
                    u[row_of[column]] += delta;
                    v[column] -= delta;
                } else {
                    min_slack[column] -= delta;
                }
            }

            current = next;
            if row_of[current] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the virtual column.
        while current != 0 {
            let previous = way[current];
            row_of[current] = row_of[previous];
            current = previous;
        }
    }

    let mut row_to_column = vec![0; n];
    for column in 1..=n {
        row_to_column[row_of[column] - 1] = column - 1;
    }
    let cost = row_to_column
        .iter()
        .enumerate()
        .map(|(row, &column)| i128::from(costs.get(row, column)))
        .sum::<i128>();

    Matching {
        row_to_column,
        cost: i64::try_from(cost).unwrap_or(i64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        itertools::Itertools,
        rand::{Rng, SeedableRng, rngs::StdRng},
        rstest::rstest,
    };

    fn brute_force(costs: &Matrix<i64>) -> i64 {
        (0..costs.dim())
            .permutations(costs.dim())
            .map(|columns| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(row, &column)| costs.get(row, column))
                    .sum::<i64>()
            })
            .min()
            .unwrap_or_default()
    }

    fn assert_perfect(matching: &Matching) {
        let mut columns = matching.row_to_column.clone();
        columns.sort_unstable();
        assert_eq!(columns, (0..matching.row_to_column.len()).collect_vec());
    }

    #[test]
    fn empty_matrix() {
        let matching = solve(&Matrix::from_rows(vec![]));
        assert!(matching.row_to_column.is_empty());
        assert_eq!(matching.cost, 0);
    }

    #[test]
    fn classic_instance() {
        let costs = Matrix::from_rows(vec![
            vec![4, 1, 3],
            vec![2, 0, 5],
            vec![3, 2, 2],
        ]);
        let matching = solve(&costs);
        assert_eq!(matching.row_to_column, vec![1, 0, 2]);
        assert_eq!(matching.cost, 5);
    }

    #[rstest]
    #[case(vec![vec![7]])]
    #[case(vec![vec![1, 1], vec![1, 1]])]
    #[case(vec![vec![9, 2, 7, 8], vec![6, 4, 3, 7], vec![5, 8, 1, 8], vec![7, 6, 9, 4]])]
    #[case(vec![
        vec![0, 0, 0, 0, 0],
        vec![3, 8, 2, 9, 4],
        vec![1_000, 1_000, 1_000, 1_000, 1_000],
        vec![5, 5, 0, 5, 5],
        vec![2, 7, 7, 1, 6],
    ])]
    #[case(vec![
        vec![i64::MAX / 4, 1, i64::MAX / 4],
        vec![i64::MAX / 4, i64::MAX / 4, i64::MAX / 4],
        vec![3, 4, i64::MAX / 4],
    ])]
    fn matches_brute_force(#[case] rows: Vec<Vec<i64>>) {
        let costs = Matrix::from_rows(rows);
        let matching = solve(&costs);
        assert_perfect(&matching);
        assert_eq!(matching.cost, brute_force(&costs));
    }

    #[test]
    fn ties_resolve_to_lowest_columns() {
        let costs = Matrix::filled(4, 3);
        let matching = solve(&costs);
        assert_eq!(matching.row_to_column, vec![0, 1, 2, 3]);
        assert_eq!(matching, solve(&costs));
    }

    #[test]
    fn deterministic_on_seeded_random_instances() {
        let mut rng = StdRng::seed_from_u64(0x2545_f491);
        for dim in 1..=6 {
            let rows: Vec<Vec<i64>> = (0..dim)
                .map(|_| (0..dim).map(|_| rng.gen_range(0..20)).collect())
                .collect();
            let costs = Matrix::from_rows(rows);
            let matching = solve(&costs);
            assert_perfect(&matching);
            assert_eq!(matching.cost, brute_force(&costs));
            assert_eq!(matching, solve(&costs));
        }
    }
}
