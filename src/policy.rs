//! Turning a model's per-column scores into a single legal move.

/// Pick the legal column with the highest score.
///
/// `scores` is indexed by absolute column; entries for columns missing from
/// `legal_columns` are never considered. Ties go to the lowest column index,
/// whatever order `legal_columns` is given in. Missing or NaN scores never
/// win a comparison, so if no legal column has a usable score the lowest
/// legal column is returned. Returns `None` only when there is no legal
/// column at all.
pub fn select_column(scores: &[f64], legal_columns: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for &col in legal_columns {
        let Some(score) = scores.get(col).copied().filter(|s| !s.is_nan()) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((best_col, best_score)) => {
                score > best_score || (score == best_score && col < best_col)
            }
        };
        if better {
            best = Some((col, score));
        }
    }

    best.map(|(col, _)| col)
        .or_else(|| legal_columns.iter().min().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Board, Player, COLS, ROWS};

    #[test]
    fn test_picks_max_among_legal() {
        let mut scores = [9.0; COLS];
        scores[3] = 50.0;
        assert_eq!(select_column(&scores, &[1, 3, 5]), Some(3));
    }

    #[test]
    fn test_ignores_illegal_columns() {
        let scores = [0.1, 0.2, 100.0, 0.3, 0.0, 0.0, 0.0];
        assert_eq!(select_column(&scores, &[0, 1, 3]), Some(3));
    }

    #[test]
    fn test_tie_goes_to_lower_column() {
        let scores = [0.0, 0.4, 0.0, 0.0, 0.4, 0.0, 0.0];
        assert_eq!(select_column(&scores, &[1, 4]), Some(1));
        assert_eq!(select_column(&scores, &[4, 6]), Some(4));
    }

    #[test]
    fn test_tie_ignores_legal_order() {
        let scores = [0.0, 0.4, 0.0, 0.0, 0.4, 0.0, 0.0];
        assert_eq!(select_column(&scores, &[4, 1]), Some(1));
        assert_eq!(select_column(&[f64::NAN; COLS], &[5, 2]), Some(2));
    }

    #[test]
    fn test_empty_legal_set() {
        assert_eq!(select_column(&[1.0; COLS], &[]), None);
    }

    #[test]
    fn test_nan_and_missing_scores_never_win() {
        let scores = [f64::NAN, 0.5, f64::NAN];
        assert_eq!(select_column(&scores, &[0, 1, 2, 5]), Some(1));
        assert_eq!(select_column(&[f64::NAN; COLS], &[2, 4]), Some(2));
    }

    #[test]
    fn test_uniform_scores_skip_full_column() {
        let mut board = Board::new();
        let mut player = Player::Red;
        for _ in 0..ROWS {
            board = board.apply_move(3, player).unwrap();
            player = player.other();
        }
        let legal = board.legal_moves();
        let col = select_column(&[1.0; COLS], &legal).unwrap();
        assert_ne!(col, 3);
        assert_eq!(col, 0);
    }
}
