use crate::board::{Board, Location, TOTAL_CELLS};
use crate::card::{Card, DRAGONS_PER_SUIT, Suit};
use crate::move_::{Move, SimpleMove};

use smallvec::SmallVec;

pub type PossibleMoves = SmallVec<[Move; 32]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Automatic,
    Foundation,
    Dragons,
    Tableau,
    CellToTableau,
    TableauToCell,
    Done,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::Automatic => Stage::Foundation,
            Stage::Foundation => Stage::Dragons,
            Stage::Dragons => Stage::Tableau,
            Stage::Tableau => Stage::CellToTableau,
            Stage::CellToTableau => Stage::TableauToCell,
            Stage::TableauToCell | Stage::Done => Stage::Done,
        }
    }
}

/// Lazily yields the legal moves of a position, one rule category at a time
/// in priority order. It holds no borrow of the board, so the caller may
/// apply and undo moves between calls as long as the board is back in the
/// same position whenever `next` is called.
#[derive(Debug, Clone)]
pub struct MoveGen {
    stage: Stage,
    // Reversed, so the next move is popped from the end.
    pending: PossibleMoves,
}

impl Default for MoveGen {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveGen {
    pub fn new() -> Self {
        Self {
            stage: Stage::Automatic,
            pending: PossibleMoves::new(),
        }
    }

    /// A generator with nothing left to yield.
    pub fn exhausted() -> Self {
        Self {
            stage: Stage::Done,
            pending: PossibleMoves::new(),
        }
    }

    pub fn next(&mut self, board: &Board) -> Option<Move> {
        loop {
            if let Some(mov) = self.pending.pop() {
                return Some(mov);
            }
            let stage = self.stage;
            if stage == Stage::Done {
                return None;
            }
            self.stage = stage.next();

            match stage {
                Stage::Automatic => {
                    compute_foundation_moves(board, true, &mut self.pending);
                    if !self.pending.is_empty() {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Foundation => compute_foundation_moves(board, false, &mut self.pending),
                Stage::Dragons => compute_dragon_moves(board, &mut self.pending),
                Stage::Tableau => compute_tableau_moves(board, &mut self.pending),
                Stage::CellToTableau => compute_cell_to_tableau_moves(board, &mut self.pending),
                Stage::TableauToCell => compute_tableau_to_cell_moves(board, &mut self.pending),
                Stage::Done => {}
            }
            self.pending.reverse();
        }
    }
}

/// Every move the generator would yield for `board`, in order.
pub fn possible_moves(board: &Board) -> Vec<Move> {
    let mut movegen = MoveGen::new();
    std::iter::from_fn(|| movegen.next(board)).collect()
}

/// Accessible cards: single-card cells, then tableau tops.
fn exposed(board: &Board) -> impl Iterator<Item = (Location, Card)> + '_ {
    (0..TOTAL_CELLS)
        .filter(|&i| !board.is_inert_cell(i))
        .map(Location::Cell)
        .chain(Location::tableaus())
        .filter_map(|location| board.topmost(location).map(|card| (location, card)))
}

fn compute_foundation_moves(
    board: &Board,
    automatic_only: bool,
    possible_moves: &mut PossibleMoves,
) {
    let foundation_minimum = Suit::ALL
        .iter()
        .map(|&suit| board.foundation_rank(suit))
        .min()
        .unwrap_or(0);

    for (from, card) in exposed(board) {
        if card.is_dragon() || card.rank() != board.foundation_rank(card.suit()) + 1 {
            continue;
        }
        if automatic_only && card.rank() > 2 && card.rank() > foundation_minimum + 1 {
            continue;
        }
        possible_moves.push(Move::single(card, from, Location::Foundation(card.suit())));
    }
}

fn compute_dragon_moves(board: &Board, possible_moves: &mut PossibleMoves) {
    for suit in Suit::COLOURS {
        let dragon = Card::dragon(suit);
        let sources: SmallVec<[Location; DRAGONS_PER_SUIT]> = exposed(board)
            .filter(|&(_, card)| card == dragon)
            .map(|(location, _)| location)
            .collect();
        if sources.len() != DRAGONS_PER_SUIT {
            continue;
        }

        let target = sources
            .iter()
            .copied()
            .find(|location| matches!(location, Location::Cell(_)))
            .or_else(|| Location::cells().find(|&cell| board.pile(cell).is_empty()));
        let Some(target) = target else {
            continue;
        };

        let parts = sources
            .iter()
            .filter(|&&from| from != target)
            .map(|&from| SimpleMove::single(dragon, from, target))
            .collect();
        possible_moves.push(Move::Compound(parts));
    }
}

fn compute_tableau_moves(board: &Board, possible_moves: &mut PossibleMoves) {
    for from in Location::tableaus() {
        let pile = board.pile(from);
        for start in (0..pile.len()).rev() {
            if start + 1 < pile.len() && !pile[start + 1].legal_on(Some(pile[start])) {
                break;
            }
            let run = &pile[start..];
            for to in Location::tableaus() {
                if to != from && run[0].legal_on(board.topmost(to)) {
                    possible_moves.push(Move::Simple(SimpleMove::new(run, from, to)));
                }
            }
        }
    }
}

fn compute_cell_to_tableau_moves(board: &Board, possible_moves: &mut PossibleMoves) {
    for (i, cell) in board.cells().iter().enumerate() {
        let [card] = cell.as_slice() else {
            continue;
        };
        for to in Location::tableaus() {
            if card.legal_on(board.topmost(to)) {
                possible_moves.push(Move::single(*card, Location::Cell(i), to));
            }
        }
    }
}

fn compute_tableau_to_cell_moves(board: &Board, possible_moves: &mut PossibleMoves) {
    let Some(cell) = Location::cells().find(|&cell| board.pile(cell).is_empty()) else {
        return;
    };
    for from in Location::tableaus() {
        if let Some(card) = board.topmost(from) {
            possible_moves.push(Move::single(card, from, cell));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(s: &str) -> Card {
        Card::parse(s).unwrap()
    }

    fn board(s: &str) -> Board {
        Board::parse(s).unwrap()
    }

    #[test]
    fn test_automatic_moves_short_circuit() {
        let board = board("Cell1: g1\nTableau1: r2 b1\nTableau2: b3 r1");
        let moves = possible_moves(&board);
        assert_eq!(
            moves,
            vec![
                Move::single(card("g1"), Location::Cell(0), Location::Foundation(Suit::Green)),
                Move::single(card("b1"), Location::Tableau(0), Location::Foundation(Suit::Black)),
                Move::single(card("r1"), Location::Tableau(1), Location::Foundation(Suit::Red)),
            ]
        );
    }

    #[test]
    fn test_non_automatic_foundation_moves_come_first() {
        let board = board("Foundation1: FL\nFoundation2: r3\nTableau1: r4\nTableau2: g5");
        let moves = possible_moves(&board);
        assert_eq!(
            moves[0],
            Move::single(card("r4"), Location::Tableau(0), Location::Foundation(Suit::Red))
        );
        // r4 is not automatic, so the other categories follow.
        assert!(moves.len() > 1);
        let red = Some(Location::Foundation(Suit::Red));
        assert!(moves[1..].iter().all(|m| m.destination() != red));
    }

    #[test]
    fn test_automatic_threshold_uses_foundation_minimum() {
        let board = board(
            "Foundation1: FL\nFoundation2: r2\nFoundation3: g2\nFoundation4: b2\nTableau1: g5 r3",
        );
        let moves = possible_moves(&board);
        // The flower caps the minimum at 1, so r3 is an ordinary foundation move.
        assert_eq!(
            moves[0],
            Move::single(card("r3"), Location::Tableau(0), Location::Foundation(Suit::Red))
        );
        assert!(moves.len() > 1);
    }

    #[test]
    fn test_dragons_never_go_to_foundation() {
        let board = board("Tableau1: RR");
        assert!(
            possible_moves(&board)
                .iter()
                .all(|m| !matches!(m.destination(), Some(Location::Foundation(_))))
        );
    }

    #[test]
    fn test_dragon_compound_move() {
        let board = board("Tableau1: GG\nTableau2: GG\nTableau3: b4 GG\nTableau5: GG");
        let moves = possible_moves(&board);
        let dragon = card("GG");
        let expected = Move::Compound(
            [0, 1, 2, 4]
                .into_iter()
                .map(|i| SimpleMove::single(dragon, Location::Tableau(i), Location::Cell(0)))
                .collect(),
        );
        assert_eq!(moves[0], expected);
        assert_eq!(moves.iter().filter(|m| m.is_compound()).count(), 1);
    }

    #[test]
    fn test_dragon_compound_reuses_cell_with_dragon() {
        let board = board("Cell2: BB\nTableau1: BB\nTableau2: BB\nTableau3: BB");
        let moves = possible_moves(&board);
        let dragon = card("BB");
        let expected = Move::Compound(
            [0, 1, 2]
                .into_iter()
                .map(|i| SimpleMove::single(dragon, Location::Tableau(i), Location::Cell(1)))
                .collect(),
        );
        assert_eq!(moves[0], expected);
    }

    #[test]
    fn test_dragon_compound_needs_all_four_exposed() {
        let board = board("Tableau1: RR\nTableau2: RR\nTableau3: RR\nTableau4: RR b4");
        assert!(possible_moves(&board).iter().all(|m| !m.is_compound()));
    }

    #[test]
    fn test_dragon_compound_needs_free_cell() {
        let board = board(
            "Cell1: b5\nCell2: g7\nCell3: GG\nTableau1: RR\nTableau2: RR\nTableau3: RR\nTableau4: RR",
        );
        assert!(possible_moves(&board).iter().all(|m| !m.is_compound()));
    }

    #[test]
    fn test_inert_cell_is_ignored() {
        let board = board("Cell1: RR RR RR RR\nTableau1: b4");
        let moves = possible_moves(&board);
        assert!(moves.iter().all(|m| m.parts().iter().all(|p| p.from != Location::Cell(0))));
        assert!(moves.iter().all(|m| m.destination() != Some(Location::Cell(0))));
    }

    #[test]
    fn test_run_moves() {
        let board = board("Tableau1: r5 g4 r3\nTableau2: b6");
        let moves = possible_moves(&board);
        let runs: Vec<(usize, Location)> = moves
            .iter()
            .filter_map(|m| match m {
                Move::Simple(part) if part.from == Location::Tableau(0) => {
                    matches!(part.to, Location::Tableau(_)).then_some((part.count(), part.to))
                }
                _ => None,
            })
            .collect();

        // Single card, two-card run and the whole pile to each empty pile,
        // plus the whole pile onto b6.
        assert_eq!(runs.iter().filter(|(n, _)| *n == 1).count(), 6);
        assert_eq!(runs.iter().filter(|(n, _)| *n == 2).count(), 6);
        assert!(runs.contains(&(3, Location::Tableau(1))));
        assert_eq!(runs.iter().filter(|(n, _)| *n == 3).count(), 7);
    }

    #[test]
    fn test_run_stops_at_first_broken_pair() {
        let board = board("Tableau1: g5 r4 r3");
        let moves = possible_moves(&board);
        assert!(moves.iter().any(|m| m.parts()[0].count() == 1));
        assert!(moves.iter().all(|m| m.parts()[0].count() == 1));
    }

    #[test]
    fn test_cell_and_tableau_moves() {
        let board = board("Cell1: g4\nTableau1: b5\nTableau2: r9");
        let moves = possible_moves(&board);
        let g4 = card("g4");
        assert!(moves.contains(&Move::single(g4, Location::Cell(0), Location::Tableau(0))));
        assert!(!moves.contains(&Move::single(g4, Location::Cell(0), Location::Tableau(1))));
        assert!(moves.contains(&Move::single(g4, Location::Cell(0), Location::Tableau(2))));

        // Tableau tops go to the first empty cell only.
        assert!(moves.contains(&Move::single(card("b5"), Location::Tableau(0), Location::Cell(1))));
        assert!(moves.contains(&Move::single(card("r9"), Location::Tableau(1), Location::Cell(1))));
        assert!(moves.iter().all(|m| m.destination() != Some(Location::Cell(2))));
    }

    #[test]
    fn test_moves_respect_stacking_rule() {
        for seed in 0..20 {
            let board = Board::new_from_seed(seed);
            for mov in possible_moves(&board) {
                for part in mov.parts() {
                    let top = board.topmost(part.to);
                    match part.to {
                        Location::Tableau(_) => assert!(part.cards[0].legal_on(top)),
                        Location::Cell(_) => assert!(top.is_none() || mov.is_compound()),
                        Location::Foundation(_) => {}
                    }
                }
                let mut after = board.clone();
                after.apply(mov).unwrap();
                assert_eq!(after.card_count(), 40);
            }
        }
    }

    #[test]
    fn test_generator_is_lazy_and_restartable() {
        let board = board("Tableau1: r5 g4\nTableau2: b6");
        let mut movegen = MoveGen::new();
        let first = movegen.next(&board).unwrap();
        assert_eq!(MoveGen::new().next(&board), Some(first));
        assert_eq!(MoveGen::exhausted().next(&board), None);
    }
}
