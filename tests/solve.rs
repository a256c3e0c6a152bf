use dragon_solver::board::{Board, Location};
use dragon_solver::card::{Card, Suit};
use dragon_solver::move_::Move;
use dragon_solver::solver::{Outcome, SolveOptions, Solver, possible_moves, replay, solve};

fn card(s: &str) -> Card {
    Card::parse(s).unwrap()
}

fn budget(max_moves: u64) -> SolveOptions {
    SolveOptions {
        max_moves: Some(max_moves),
        ..Default::default()
    }
}

#[test]
fn test_two_card_scenario() {
    let board = Board::parse("Tableau1: r2 b1").unwrap();

    let moves = possible_moves(&board);
    assert_eq!(
        moves,
        vec![Move::single(
            card("b1"),
            Location::Tableau(0),
            Location::Foundation(Suit::Black)
        )]
    );

    let result = solve(board, SolveOptions::default()).unwrap();
    let solution = result.moves().unwrap();
    assert_eq!(solution.len(), 2);
    assert_eq!(solution[0], moves[0]);
}

#[test]
fn test_run_scenario() {
    let board = Board::parse("Tableau1: r5 g4 r3").unwrap();
    let moves = possible_moves(&board);
    let to_empty = |count: usize| {
        moves.iter().any(|m| match m {
            Move::Simple(part) => part.count() == count && part.to == Location::Tableau(1),
            _ => false,
        })
    };
    assert!(to_empty(1));
    assert!(to_empty(2));
    assert!(to_empty(3));

    // g3 on r4 is fine but r4 on r5 is not, so the run stops at two cards.
    let board = Board::parse("Tableau1: r5 r4 g3").unwrap();
    let moves = possible_moves(&board);
    assert!(moves.iter().any(|m| m.parts()[0].count() == 2));
    assert!(moves.iter().all(|m| m.parts()[0].count() <= 2));
}

#[test]
fn test_full_layout_solves() {
    const BOARD_STR: &str = r#"Tableau1: r5 r4 r3 r2 r1
Tableau2: g5 g4 g3 g2 g1
Tableau3: b5 b4 b3 b2 b1
Tableau4: r9 r8 r7 r6 FL
Tableau5: g9 g8 g7 g6 RR
Tableau6: b9 b8 b7 b6 RR
Tableau7: RR RR GG GG BB
Tableau8: GG GG BB BB BB"#;

    let board = Board::parse(BOARD_STR).unwrap();
    assert!(board.is_complete());

    let result = solve(board.clone(), budget(1_000_000)).unwrap();
    let moves = result.moves().expect("layout is solvable");

    let snapshots = replay(&board, moves).unwrap();
    for snapshot in &snapshots {
        assert_eq!(snapshot.card_count(), 40);
        assert!(snapshot.validate().is_ok());
    }
    let last = snapshots.last().unwrap();
    assert!(last.solved());
    assert!(last.cells().iter().all(|cell| cell.len() == 4));
    for suit in Suit::COLOURS {
        assert_eq!(last.foundation_rank(suit), 9);
    }
}

#[test]
fn test_search_is_deterministic() {
    for seed in [1, 2, 3] {
        let first = solve(Board::new_from_seed(seed), budget(50_000)).unwrap();
        let second = solve(Board::new_from_seed(seed), budget(50_000)).unwrap();
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.moves_explored, second.moves_explored);
        assert_eq!(first.states, second.states);
    }
}

#[test]
fn test_undo_restores_every_move() {
    for seed in 0..10 {
        let board = Board::new_from_seed(seed);
        let before = board.canonical_state();
        for mov in possible_moves(&board) {
            let mut after = board.clone();
            after.apply(mov.clone()).unwrap();
            assert_eq!(after.undo().unwrap(), mov);
            assert_eq!(after.canonical_state(), before);
            assert_eq!(after, board);
        }
    }
}

#[test]
fn test_foundations_stay_ordered_during_search() {
    let mut solver = Solver::new(Board::new_from_seed(21));
    for _ in 0..20_000 {
        solver.step().unwrap();
        for (suit, pile) in Suit::ALL.iter().zip(solver.board().foundations()) {
            for (i, card) in pile.iter().enumerate() {
                assert_eq!(card.suit(), *suit);
                assert_eq!(card.rank() as usize, i + 1);
            }
        }
        assert_eq!(solver.board().card_count(), 40);
    }
}

#[test]
fn test_outcome_is_not_an_error() {
    let board = Board::parse("Cell1: RR\nCell2: GG\nCell3: BB\nTableau1: r3 RR").unwrap();
    let result = solve(board, SolveOptions::default()).unwrap();
    assert_eq!(result.outcome, Outcome::Exhausted);
    assert!(!result.is_solved());
    assert!(result.moves().is_none());
}
