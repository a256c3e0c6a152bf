//! Depth-first backtracking search over the Dragon solitaire layout.
//!
//! The search keeps an explicit stack of move generators, one per depth, and
//! walks the board forward with [`Board::apply`] and back with [`Board::undo`].
//! Visited positions are remembered by their canonical state for the whole
//! search, not just the current path.
mod movegen;

pub use self::movegen::{MoveGen, possible_moves};

use crate::board::{Board, CanonicalState};
use crate::move_::Move;

use anyhow::Result;
use rustc_hash::FxHashSet;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Stop after this many applied moves.
    pub max_moves: Option<u64>,
    /// Checked between steps; setting it aborts the search.
    pub cancel: Option<Arc<AtomicBool>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Solved(Vec<Move>),
    /// Every reachable position was explored without clearing the tableau.
    Exhausted,
    /// Budget spent or cancelled before a verdict.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct SolveResult {
    pub outcome: Outcome,
    pub moves_explored: u64,
    pub states: usize,
    pub elapsed: Duration,
}

impl SolveResult {
    pub fn is_solved(&self) -> bool {
        matches!(self.outcome, Outcome::Solved(_))
    }

    pub fn moves(&self) -> Option<&[Move]> {
        match &self.outcome {
            Outcome::Solved(moves) => Some(moves),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Solved,
    Exhausted,
}

pub fn solve(board: Board, options: SolveOptions) -> Result<SolveResult> {
    let mut solver = Solver::new(board);
    solver.set_options(options);
    solver.solve()
}

#[derive(Debug, Clone)]
pub struct Solver {
    board: Board,
    frames: Vec<MoveGen>,
    states_seen: FxHashSet<CanonicalState>,
    moves_explored: u64,
    options: SolveOptions,
}

impl Solver {
    pub fn new(mut board: Board) -> Self {
        board.clear_history();
        let mut states_seen = FxHashSet::default();
        states_seen.insert(board.canonical_state());
        Self {
            board,
            frames: vec![MoveGen::new()],
            states_seen,
            moves_explored: 0,
            options: SolveOptions::default(),
        }
    }

    pub fn set_options(&mut self, options: SolveOptions) {
        self.options = options;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn moves_explored(&self) -> u64 {
        self.moves_explored
    }

    pub fn states(&self) -> usize {
        self.states_seen.len()
    }

    /// Pulls one move from the deepest generator and either descends into
    /// it or, when the generator is spent, backtracks one level.
    pub fn step(&mut self) -> Result<Step> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(Step::Exhausted);
        };

        let Some(mov) = frame.next(&self.board) else {
            self.frames.pop();
            if !self.board.history().is_empty() {
                self.board.undo()?;
            }
            return Ok(if self.frames.is_empty() {
                Step::Exhausted
            } else {
                Step::Continue
            });
        };

        self.board.apply(mov)?;
        self.moves_explored += 1;
        if self.board.solved() {
            return Ok(Step::Solved);
        }

        if self.states_seen.insert(self.board.canonical_state()) {
            self.frames.push(MoveGen::new());
        } else {
            self.frames.push(MoveGen::exhausted());
        }
        Ok(Step::Continue)
    }

    pub fn solve(&mut self) -> Result<SolveResult> {
        let timer = Instant::now();

        let outcome = if self.board.solved() {
            Outcome::Solved(vec![])
        } else {
            loop {
                if self.should_abort() {
                    self.rewind()?;
                    break Outcome::Aborted;
                }
                match self.step()? {
                    Step::Continue => {}
                    Step::Solved => break Outcome::Solved(self.board.history().to_vec()),
                    Step::Exhausted => break Outcome::Exhausted,
                }
            }
        };

        Ok(SolveResult {
            outcome,
            moves_explored: self.moves_explored,
            states: self.states_seen.len(),
            elapsed: timer.elapsed(),
        })
    }

    fn should_abort(&self) -> bool {
        if let Some(max_moves) = self.options.max_moves
            && self.moves_explored >= max_moves
        {
            return true;
        }
        self.options
            .cancel
            .as_ref()
            .is_some_and(|cancel| cancel.load(Ordering::Relaxed))
    }

    /// Back to the dealt position, dropping all pending generators.
    fn rewind(&mut self) -> Result<()> {
        while !self.board.history().is_empty() {
            self.board.undo()?;
        }
        self.frames.clear();
        Ok(())
    }
}

/// Positions after each of `moves`, starting from `initial`.
pub fn replay(initial: &Board, moves: &[Move]) -> Result<Vec<Board>> {
    let mut board = initial.clone();
    board.clear_history();
    let mut snapshots = Vec::with_capacity(moves.len());
    for mov in moves {
        board.apply(mov.clone())?;
        let mut snapshot = board.clone();
        snapshot.clear_history();
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}
