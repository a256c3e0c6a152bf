//! Solver for the Dragon solitaire variant: three suits of 1-9, four dragons
//! per suit and a flower, dealt over eight tableau piles with three free
//! cells and four foundations.
pub mod board;
pub mod card;
pub mod move_;
pub mod solver;
