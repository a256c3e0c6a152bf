use crate::card::{Card, Suit, TOTAL_CARDS, copies_in_pack, shuffled_deck};
use crate::move_::{Move, SimpleMove};

use anyhow::{Context, Result, bail};
use smallvec::SmallVec;
use std::fmt;

pub const TOTAL_TABLEAUS: usize = 8;
pub const TOTAL_CELLS: usize = 3;
pub const TOTAL_FOUNDATIONS: usize = 4;
pub const DEAL_SIZE: usize = 5;

const PILE_TABLEAU_START: usize = 0;
const PILE_CELL_START: usize = PILE_TABLEAU_START + TOTAL_TABLEAUS;
const PILE_FOUNDATION_START: usize = PILE_CELL_START + TOTAL_CELLS;
pub const TOTAL_PILES: usize = PILE_FOUNDATION_START + TOTAL_FOUNDATIONS;
const PILE_SIZE: usize = 16;

pub type Pile = SmallVec<[Card; PILE_SIZE]>;

/// Symmetry-normalised board key; see [`Board::canonical_state`].
pub type CanonicalState = SmallVec<[u8; 64]>;

const PILE_SEPARATOR: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Tableau(usize),
    Cell(usize),
    Foundation(Suit),
}

impl Location {
    pub fn index(self) -> usize {
        match self {
            Location::Tableau(i) => PILE_TABLEAU_START + i,
            Location::Cell(i) => PILE_CELL_START + i,
            Location::Foundation(suit) => PILE_FOUNDATION_START + suit.index(),
        }
    }

    pub fn name(self) -> String {
        match self {
            Location::Tableau(i) => format!("Tableau{}", i + 1),
            Location::Cell(i) => format!("Cell{}", i + 1),
            Location::Foundation(suit) => format!("Foundation{}", suit.index() + 1),
        }
    }

    pub fn tableaus() -> impl Iterator<Item = Location> {
        (0..TOTAL_TABLEAUS).map(Location::Tableau)
    }

    pub fn cells() -> impl Iterator<Item = Location> {
        (0..TOTAL_CELLS).map(Location::Cell)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Tableau(i) => write!(f, "T{}", i + 1),
            Location::Cell(i) => write!(f, "C{}", i + 1),
            Location::Foundation(suit) => write!(f, "F{}", suit.index() + 1),
        }
    }
}

/// A broken board invariant. Always a defect in whoever produced the move,
/// never an expected search outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    CardsMismatch(Location),
    EmptyHistory,
    SelfMove(Location),
    FoundationSuit(Card, Suit),
    FoundationSequence(Card),
    CellOccupied(Location),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CardsMismatch(location) => {
                write!(f, "moved cards do not match the top of {}", location.name())
            }
            Self::EmptyHistory => write!(f, "nothing to undo"),
            Self::SelfMove(location) => write!(f, "move from {} onto itself", location.name()),
            Self::FoundationSuit(card, suit) => write!(
                f,
                "{} placed on the {suit:?} foundation",
                card.pretty_print()
            ),
            Self::FoundationSequence(card) => {
                write!(f, "{} placed out of sequence on its foundation", card.pretty_print())
            }
            Self::CellOccupied(location) => {
                write!(f, "{} cannot take another card", location.name())
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    piles: [Pile; TOTAL_PILES],
    history: Vec<Move>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deals `deck` into the tableau, five cards per pile.
    pub fn from_deck(deck: &[Card]) -> Self {
        let mut board = Self::new();
        for (i, chunk) in deck.chunks(DEAL_SIZE).take(TOTAL_TABLEAUS).enumerate() {
            board.piles[PILE_TABLEAU_START + i].extend_from_slice(chunk);
        }
        board
    }

    pub fn new_from_seed(seed: u64) -> Self {
        Self::from_deck(&shuffled_deck(seed))
    }

    pub fn pile(&self, location: Location) -> &[Card] {
        &self.piles[location.index()]
    }

    pub fn topmost(&self, location: Location) -> Option<Card> {
        self.piles[location.index()].last().copied()
    }

    pub fn tableau(&self) -> &[Pile] {
        &self.piles[PILE_TABLEAU_START..PILE_CELL_START]
    }

    pub fn cells(&self) -> &[Pile] {
        &self.piles[PILE_CELL_START..PILE_FOUNDATION_START]
    }

    /// Foundations in the fixed order of [`Suit::ALL`].
    pub fn foundations(&self) -> &[Pile] {
        &self.piles[PILE_FOUNDATION_START..]
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn card_count(&self) -> usize {
        self.piles.iter().map(|pile| pile.len()).sum()
    }

    /// Rank of the top card on the foundation of `suit`, 0 when empty.
    pub fn foundation_rank(&self, suit: Suit) -> u8 {
        self.topmost(Location::Foundation(suit))
            .map(|card| card.rank())
            .unwrap_or(0)
    }

    /// A cell holding the collapsed dragons; nothing enters or leaves it.
    pub fn is_inert_cell(&self, index: usize) -> bool {
        self.piles[PILE_CELL_START + index].len() > 1
    }

    /// Tableau cleared. Parked dragons may still sit in the cells.
    pub fn solved(&self) -> bool {
        self.tableau().iter().all(|pile| pile.is_empty())
    }

    /// Key for the visited-state set. Foundations keep their fixed order;
    /// cells and tableau piles are each sorted, so boards that only differ
    /// by a permutation of interchangeable piles share a key.
    pub fn canonical_state(&self) -> CanonicalState {
        let mut state = CanonicalState::new();
        for pile in self.foundations() {
            state.push(pile.len() as u8);
        }

        let mut cells: SmallVec<[&Pile; TOTAL_CELLS]> = self.cells().iter().collect();
        cells.sort();
        let mut tableaus: SmallVec<[&Pile; TOTAL_TABLEAUS]> = self.tableau().iter().collect();
        tableaus.sort();

        for pile in cells.into_iter().chain(tableaus) {
            state.push(PILE_SEPARATOR);
            state.extend(pile.iter().map(|card| card.id()));
        }
        state
    }

    /// Applies `mov` and records it. A compound move lands completely or not
    /// at all.
    pub fn apply(&mut self, mov: Move) -> Result<(), InvariantViolation> {
        for (done, part) in mov.parts().iter().enumerate() {
            let result = self
                .check_destination(part)
                .and_then(|_| self.transfer(part));
            if let Err(err) = result {
                for applied in mov.parts()[..done].iter().rev() {
                    self.transfer(&applied.reversed())?;
                }
                return Err(err);
            }
        }
        self.history.push(mov);
        Ok(())
    }

    /// Reverts the most recent move, parts in reverse order.
    pub fn undo(&mut self) -> Result<Move, InvariantViolation> {
        let mov = self.history.pop().ok_or(InvariantViolation::EmptyHistory)?;
        for part in mov.parts().iter().rev() {
            self.transfer(&part.reversed())?;
        }
        Ok(mov)
    }

    fn transfer(&mut self, part: &SimpleMove) -> Result<(), InvariantViolation> {
        let (from, to) = (part.from.index(), part.to.index());
        if from == to {
            return Err(InvariantViolation::SelfMove(part.from));
        }
        if part.cards.is_empty() || !self.piles[from].ends_with(&part.cards) {
            return Err(InvariantViolation::CardsMismatch(part.from));
        }
        let len = self.piles[from].len();
        self.piles[from].truncate(len - part.count());
        self.piles[to].extend_from_slice(&part.cards);
        Ok(())
    }

    fn check_destination(&self, part: &SimpleMove) -> Result<(), InvariantViolation> {
        match part.to {
            Location::Foundation(suit) => {
                let mut rank = self.foundation_rank(suit);
                for &card in &part.cards {
                    if card.suit() != suit || card.is_dragon() {
                        return Err(InvariantViolation::FoundationSuit(card, suit));
                    }
                    if card.rank() != rank + 1 {
                        return Err(InvariantViolation::FoundationSequence(card));
                    }
                    rank += 1;
                }
            }
            Location::Cell(_) => {
                let cell = &self.piles[part.to.index()];
                let parking = part
                    .cards
                    .iter()
                    .chain(cell.iter())
                    .all(|&card| card.is_dragon() && card == part.cards[0]);
                if !(parking || (cell.is_empty() && part.count() == 1)) {
                    return Err(InvariantViolation::CellOccupied(part.to));
                }
            }
            Location::Tableau(_) => {}
        }
        Ok(())
    }

    /// Structural checks that hold for any reachable position, complete pack
    /// or not.
    pub fn validate(&self) -> Result<()> {
        let mut seen = [0usize; 64];
        for card in self.piles.iter().flat_map(|pile| pile.iter()) {
            let count = &mut seen[card.id() as usize];
            *count += 1;
            if *count > copies_in_pack(*card) {
                bail!("Too many copies of {}", card.pretty_print());
            }
        }

        for (suit, pile) in Suit::ALL.iter().zip(self.foundations()) {
            for (i, card) in pile.iter().enumerate() {
                if card.suit() != *suit || card.rank() as usize != i + 1 {
                    bail!("Foundation{} is out of order", suit.index() + 1);
                }
            }
        }

        for (i, pile) in self.cells().iter().enumerate() {
            if pile.len() > 1 && pile.iter().any(|&card| !card.is_dragon() || card != pile[0]) {
                bail!("Cell{} holds more than one card", i + 1);
            }
        }

        Ok(())
    }

    /// A dealt position: every card of the pack present.
    pub fn is_complete(&self) -> bool {
        self.card_count() == TOTAL_CARDS && self.validate().is_ok()
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut board = Self::new();

        for line in content
            .split('\n')
            .map(|v| v.trim())
            .filter(|l| !l.is_empty())
        {
            let line_context = || format!("Failed to parse at '{line}'");
            let (name, rest) = line
                .split_once(':')
                .context("Missing ':'")
                .with_context(line_context)?;
            let name = name.trim();
            let cards = Self::parse_cards(rest).with_context(line_context)?;

            let location = if let Some(idx) = name.strip_prefix("Tableau") {
                let idx = Self::parse_index(idx, TOTAL_TABLEAUS).with_context(line_context)?;
                Location::Tableau(idx)
            } else if let Some(idx) = name.strip_prefix("Cell") {
                Location::Cell(Self::parse_index(idx, TOTAL_CELLS).with_context(line_context)?)
            } else if let Some(idx) = name.strip_prefix("Foundation") {
                let idx = Self::parse_index(idx, TOTAL_FOUNDATIONS).with_context(line_context)?;
                let suit = Suit::ALL[idx];
                let Some(top) = cards.last() else {
                    continue;
                };
                if cards.len() != 1 || top.suit() != suit || top.is_dragon() {
                    bail!("Foundation{} must name one {suit:?} card", idx + 1);
                }
                let pile = &mut board.piles[Location::Foundation(suit).index()];
                pile.clear();
                pile.extend((1..=top.rank()).map(|rank| Card::new(suit, rank)));
                continue;
            } else {
                bail!("Unknown pile '{name}'");
            };
            board.piles[location.index()].extend(cards);
        }

        board.validate()?;
        Ok(board)
    }

    fn parse_index(s: &str, max: usize) -> Result<usize> {
        let idx = s.trim().parse::<usize>().context("Invalid pile index")?;
        if idx == 0 || idx > max {
            bail!("Pile index {idx} out of range");
        }
        Ok(idx - 1)
    }

    fn parse_cards(s: &str) -> Result<Vec<Card>> {
        s.split_whitespace().map(Card::parse).collect()
    }

    /// The parseable text form.
    pub fn pretty_print(&self) -> String {
        let mut lines = vec![];

        for (i, pile) in self.cells().iter().enumerate() {
            if !pile.is_empty() {
                lines.push(format!("Cell{}: {}", i + 1, Self::join_cards(pile)));
            }
        }

        for (i, pile) in self.foundations().iter().enumerate() {
            if let Some(card) = pile.last() {
                lines.push(format!("Foundation{}: {}", i + 1, card.pretty_print()));
            }
        }

        for (i, pile) in self.tableau().iter().enumerate() {
            if !pile.is_empty() {
                lines.push(format!("Tableau{}: {}", i + 1, Self::join_cards(pile)));
            }
        }

        lines.join("\n")
    }

    fn join_cards(cards: &[Card]) -> String {
        cards
            .iter()
            .map(|c| c.pretty_print())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |card: Option<&Card>| match card {
            Some(card) => card.pretty_print(),
            None => "--".to_string(),
        };

        let cells: Vec<String> = self
            .cells()
            .iter()
            .map(|pile| match pile.len() {
                0 | 1 => slot(pile.last()),
                _ => "XX".to_string(),
            })
            .collect();
        let foundations: Vec<String> = self.foundations().iter().map(|p| slot(p.last())).collect();
        write!(f, "{}    {}", cells.join(" "), foundations.join(" "))?;

        let height = self.tableau().iter().map(|p| p.len()).max().unwrap_or(0);
        if height > 0 {
            writeln!(f)?;
        }
        for row in 0..height {
            let line: Vec<String> = self
                .tableau()
                .iter()
                .map(|pile| match pile.get(row) {
                    Some(card) => card.pretty_print(),
                    None => "  ".to_string(),
                })
                .collect();
            write!(f, "\n{}", line.join(" ").trim_end())?;
        }
        Ok(())
    }
}
