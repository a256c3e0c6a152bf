use crate::board::{Board, Location};
use crate::card::Card;

use smallvec::SmallVec;
use std::fmt;

/// Cards moved in one step; a run never exceeds nine cards.
pub type Run = SmallVec<[Card; 9]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleMove {
    pub cards: Run,
    pub from: Location,
    pub to: Location,
}

impl SimpleMove {
    pub fn new(cards: &[Card], from: Location, to: Location) -> Self {
        Self {
            cards: cards.iter().copied().collect(),
            from,
            to,
        }
    }

    pub fn single(card: Card, from: Location, to: Location) -> Self {
        Self::new(&[card], from, to)
    }

    pub fn count(&self) -> usize {
        self.cards.len()
    }

    /// The same cards travelling back.
    pub fn reversed(&self) -> Self {
        Self {
            cards: self.cards.clone(),
            from: self.to,
            to: self.from,
        }
    }
}

/// A move is either one transfer or several transfers that must be applied
/// and undone together (the four-dragon collapse).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    Simple(SimpleMove),
    Compound(SmallVec<[SimpleMove; 4]>),
}

impl Move {
    pub fn single(card: Card, from: Location, to: Location) -> Self {
        Move::Simple(SimpleMove::single(card, from, to))
    }

    pub fn parts(&self) -> &[SimpleMove] {
        match self {
            Move::Simple(part) => std::slice::from_ref(part),
            Move::Compound(parts) => parts,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Move::Compound(_))
    }

    pub fn destination(&self) -> Option<Location> {
        self.parts().last().map(|part| part.to)
    }
}

impl From<SimpleMove> for Move {
    fn from(part: SimpleMove) -> Self {
        Move::Simple(part)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Simple(part) => {
                write!(f, "{}:{}", part.from, part.to)?;
                if part.count() > 1 {
                    write!(f, "@{}", part.count())?;
                }
                Ok(())
            }
            Move::Compound(parts) => match parts.first() {
                Some(part) => write!(f, "{}:{}", part.cards[0].pretty_print(), part.to),
                None => Ok(()),
            },
        }
    }
}

/// Compact listing, ten moves per line.
pub fn format_moves(moves: &[Move]) -> String {
    let list: Vec<String> = moves.iter().map(|m| m.to_string()).collect();

    let mut output = String::new();
    let max_width = list.iter().map(|s| s.len()).max().unwrap_or_default() + 1;
    for chunk in list.chunks(10) {
        for cmd in chunk {
            output.push_str(&format!("{cmd:<width$}", width = max_width));
        }
        output.push('\n');
    }

    output
}

/// Describes `mov` against the board it is about to be applied to.
pub fn describe_move(board: &Board, mov: &Move) -> String {
    let format_card =
        |card: Option<Card>| -> String { card.map(|c| c.pretty_print()).unwrap_or_default() };

    match mov {
        Move::Simple(part) => {
            let from_cards = part
                .cards
                .iter()
                .map(|c| c.pretty_print())
                .collect::<Vec<_>>()
                .join(" ");
            let to_card = format_card(board.topmost(part.to));
            format!(
                "({}) {from_cards} -> ({}) {to_card}",
                part.from.name(),
                part.to.name()
            )
        }
        Move::Compound(parts) => {
            let sources = parts
                .iter()
                .map(|part| part.from.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let (dragon, to) = match parts.first() {
                Some(part) => (part.cards[0].pretty_print(), part.to.name()),
                None => return String::new(),
            };
            format!("Collapse dragons {dragon} from {sources} -> ({to})")
        }
    }
}
