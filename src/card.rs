use anyhow::{Result, bail};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

pub const TOTAL_CARDS: usize = 40;
pub const MAX_RANK: u8 = 9;
pub const DRAGONS_PER_SUIT: usize = 4;
/// Rank used for dragon cards, which never take part in rank arithmetic.
pub const DRAGON: u8 = 0;

const RANK_SLOTS: u8 = MAX_RANK + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Flower,
    Red,
    Green,
    Black,
}

impl Suit {
    /// Fixed foundation order.
    pub const ALL: [Suit; 4] = [Suit::Flower, Suit::Red, Suit::Green, Suit::Black];
    pub const COLOURS: [Suit; 3] = [Suit::Red, Suit::Green, Suit::Black];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Suit> {
        Self::ALL.get(index).copied()
    }

    fn letter(self) -> char {
        match self {
            Suit::Flower => 'f',
            Suit::Red => 'r',
            Suit::Green => 'g',
            Suit::Black => 'b',
        }
    }

    fn from_letter(c: char) -> Option<Suit> {
        match c.to_ascii_lowercase() {
            'r' => Some(Suit::Red),
            'g' => Some(Suit::Green),
            'b' => Some(Suit::Black),
            _ => None,
        }
    }
}

/// A card packed into a single byte: `suit * 10 + rank`, with rank 0 for dragons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Card(u8);

impl Card {
    pub const FLOWER: Card = Card(1);

    pub fn new(suit: Suit, rank: u8) -> Self {
        debug_assert!(rank <= MAX_RANK);
        debug_assert!(suit != Suit::Flower || rank == 1);
        Self(suit as u8 * RANK_SLOTS + rank)
    }

    pub fn dragon(suit: Suit) -> Self {
        Self::new(suit, DRAGON)
    }

    pub fn id(&self) -> u8 {
        self.0
    }

    pub fn suit(&self) -> Suit {
        Suit::ALL[(self.0 / RANK_SLOTS) as usize]
    }

    pub fn rank(&self) -> u8 {
        self.0 % RANK_SLOTS
    }

    pub fn is_dragon(&self) -> bool {
        self.rank() == DRAGON
    }

    pub fn is_flower(&self) -> bool {
        *self == Self::FLOWER
    }

    pub fn is_numbered(&self) -> bool {
        !self.is_dragon() && !self.is_flower()
    }

    /// Whether `self` may be placed directly on top of `other`, where `None`
    /// is an empty pile. Only numbered cards stack, descending with
    /// alternating suits.
    pub fn legal_on(&self, other: Option<Card>) -> bool {
        let Some(other) = other else {
            return true;
        };
        if !self.is_numbered() || !other.is_numbered() {
            return false;
        }
        other.rank() == self.rank() + 1 && other.suit() != self.suit()
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let (Some(c1), Some(c2), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("Invalid card '{s}'");
        };
        if s == "FL" {
            return Ok(Self::FLOWER);
        }
        let Some(suit) = Suit::from_letter(c1) else {
            bail!("Invalid suit at card '{s}'");
        };
        if c1.is_ascii_uppercase() && c1 == c2 {
            return Ok(Self::dragon(suit));
        }
        match c2.to_digit(10) {
            Some(rank @ 1..=9) if c1.is_ascii_lowercase() => Ok(Self::new(suit, rank as u8)),
            _ => bail!("Invalid rank at card '{s}'"),
        }
    }

    pub fn pretty_print(&self) -> String {
        if self.is_flower() {
            return "FL".to_string();
        }
        let letter = self.suit().letter();
        if self.is_dragon() {
            let upper = letter.to_ascii_uppercase();
            format!("{upper}{upper}")
        } else {
            format!("{letter}{}", self.rank())
        }
    }
}

/// The fixed 40-card pack in canonical order.
pub fn new_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(TOTAL_CARDS);
    for suit in Suit::COLOURS {
        for _ in 0..DRAGONS_PER_SUIT {
            deck.push(Card::dragon(suit));
        }
        for rank in 1..=MAX_RANK {
            deck.push(Card::new(suit, rank));
        }
    }
    deck.push(Card::FLOWER);
    deck
}

/// A fresh, independently owned permutation of the pack.
pub fn shuffled_deck(seed: u64) -> Vec<Card> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut deck = new_deck();
    deck.shuffle(&mut rng);
    deck
}

/// How many copies of `card` a complete pack holds.
pub fn copies_in_pack(card: Card) -> usize {
    if card.is_dragon() { DRAGONS_PER_SUIT } else { 1 }
}
