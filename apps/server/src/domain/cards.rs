//! Core card types: Card, Rank, Suit, point values, and the trick
//! comparison rule.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "H")]
    Hearts,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "C")]
    Clubs,
    #[serde(rename = "S")]
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn as_char(self) -> char {
        match self {
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Spades => 'S',
        }
    }
}

/// Ranks in the 40-card Bisca deck, in descending trick strength.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "2")]
    Two,
}

impl Rank {
    pub const ALL: [Rank; 10] = [
        Rank::Ace,
        Rank::Seven,
        Rank::King,
        Rank::Jack,
        Rank::Queen,
        Rank::Six,
        Rank::Five,
        Rank::Four,
        Rank::Three,
        Rank::Two,
    ];

    pub fn as_char(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Seven => '7',
            Rank::King => 'K',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::Six => '6',
            Rank::Five => '5',
            Rank::Four => '4',
            Rank::Three => '3',
            Rank::Two => '2',
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    /// Two-character identity used on the wire: suit char then rank char
    /// ("HA" is the ace of hearts).
    pub fn id(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push(self.suit.as_char());
        s.push(self.rank.as_char());
        s
    }

    pub fn value(&self) -> u16 {
        card_value(*self)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Card {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(suit_ch), Some(rank_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(DomainError::validation(
                ValidationKind::ParseCard,
                format!("Invalid card id: {s:?}"),
            ));
        };
        let suit = match suit_ch {
            'H' => Suit::Hearts,
            'D' => Suit::Diamonds,
            'C' => Suit::Clubs,
            'S' => Suit::Spades,
            _ => {
                return Err(DomainError::validation(
                    ValidationKind::ParseCard,
                    format!("Invalid card id: {s:?}"),
                ))
            }
        };
        let rank = match rank_ch {
            'A' => Rank::Ace,
            '7' => Rank::Seven,
            'K' => Rank::King,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            '6' => Rank::Six,
            '5' => Rank::Five,
            '4' => Rank::Four,
            '3' => Rank::Three,
            '2' => Rank::Two,
            _ => {
                return Err(DomainError::validation(
                    ValidationKind::ParseCard,
                    format!("Invalid card id: {s:?}"),
                ))
            }
        };
        Ok(Card { suit, rank })
    }
}

// Wire shape: { "id": "HA", "suit": "H", "rank": "A", "value": 11 }.
// The id alone is authoritative on the way back in.
impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Card", 4)?;
        s.serialize_field("id", &self.id())?;
        s.serialize_field("suit", &self.suit)?;
        s.serialize_field("rank", &self.rank)?;
        s.serialize_field("value", &self.value())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CardVisitor;

        impl<'de> Visitor<'de> for CardVisitor {
            type Value = Card;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a card id string or a card object with an \"id\" field")
            }

            fn visit_str<E>(self, v: &str) -> Result<Card, E>
            where
                E: de::Error,
            {
                v.parse().map_err(|e: DomainError| E::custom(e.to_string()))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Card, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut id: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "id" {
                        id = Some(map.next_value()?);
                    } else {
                        let _: de::IgnoredAny = map.next_value()?;
                    }
                }
                let id = id.ok_or_else(|| de::Error::missing_field("id"))?;
                id.parse()
                    .map_err(|e: DomainError| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_any(CardVisitor)
    }
}

/// Fixed point value per rank: A=11, 7=10, K=4, J=3, Q=2, all others 0.
pub fn card_value(card: Card) -> u16 {
    match card.rank {
        Rank::Ace => 11,
        Rank::Seven => 10,
        Rank::King => 4,
        Rank::Jack => 3,
        Rank::Queen => 2,
        _ => 0,
    }
}

pub fn hand_has_suit(hand: &[Card], suit: Suit) -> bool {
    hand.iter().any(|c| c.suit == suit)
}

/// The central trick comparison rule.
///
/// - Same suit: strictly higher value wins (equal values keep the lead).
/// - Trump beats non-trump regardless of value.
/// - Differing non-trump suits: the lead wins unconditionally.
pub fn second_card_wins(lead: Card, second: Card, trump: Suit) -> bool {
    let lead_trump = lead.suit == trump;
    let second_trump = second.suit == trump;

    if second_trump && !lead_trump {
        return true;
    }
    if lead_trump && !second_trump {
        return false;
    }
    if lead.suit == second.suit {
        return card_value(second) > card_value(lead);
    }
    // Off-suit, non-trump response can never win.
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> Card {
        id.parse().expect("valid card token")
    }

    #[test]
    fn id_roundtrip() {
        for (suit, rank, token) in [
            (Suit::Hearts, Rank::Ace, "HA"),
            (Suit::Diamonds, Rank::Seven, "D7"),
            (Suit::Clubs, Rank::Two, "C2"),
            (Suit::Spades, Rank::Queen, "SQ"),
        ] {
            let card = Card::new(suit, rank);
            assert_eq!(card.id(), token);
            assert_eq!(c(token), card);
        }
    }

    #[test]
    fn rejects_invalid_tokens() {
        for tok in ["", "H", "XA", "H8", "HAA", "ah"] {
            assert!(tok.parse::<Card>().is_err(), "accepted {tok:?}");
        }
    }

    #[test]
    fn wire_object_shape() {
        let v = serde_json::to_value(c("HA")).unwrap();
        assert_eq!(v["id"], "HA");
        assert_eq!(v["suit"], "H");
        assert_eq!(v["rank"], "A");
        assert_eq!(v["value"], 11);

        let back: Card = serde_json::from_value(v).unwrap();
        assert_eq!(back, c("HA"));
        let from_str: Card = serde_json::from_str("\"HA\"").unwrap();
        assert_eq!(from_str, c("HA"));
    }

    #[test]
    fn point_values() {
        assert_eq!(card_value(c("HA")), 11);
        assert_eq!(card_value(c("H7")), 10);
        assert_eq!(card_value(c("HK")), 4);
        assert_eq!(card_value(c("HJ")), 3);
        assert_eq!(card_value(c("HQ")), 2);
        for tok in ["H6", "H5", "H4", "H3", "H2"] {
            assert_eq!(card_value(c(tok)), 0);
        }
    }

    #[test]
    fn same_suit_higher_value_wins() {
        assert!(second_card_wins(c("HK"), c("HA"), Suit::Spades));
        assert!(!second_card_wins(c("HA"), c("HK"), Suit::Spades));
        // Equal values (two zero-value cards): lead keeps the trick.
        assert!(!second_card_wins(c("H6"), c("H2"), Suit::Spades));
    }

    #[test]
    fn trump_beats_non_trump() {
        assert!(second_card_wins(c("HA"), c("S2"), Suit::Spades));
        assert!(!second_card_wins(c("S2"), c("HA"), Suit::Spades));
    }

    #[test]
    fn off_suit_response_never_wins() {
        // Ace of diamonds (11) against a led two of hearts, spades trump.
        assert!(!second_card_wins(c("H2"), c("DA"), Suit::Spades));
    }

    #[test]
    fn trump_seven_beats_off_suit_ace() {
        // Lead plays the 7 of trump; a non-trump ace cannot take it.
        assert!(!second_card_wins(c("S7"), c("HA"), Suit::Spades));
    }
}
