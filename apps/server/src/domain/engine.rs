//! The per-game Bisca state machine.
//!
//! One `BiscaEngine` instance owns the deck, hands, table, trick history,
//! and scoring for a single game. All operations are synchronous and free
//! of I/O; concurrency control lives in the session layer.

use serde::{Deserialize, Serialize};

use crate::config::MarkRules;
use crate::domain::cards::{card_value, hand_has_suit, second_card_wins, Card, Suit};
use crate::domain::deck::{full_deck, shuffle, SplitMix64};
use crate::errors::domain::{DomainError, ValidationKind};

/// Hand-size modes. "3" is classic Bisca, "9" the long variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "9")]
    Nine,
}

impl GameMode {
    pub fn hand_size(self) -> usize {
        match self {
            GameMode::Three => 3,
            GameMode::Nine => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Player1,
    Player2,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::Player1 => Seat::Player2,
            Seat::Player2 => Seat::Player1,
        }
    }

    pub fn idx(self) -> usize {
        match self {
            Seat::Player1 => 0,
            Seat::Player2 => 1,
        }
    }
}

/// Game progression phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Deck non-empty: winners draw after each trick, no suit obligation.
    #[serde(rename = "draw")]
    Draw,
    /// Deck exhausted: the responding player must follow the led suit.
    #[serde(rename = "no-draw")]
    NoDraw,
    /// Terminal.
    #[serde(rename = "finished")]
    Finished,
}

/// Immutable record of one resolved trick.
#[derive(Debug, Clone, PartialEq)]
pub struct TrickRecord {
    /// 1-based trick number.
    pub number: u8,
    /// The two plays in table order: lead first.
    pub plays: [(Seat, Card); 2],
    pub winner: Seat,
    /// Sum of both cards' point values.
    pub points: u16,
    /// Trump suit in effect for the game.
    pub trump_suit: Suit,
}

/// What a successful `play_card` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    /// The table now holds two cards and awaits `resolve_trick`.
    pub trick_ready: bool,
}

#[derive(Debug, Clone)]
pub struct BiscaEngine {
    mode: GameMode,
    /// Remaining stock. Index 0 is the exposed trump card at the bottom;
    /// draws come off the end, so the trump card is drawn last.
    deck: Vec<Card>,
    hands: [Vec<Card>; 2],
    /// Cards played into the current trick, lead first. At most 2 entries.
    table: Vec<(Seat, Card)>,
    tricks: Vec<TrickRecord>,
    tricks_won: [u8; 2],
    scores: [u16; 2],
    trump_card: Card,
    phase: Phase,
    turn: Seat,
    winner: Option<Seat>,
}

impl BiscaEngine {
    /// Build, shuffle, and deal a fresh game. Deterministic given `seed`:
    /// the shuffle and the uniformly-random first turn both derive from it.
    pub fn new(mode: GameMode, seed: u64) -> Self {
        let mut rng = SplitMix64::new(seed);
        let mut deck = full_deck();
        shuffle(&mut deck, &mut rng);
        let first = if rng.next_range(2) == 0 {
            Seat::Player1
        } else {
            Seat::Player2
        };
        Self::from_deck(mode, deck, first)
    }

    /// Assemble a game from an explicit deck order and first mover.
    /// `deck[0]` becomes the trump card; dealing draws off the end,
    /// alternating player1/player2.
    pub fn from_deck(mode: GameMode, mut deck: Vec<Card>, first: Seat) -> Self {
        debug_assert_eq!(deck.len(), 40, "a Bisca deck holds 40 cards");
        let trump_card = deck[0];
        let mut hands: [Vec<Card>; 2] = [Vec::new(), Vec::new()];
        for _ in 0..mode.hand_size() {
            for hand in hands.iter_mut() {
                if let Some(card) = deck.pop() {
                    hand.push(card);
                }
            }
        }
        Self {
            mode,
            deck,
            hands,
            table: Vec::with_capacity(2),
            tricks: Vec::new(),
            tricks_won: [0; 2],
            scores: [0; 2],
            trump_card,
            phase: Phase::Draw,
            turn: first,
            winner: None,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn trump_card(&self) -> Card {
        self.trump_card
    }

    pub fn trump_suit(&self) -> Suit {
        self.trump_card.suit
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.len()
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat.idx()]
    }

    pub fn table(&self) -> &[(Seat, Card)] {
        &self.table
    }

    pub fn tricks(&self) -> &[TrickRecord] {
        &self.tricks
    }

    pub fn tricks_won(&self, seat: Seat) -> u8 {
        self.tricks_won[seat.idx()]
    }

    pub fn score(&self, seat: Seat) -> u16 {
        self.scores[seat.idx()]
    }

    pub fn scores(&self) -> [u16; 2] {
        self.scores
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Live per-seat marks derived from the current scores.
    pub fn marks(&self, rules: &MarkRules) -> [u8; 2] {
        [
            rules.marks_for(self.scores[0]),
            rules.marks_for(self.scores[1]),
        ]
    }

    /// Play a card from `seat`'s hand onto the table.
    ///
    /// The engine does not auto-resolve a completed trick: the caller
    /// observes `trick_ready` and triggers `resolve_trick` after the
    /// reveal window.
    pub fn play_card(&mut self, seat: Seat, card: Card) -> Result<PlayOutcome, DomainError> {
        if self.phase == Phase::Finished {
            return Err(DomainError::validation(
                ValidationKind::GameFinished,
                "Game already finished",
            ));
        }
        if self.table.len() == 2 {
            return Err(DomainError::validation(
                ValidationKind::TrickAlreadyComplete,
                "Trick awaiting resolution",
            ));
        }
        if seat != self.turn {
            return Err(DomainError::validation(
                ValidationKind::NotPlayersTurn,
                "Not your turn",
            ));
        }

        let hand = &self.hands[seat.idx()];
        let Some(pos) = hand.iter().position(|&c| c == card) else {
            return Err(DomainError::validation(
                ValidationKind::CardNotInHand,
                "Card not in hand",
            ));
        };

        // Suit following binds only once the stock is exhausted.
        if self.phase == Phase::NoDraw {
            if let Some(&(_, lead)) = self.table.first() {
                if hand_has_suit(hand, lead.suit) && card.suit != lead.suit {
                    return Err(DomainError::validation(
                        ValidationKind::MustFollowSuit,
                        "Must follow the led suit",
                    ));
                }
            }
        }

        let played = self.hands[seat.idx()].remove(pos);
        self.table.push((seat, played));

        let trick_ready = self.table.len() == 2;
        if !trick_ready {
            self.turn = seat.other();
        }

        Ok(PlayOutcome { trick_ready })
    }

    /// Resolve the completed trick on the table.
    ///
    /// Winner takes the points and leads the next trick; both players
    /// replenish from the stock (winner first) while it lasts. The game
    /// finishes exactly when both hands and the deck are simultaneously
    /// empty.
    pub fn resolve_trick(&mut self) -> Result<TrickRecord, DomainError> {
        if self.table.len() != 2 {
            return Err(DomainError::validation(
                ValidationKind::TrickNotComplete,
                "Trick not complete",
            ));
        }

        let (lead_seat, lead) = self.table[0];
        let (second_seat, second) = self.table[1];
        let winner = if second_card_wins(lead, second, self.trump_suit()) {
            second_seat
        } else {
            lead_seat
        };
        let points = card_value(lead) + card_value(second);

        let record = TrickRecord {
            number: self.tricks.len() as u8 + 1,
            plays: [(lead_seat, lead), (second_seat, second)],
            winner,
            points,
            trump_suit: self.trump_suit(),
        };

        self.scores[winner.idx()] += points;
        self.tricks_won[winner.idx()] += 1;
        self.tricks.push(record.clone());
        self.table.clear();

        // Winner draws first, then the loser, each only up to hand size.
        let hand_size = self.mode.hand_size();
        for seat in [winner, winner.other()] {
            if !self.deck.is_empty() && self.hands[seat.idx()].len() < hand_size {
                if let Some(card) = self.deck.pop() {
                    self.hands[seat.idx()].push(card);
                }
            }
        }
        if self.deck.is_empty() && self.phase == Phase::Draw {
            self.phase = Phase::NoDraw;
        }

        self.turn = winner;

        if self.deck.is_empty() && self.hands.iter().all(|hand| hand.is_empty()) {
            self.phase = Phase::Finished;
            self.winner = match self.scores[0].cmp(&self.scores[1]) {
                std::cmp::Ordering::Greater => Some(Seat::Player1),
                std::cmp::Ordering::Less => Some(Seat::Player2),
                std::cmp::Ordering::Equal => None,
            };
        }

        Ok(record)
    }

    /// Forced resolution for surrender/timeout/disconnect: every card still
    /// in either hand, on the table, and left in the stock (trump included)
    /// is credited to `seat` in one lump, and `seat` wins outright.
    ///
    /// Returns the points awarded.
    pub fn award_remaining_to(&mut self, seat: Seat) -> Result<u16, DomainError> {
        if self.phase == Phase::Finished {
            return Err(DomainError::validation(
                ValidationKind::GameFinished,
                "Game already finished",
            ));
        }

        let mut awarded: u16 = 0;
        for hand in self.hands.iter_mut() {
            awarded += hand.drain(..).map(card_value).sum::<u16>();
        }
        awarded += self.table.drain(..).map(|(_, c)| card_value(c)).sum::<u16>();
        awarded += self.deck.drain(..).map(card_value).sum::<u16>();

        self.scores[seat.idx()] += awarded;
        self.phase = Phase::Finished;
        self.winner = Some(seat);

        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::Rank;

    fn c(id: &str) -> Card {
        id.parse().expect("valid card token")
    }

    /// Deck ordered so the deal is predictable: dealing pops from the end,
    /// alternating player1/player2; `deck[0]` is the trump card.
    fn rigged_engine(top_cards: &[&str], first: Seat) -> BiscaEngine {
        let mut deck = full_deck();
        // Move the requested cards to the end, preserving request order
        // (last requested ends up dealt first).
        for id in top_cards.iter().rev() {
            let card = c(id);
            let pos = deck.iter().position(|&x| x == card).expect("card in deck");
            let card = deck.remove(pos);
            deck.push(card);
        }
        BiscaEngine::from_deck(GameMode::Three, deck, first)
    }

    #[test]
    fn deal_draws_from_the_top_and_trump_stays_at_bottom() {
        let engine = BiscaEngine::new(GameMode::Three, 9);
        assert_eq!(engine.hand(Seat::Player1).len(), 3);
        assert_eq!(engine.hand(Seat::Player2).len(), 3);
        assert_eq!(engine.deck_remaining(), 34);
        assert_eq!(engine.phase(), Phase::Draw);
        // The exposed trump card is still in the stock.
        assert_eq!(engine.trump_card().suit, engine.trump_suit());

        let nine = BiscaEngine::new(GameMode::Nine, 9);
        assert_eq!(nine.hand(Seat::Player1).len(), 9);
        assert_eq!(nine.deck_remaining(), 22);
    }

    #[test]
    fn same_seed_same_game() {
        let a = BiscaEngine::new(GameMode::Three, 1234);
        let b = BiscaEngine::new(GameMode::Three, 1234);
        assert_eq!(a.hand(Seat::Player1), b.hand(Seat::Player1));
        assert_eq!(a.trump_card(), b.trump_card());
        assert_eq!(a.turn(), b.turn());
    }

    #[test]
    fn play_card_rejections() {
        // P1 deals HA, HK, HQ; P2 deals H7, HJ, H6.
        let mut engine = rigged_engine(&["HA", "H7", "HK", "HJ", "HQ", "H6"], Seat::Player1);

        let err = engine.play_card(Seat::Player2, c("H7")).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(ValidationKind::NotPlayersTurn, "Not your turn")
        );

        let err = engine.play_card(Seat::Player1, c("S2")).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(ValidationKind::CardNotInHand, "Card not in hand")
        );

        engine.play_card(Seat::Player1, c("HA")).unwrap();
        let out = engine.play_card(Seat::Player2, c("H7")).unwrap();
        assert!(out.trick_ready);

        // Third play while the trick awaits resolution.
        let err = engine.play_card(Seat::Player1, c("HK")).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                ValidationKind::TrickAlreadyComplete,
                "Trick awaiting resolution"
            )
        );
    }

    #[test]
    fn resolve_requires_two_cards() {
        let mut engine = rigged_engine(&["HA", "H7", "HK", "HJ", "HQ", "H6"], Seat::Player1);
        assert!(engine.resolve_trick().is_err());
        engine.play_card(Seat::Player1, c("HA")).unwrap();
        assert!(engine.resolve_trick().is_err());
    }

    #[test]
    fn trick_resolution_scores_and_replenishes() {
        let mut engine = rigged_engine(&["HA", "H7", "HK", "HJ", "HQ", "H6"], Seat::Player1);
        engine.play_card(Seat::Player1, c("HA")).unwrap();
        engine.play_card(Seat::Player2, c("H7")).unwrap();

        let record = engine.resolve_trick().unwrap();
        assert_eq!(record.number, 1);
        assert_eq!(record.winner, Seat::Player1); // ace outranks the seven
        assert_eq!(record.points, 21);
        assert_eq!(engine.score(Seat::Player1), 21);
        assert_eq!(engine.tricks_won(Seat::Player1), 1);
        assert_eq!(engine.turn(), Seat::Player1); // winner leads
        assert!(engine.table().is_empty());
        // Both drew back up to 3.
        assert_eq!(engine.hand(Seat::Player1).len(), 3);
        assert_eq!(engine.hand(Seat::Player2).len(), 3);
        assert_eq!(engine.deck_remaining(), 32);
    }

    #[test]
    fn no_suit_obligation_while_deck_lasts() {
        let mut engine = rigged_engine(&["HA", "H7", "HK", "HJ", "SQ", "S6"], Seat::Player1);
        engine.play_card(Seat::Player1, c("HA")).unwrap();
        // P2 holds hearts (H7, HJ) but may discard off-suit in draw phase.
        assert!(engine.play_card(Seat::Player2, c("S6")).is_ok());
    }

    #[test]
    fn must_follow_suit_in_no_draw_phase() {
        let mut engine = rigged_engine(&["HA", "H7", "HK", "HJ", "SQ", "S6"], Seat::Player1);
        // Emptying the stock by hand puts the engine in its end-game shape.
        engine.deck.clear();
        engine.phase = Phase::NoDraw;

        engine.play_card(Seat::Player1, c("HA")).unwrap();
        let err = engine.play_card(Seat::Player2, c("S6")).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(ValidationKind::MustFollowSuit, "Must follow the led suit")
        );
        // Following suit is accepted.
        assert!(engine.play_card(Seat::Player2, c("H7")).is_ok());
    }

    #[test]
    fn void_in_led_suit_allows_any_card() {
        let mut engine = rigged_engine(&["HA", "S7", "HK", "SJ", "HQ", "S6"], Seat::Player1);
        engine.deck.clear();
        engine.phase = Phase::NoDraw;

        engine.play_card(Seat::Player1, c("HA")).unwrap();
        // P2 holds only spades; any card goes.
        assert!(engine.play_card(Seat::Player2, c("SJ")).is_ok());
    }

    #[test]
    fn award_remaining_accounts_for_every_card() {
        let mut engine = BiscaEngine::new(GameMode::Three, 77);
        // Play one card so the table is also non-empty when the award lands.
        let turn = engine.turn();
        let card = engine.hand(turn)[0];
        engine.play_card(turn, card).unwrap();

        let outstanding: u16 = engine
            .hands
            .iter()
            .flatten()
            .chain(engine.table.iter().map(|(_, c)| c))
            .chain(engine.deck.iter())
            .map(|&c| card_value(c))
            .sum();

        let before = engine.scores();
        let awarded = engine.award_remaining_to(Seat::Player2).unwrap();
        assert_eq!(awarded, outstanding);
        assert_eq!(engine.phase(), Phase::Finished);
        assert_eq!(engine.winner(), Some(Seat::Player2));
        assert_eq!(engine.score(Seat::Player2), before[1] + awarded);
        assert_eq!(engine.deck_remaining(), 0);
        assert!(engine.hand(Seat::Player1).is_empty());
        assert!(engine.table().is_empty());
        // Total points in play always reconcile to 120.
        assert_eq!(engine.score(Seat::Player1) + engine.score(Seat::Player2), 120);

        assert!(engine.award_remaining_to(Seat::Player1).is_err());
    }

    #[test]
    fn full_game_conserves_120_points_and_finishes_at_exhaustion() {
        let mut engine = BiscaEngine::new(GameMode::Three, 4242);
        let mut tricks = 0;
        while !engine.is_finished() {
            let seat = engine.turn();
            // Pick the first legal card (suit-following may bind).
            let hand: Vec<Card> = engine.hand(seat).to_vec();
            let mut played = false;
            for card in hand {
                if engine.play_card(seat, card).is_ok() {
                    played = true;
                    break;
                }
            }
            assert!(played, "a legal play must always exist");
            if engine.table().len() == 2 {
                engine.resolve_trick().unwrap();
                tricks += 1;
                // Never finished while cards remain anywhere.
                if !engine.is_finished() {
                    let remaining = engine.deck_remaining()
                        + engine.hand(Seat::Player1).len()
                        + engine.hand(Seat::Player2).len();
                    assert!(remaining > 0);
                }
            }
        }
        // 40 cards, 2 per trick.
        assert_eq!(tricks, 20);
        assert_eq!(engine.score(Seat::Player1) + engine.score(Seat::Player2), 120);
        assert_eq!(
            engine.tricks_won(Seat::Player1) + engine.tricks_won(Seat::Player2),
            20
        );
        match engine.winner() {
            Some(seat) => assert!(engine.score(seat) > engine.score(seat.other())),
            None => assert_eq!(engine.score(Seat::Player1), 60),
        }
    }

    #[test]
    fn marks_follow_live_scores() {
        let mut engine = BiscaEngine::new(GameMode::Three, 5);
        let rules = MarkRules::default();
        assert_eq!(engine.marks(&rules), [0, 0]);
        engine.scores = [65, 95];
        assert_eq!(engine.marks(&rules), [1, 2]);
    }

    #[test]
    fn ranks_cover_the_bisca_deck() {
        assert_eq!(Rank::ALL.len(), 10);
        assert_eq!(Suit::ALL.len(), 4);
    }
}
