//! The enum-size guessing game.
//!
//! Custom-attribute blobs store enum values with the width of the enum's
//! underlying integer type, but when the defining assembly is not loaded the
//! width is unknowable - the blob must be parsed to find out, and parsing needs
//! the width. The way out is a bounded backtracking search: guess a width per
//! unresolved enum reference, parse, and on failure advance to the next width in
//! the fixed cycle 4 → 1 → 2 → 8 until the parse succeeds or every combination
//! is exhausted.
//!
//! The cycle order is part of the contract: existing binaries were produced
//! under it, and changing it would make previously-converging inputs diverge.
//!
//! A successful parse promotes the guesses in play to a global known-good table
//! keyed by interned type reference; future games consult it first and never
//! re-enter the wild-guess cycle for a promoted reference.

use dashmap::DashMap;

use crate::intern::TypeKey;

/// The guess cycle, in contract order.
const GUESS_CYCLE: [u32; 4] = [4, 1, 2, 8];

/// Width the first wild guess uses.
const WILD_GUESS: u32 = GUESS_CYCLE[0];

/// Per-reference enum-width guessing across repeated parse attempts.
///
/// One game brackets one parse attempt of a blob:
/// [`start_guessing_game`] resets the in-play guesses,
/// [`guess_underlying_type_size`] supplies widths during the parse,
/// [`try_next_permutation`] advances after a failed parse, and
/// [`win_guessing_game`] promotes the in-play guesses when the parse succeeds.
///
/// [`start_guessing_game`]: GuessingGame::start_guessing_game
/// [`guess_underlying_type_size`]: GuessingGame::guess_underlying_type_size
/// [`try_next_permutation`]: GuessingGame::try_next_permutation
/// [`win_guessing_game`]: GuessingGame::win_guessing_game
pub struct GuessingGame {
    /// Promoted guesses, shared across games for the factory's lifetime.
    known_good: DashMap<TypeKey, u32>,
    /// Guesses in play for the current game, in first-guess order.
    current: std::sync::Mutex<Vec<(TypeKey, u32)>>,
}

impl GuessingGame {
    /// Create a game with an empty known-good table.
    #[must_use]
    pub fn new() -> GuessingGame {
        GuessingGame {
            known_good: DashMap::new(),
            current: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Begin a parse attempt: discard any in-play guesses.
    pub fn start_guessing_game(&self) {
        lock!(self.current).clear();
    }

    /// The width to use for `reference` right now.
    ///
    /// A promoted reference returns its known-good width. Otherwise the
    /// in-play guess is returned, or - on the first ask - the wild guess (4)
    /// is recorded and returned.
    pub fn guess_underlying_type_size(&self, reference: TypeKey) -> u32 {
        if let Some(known) = self.known_good.get(&reference) {
            return *known;
        }

        let mut current = lock!(self.current);
        if let Some(&(_, guess)) = current.iter().find(|(key, _)| *key == reference) {
            return guess;
        }

        current.push((reference, WILD_GUESS));
        WILD_GUESS
    }

    /// Advance to the next untried combination after a failed parse.
    ///
    /// Works like an odometer over the in-play references: the first reference
    /// that can still advance moves one step along the cycle and every
    /// reference before it resets to the cycle start. Returns `false` when all
    /// combinations are exhausted - the caller gives up on the blob.
    pub fn try_next_permutation(&self) -> bool {
        let mut current = lock!(self.current);
        for position in 0..current.len() {
            let guess = current[position].1;
            if let Some(next) = next_in_cycle(guess) {
                current[position].1 = next;
                for earlier in current.iter_mut().take(position) {
                    earlier.1 = WILD_GUESS;
                }
                return true;
            }
        }
        false
    }

    /// The parse succeeded: promote the in-play guesses to the known-good
    /// table and end the game.
    pub fn win_guessing_game(&self) {
        let mut current = lock!(self.current);
        for (reference, guess) in current.drain(..) {
            self.known_good.insert(reference, guess);
        }
    }
}

impl Default for GuessingGame {
    fn default() -> Self {
        GuessingGame::new()
    }
}

/// The width after `guess` in the cycle, or `None` at the cycle's end.
fn next_in_cycle(guess: u32) -> Option<u32> {
    let position = GUESS_CYCLE.iter().position(|&width| width == guess)?;
    GUESS_CYCLE.get(position + 1).copied()
}
