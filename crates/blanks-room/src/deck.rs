//! Draw piles and the refill that keeps every answer card in one place.
//!
//! An answer card may live in exactly one of: a player's hand, the
//! `playedCards` map, or the white draw pile. Refilling the pile therefore
//! only adds catalog cards that are in none of those places. A refill runs
//! lazily, right before a draw that the pile can't cover.
//!
//! Piles are drawn from the front.

use std::collections::HashSet;

use blanks_protocol::{CardCatalog, PlayerName, PromptCard, Room, normalize};
use rand::Rng;
use rand::seq::SliceRandom;

/// Every answer currently held by a player, submitted, or in the pile.
pub fn held_answers(room: &Room) -> HashSet<String> {
    let hands = room.players.values().flat_map(|p| p.hand.iter());
    let played = room.played_cards.values().flatten();
    hands
        .chain(played)
        .chain(room.white_deck.iter())
        .map(|card| normalize(card).to_string())
        .collect()
}

/// Appends one copy of every catalog answer that isn't held anywhere,
/// shuffled.
///
/// Returns how many cards were added.
pub fn refill_answers<R: Rng + ?Sized>(room: &mut Room, catalog: &CardCatalog, rng: &mut R) -> usize {
    let mut held = held_answers(room);
    // Repeated catalog text is accepted once.
    let mut fresh: Vec<String> = catalog
        .answer_cards()
        .iter()
        .filter(|card| held.insert(normalize(card).to_string()))
        .cloned()
        .collect();
    fresh.shuffle(rng);
    let added = fresh.len();
    room.white_deck.extend(fresh);
    tracing::trace!(code = %room.code, added, "white deck refilled");
    added
}

/// Takes up to `count` answers off the pile, refilling it first if it is
/// too short. Returns fewer than `count` only when the catalog runs dry.
pub fn draw_answers<R: Rng + ?Sized>(
    room: &mut Room,
    count: usize,
    catalog: &CardCatalog,
    rng: &mut R,
) -> Vec<String> {
    if room.white_deck.len() < count {
        refill_answers(room, catalog, rng);
    }
    let take = count.min(room.white_deck.len());
    room.white_deck.drain(..take).collect()
}

/// Draws until `player` holds `hand_size` cards.
pub fn top_up<R: Rng + ?Sized>(
    room: &mut Room,
    player: &PlayerName,
    hand_size: usize,
    catalog: &CardCatalog,
    rng: &mut R,
) {
    let missing = match room.players.get(player) {
        Some(p) => hand_size.saturating_sub(p.hand.len()),
        None => return,
    };
    if missing == 0 {
        return;
    }
    let drawn = draw_answers(room, missing, catalog, rng);
    if let Some(p) = room.players.get_mut(player) {
        p.hand.extend(drawn);
    }
}

/// Tops up every hand, in seat order.
pub fn top_up_all<R: Rng + ?Sized>(
    room: &mut Room,
    hand_size: usize,
    catalog: &CardCatalog,
    rng: &mut R,
) {
    for name in room.seating() {
        top_up(room, &name, hand_size, catalog, rng);
    }
}

/// Appends every catalog prompt that isn't showing or already in the
/// pile, shuffled.
pub fn refill_prompts<R: Rng + ?Sized>(room: &mut Room, catalog: &CardCatalog, rng: &mut R) -> usize {
    let mut seen: HashSet<&str> = room
        .black_deck
        .iter()
        .map(|card| normalize(&card.text))
        .collect();
    if let Some(current) = &room.prompt_card {
        seen.insert(normalize(&current.text));
    }
    let mut fresh: Vec<PromptCard> = catalog
        .prompt_cards()
        .iter()
        .filter(|card| seen.insert(normalize(&card.text)))
        .cloned()
        .collect();
    fresh.shuffle(rng);
    let added = fresh.len();
    room.black_deck.extend(fresh);
    added
}

/// Pops the next prompt, refilling the prompt pile when it is empty.
pub fn draw_prompt<R: Rng + ?Sized>(
    room: &mut Room,
    catalog: &CardCatalog,
    rng: &mut R,
) -> Option<PromptCard> {
    if room.black_deck.is_empty() {
        refill_prompts(room, catalog, rng);
    }
    if room.black_deck.is_empty() {
        None
    } else {
        Some(room.black_deck.remove(0))
    }
}

/// Throws away every pile, hand and submission and deals from scratch:
/// shuffled full decks, `hand_size` cards per seat, one prompt.
pub fn deal_fresh<R: Rng + ?Sized>(
    room: &mut Room,
    hand_size: usize,
    catalog: &CardCatalog,
    rng: &mut R,
) {
    room.white_deck.clear();
    room.black_deck.clear();
    room.prompt_card = None;
    room.played_cards.clear();
    for player in room.players.values_mut() {
        player.hand.clear();
    }

    refill_answers(room, catalog, rng);
    refill_prompts(room, catalog, rng);
    top_up_all(room, hand_size, catalog, rng);
    room.prompt_card = draw_prompt(room, catalog, rng);
}
