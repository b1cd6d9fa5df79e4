//! Hydrate / dehydrate: the room document's card codec.
//!
//! Every place a card can appear (`promptCard`, `blackDeck`, `whiteDeck`,
//! each hand, each `playedCards` entry) is stored as a catalog index when
//! the local catalog knows the card, and as the full value otherwise.
//!
//! - [`hydrate`] resolves indices against the catalog. Rich values are
//!   canonicalized (trimmed, or replaced by the identical catalog entry) so
//!   that `hydrate(dehydrate(hydrate(x))) == hydrate(x)`. An index with no
//!   catalog entry is dropped, never a panic: catalogs change between
//!   client versions.
//! - [`dehydrate`] maps rich values back to indices by trimmed-text match.
//!   A value missing from the catalog stays rich, so the round trip is
//!   lossless.

use std::collections::BTreeMap;

use crate::card::normalize;
use crate::{CardCatalog, CardSlot, Player, PromptCard, RawPlayer, RawRoom, Room};

/// Decodes a wire room into rich form.
pub fn hydrate(raw: RawRoom, catalog: &CardCatalog) -> Room {
    let code = raw.code;

    let prompt_card = raw.prompt_card.and_then(|slot| {
        let card = hydrate_prompt(slot, catalog);
        if card.is_none() {
            tracing::warn!(%code, "prompt card not in catalog, dropping");
        }
        card
    });

    let black_deck = raw
        .black_deck
        .into_iter()
        .filter_map(|slot| hydrate_prompt(slot, catalog))
        .collect();
    let white_deck = hydrate_answers(raw.white_deck, catalog);

    let mut players = BTreeMap::new();
    for (name, raw_player) in raw.players {
        match hydrate_player(raw_player, catalog) {
            Some(player) => {
                players.insert(name, player);
            }
            None => tracing::debug!(%code, player = %name, "dropping ghost player entry"),
        }
    }

    let played_cards = raw
        .played_cards
        .into_iter()
        .map(|(name, cards)| (name, hydrate_answers(cards, catalog)))
        .collect();

    Room {
        code,
        creator: raw.creator,
        judge: raw.judge,
        judge_index: raw.judge_index,
        current_turn: raw.current_turn,
        prompt_card,
        black_deck,
        white_deck,
        players,
        played_cards,
        scores: raw.scores,
        room_phase: raw.room_phase,
        turn_phase: raw.turn_phase,
        points_to_win: raw.points_to_win,
        round_winner: raw.round_winner,
        game_winner: raw.game_winner,
        timestamp: raw.timestamp,
    }
}

/// Encodes a rich room into wire form.
pub fn dehydrate(room: &Room, catalog: &CardCatalog) -> RawRoom {
    RawRoom {
        code: room.code.clone(),
        creator: room.creator.clone(),
        judge: room.judge.clone(),
        judge_index: room.judge_index,
        current_turn: room.current_turn,
        prompt_card: room.prompt_card.as_ref().map(|c| dehydrate_prompt(c, catalog)),
        black_deck: room
            .black_deck
            .iter()
            .map(|c| dehydrate_prompt(c, catalog))
            .collect(),
        white_deck: dehydrate_answers(&room.white_deck, catalog),
        players: room
            .players
            .iter()
            .map(|(name, p)| (name.clone(), dehydrate_player(p, catalog)))
            .collect(),
        played_cards: room
            .played_cards
            .iter()
            .map(|(name, cards)| (name.clone(), dehydrate_answers(cards, catalog)))
            .collect(),
        scores: room.scores.clone(),
        room_phase: room.room_phase,
        turn_phase: room.turn_phase,
        points_to_win: room.points_to_win,
        round_winner: room.round_winner.clone(),
        game_winner: room.game_winner.clone(),
        timestamp: room.timestamp,
    }
}

fn hydrate_player(raw: RawPlayer, catalog: &CardCatalog) -> Option<Player> {
    let joined_at = raw.joined_at?;
    Some(Player {
        hand: hydrate_answers(raw.hand, catalog),
        joker_count: raw.joker_count,
        avatar: raw.avatar,
        color: raw.color,
        active_frame: raw.active_frame,
        rank: raw.rank,
        online: raw.online,
        last_seen: raw.last_seen,
        has_discarded: raw.has_discarded,
        joined_at,
        seat: raw.seat,
    })
}

fn dehydrate_player(player: &Player, catalog: &CardCatalog) -> RawPlayer {
    RawPlayer {
        hand: dehydrate_answers(&player.hand, catalog),
        joker_count: player.joker_count,
        avatar: player.avatar.clone(),
        color: player.color.clone(),
        active_frame: player.active_frame.clone(),
        rank: player.rank.clone(),
        online: player.online,
        last_seen: player.last_seen,
        has_discarded: player.has_discarded,
        joined_at: Some(player.joined_at),
        seat: player.seat,
    }
}

fn hydrate_prompt(slot: CardSlot<PromptCard>, catalog: &CardCatalog) -> Option<PromptCard> {
    match slot {
        CardSlot::Encoded(index) => catalog.prompt(index).cloned(),
        CardSlot::Decoded(card) => match catalog.prompt_index(&card.text) {
            Some(index) => catalog.prompt(index).cloned(),
            None => Some(PromptCard {
                text: normalize(&card.text).to_string(),
                ..card
            }),
        },
    }
}

fn dehydrate_prompt(card: &PromptCard, catalog: &CardCatalog) -> CardSlot<PromptCard> {
    match catalog.prompt_index(&card.text) {
        Some(index) => CardSlot::Encoded(index),
        None => CardSlot::Decoded(card.clone()),
    }
}

fn hydrate_answers(slots: Vec<CardSlot<String>>, catalog: &CardCatalog) -> Vec<String> {
    slots
        .into_iter()
        .filter_map(|slot| match slot {
            CardSlot::Encoded(index) => {
                let text = catalog.answer(index).map(str::to_string);
                if text.is_none() {
                    tracing::debug!(index, "answer card not in catalog, dropping");
                }
                text
            }
            CardSlot::Decoded(text) => Some(normalize(&text).to_string()),
        })
        .collect()
}

fn dehydrate_answers(cards: &[String], catalog: &CardCatalog) -> Vec<CardSlot<String>> {
    cards
        .iter()
        .map(|text| match catalog.answer_index(text) {
            Some(index) => CardSlot::Encoded(index),
            None => CardSlot::Decoded(text.clone()),
        })
        .collect()
}
