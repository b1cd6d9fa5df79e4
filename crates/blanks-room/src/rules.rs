//! The turn rules, as pure functions over a hydrated [`Room`].
//!
//! Every function here is a transaction body: it may run several times for
//! one intent when the store retries on conflict, so it touches nothing but
//! the room and its [`TxContext`]. Each returns [`Change::Applied`] when the
//! room should be written back, [`Change::Unchanged`] for a legal no-op,
//! or a [`RoomError`] for a rejected intent.

use blanks_protocol::{
    CardCatalog, Cosmetics, Player, PlayerName, Room, RoomCode, RoomPhase, TurnPhase, normalize,
    same_card,
};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::{RoomError, RoomRules, deck};

/// Everything a rule may use besides the room itself.
pub struct TxContext<'a> {
    /// Store time in milliseconds since the Unix epoch.
    pub now: u64,
    pub catalog: &'a CardCatalog,
    pub rules: &'a RoomRules,
    pub rng: StdRng,
}

/// What a rule did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    Unchanged,
}

// ---------------------------------------------------------------------------
// Seating
// ---------------------------------------------------------------------------

/// Picks a colour for a new player: their preference if nobody has it,
/// else a random unused palette colour, else any palette colour.
pub fn pick_color(room: &Room, preferred: Option<&str>, ctx: &mut TxContext<'_>) -> String {
    let taken = |color: &str| room.players.values().any(|p| p.color == color);

    if let Some(preferred) = preferred.filter(|c| !c.is_empty() && !taken(*c)) {
        return preferred.to_string();
    }
    let free: Vec<&String> = ctx
        .rules
        .palette
        .iter()
        .filter(|c| !taken(c.as_str()))
        .collect();
    if let Some(color) = free.choose(&mut ctx.rng) {
        return (*color).clone();
    }
    ctx.rules
        .palette
        .choose(&mut ctx.rng)
        .cloned()
        .or_else(|| preferred.map(str::to_string))
        .unwrap_or_default()
}

/// A new lobby with `creator` seated as judge.
pub fn create(
    code: RoomCode,
    creator: &PlayerName,
    cosmetics: &Cosmetics,
    ctx: &mut TxContext<'_>,
) -> Room {
    let seat = Player::new(cosmetics, String::new(), ctx.rules.starting_jokers, 0, ctx.now);
    let mut room = Room::new(
        code,
        creator.clone(),
        seat,
        ctx.rules.default_points_to_win,
        ctx.now,
    );
    let color = pick_color(&room, cosmetics.color.as_deref(), ctx);
    if let Some(player) = room.players.get_mut(creator) {
        player.color = color;
    }
    room
}

/// Seats a player, or refreshes an existing seat on reconnect.
///
/// A returning player keeps their hand, colour and score; only cosmetics
/// and the online flag change. A new player mid-game is dealt a full hand
/// in the same write, so they never sit with an empty hand.
pub fn join(
    room: &mut Room,
    ctx: &mut TxContext<'_>,
    name: &PlayerName,
    cosmetics: &Cosmetics,
) -> Result<Change, RoomError> {
    if let Some(player) = room.players.get_mut(name) {
        player.avatar = cosmetics.avatar.clone();
        player.active_frame = cosmetics.active_frame.clone();
        player.rank = cosmetics.rank.clone();
        player.online = true;
        player.last_seen = ctx.now;
        tracing::trace!(code = %room.code, player = %name, "seat refreshed");
        return Ok(Change::Applied);
    }

    if room.room_phase == RoomPhase::GameOver {
        return Err(RoomError::GameOver(room.code.clone()));
    }

    let color = pick_color(room, cosmetics.color.as_deref(), ctx);
    let player = Player::new(
        cosmetics,
        color,
        ctx.rules.starting_jokers,
        room.next_seat(),
        ctx.now,
    );
    room.players.insert(name.clone(), player);
    room.scores.entry(name.clone()).or_insert(0);

    if room.room_phase.is_active() {
        deck::top_up(room, name, ctx.rules.hand_size, ctx.catalog, &mut ctx.rng);
    }
    sync_judge_index(room);
    Ok(Change::Applied)
}

/// Removes a player on the creator's behalf.
///
/// A kicked judge hands the role to the next seat; if that player had
/// already submitted, their cards go back to their hand. While waiting for
/// submissions the quorum is re-checked, so a kicked straggler can't stall
/// the round.
pub fn kick(
    room: &mut Room,
    _ctx: &mut TxContext<'_>,
    requester: &PlayerName,
    target: &PlayerName,
) -> Result<Change, RoomError> {
    if *requester != room.creator {
        return Err(RoomError::NotCreator {
            code: room.code.clone(),
            player: requester.clone(),
        });
    }
    if requester == target {
        return Err(RoomError::CannotKickSelf(target.clone()));
    }
    if !room.has_player(target) {
        return Ok(Change::Unchanged);
    }

    let successor = (room.judge == *target).then(|| next_in_seating(room, target));

    room.players.remove(target);
    room.scores.remove(target);
    room.played_cards.remove(target);

    if let Some(Some(next_judge)) = successor {
        if let Some(cards) = room.played_cards.remove(&next_judge) {
            if let Some(player) = room.players.get_mut(&next_judge) {
                player.hand.extend(cards);
            }
        }
        room.judge = next_judge;
    }
    sync_judge_index(room);

    if room.room_phase.is_active() {
        advance_if_quorum(room);
    }
    Ok(Change::Applied)
}

// ---------------------------------------------------------------------------
// Game lifecycle
// ---------------------------------------------------------------------------

/// Moves a lobby into its first round and deals, in one write.
pub fn start(room: &mut Room, ctx: &mut TxContext<'_>, points_to_win: u32) -> Result<Change, RoomError> {
    match room.room_phase {
        RoomPhase::GameOver => return Err(RoomError::GameOver(room.code.clone())),
        RoomPhase::InProgress => return Ok(Change::Unchanged),
        RoomPhase::Lobby => {}
    }

    room.room_phase = RoomPhase::InProgress;
    room.turn_phase = TurnPhase::WaitingForSubmissions;
    room.points_to_win = points_to_win;
    room.round_winner = None;
    room.game_winner = None;
    room.current_turn = 1;
    room.scores = room.players.keys().map(|name| (name.clone(), 0)).collect();

    deal_all(room, ctx);
    Ok(Change::Applied)
}

/// Re-deals the running game from scratch: fresh decks, full hands,
/// jokers reset, a new prompt. Scores and the judge are kept.
pub fn deal(room: &mut Room, ctx: &mut TxContext<'_>) -> Result<Change, RoomError> {
    if !room.room_phase.is_active() {
        return Ok(Change::Unchanged);
    }
    deal_all(room, ctx);
    Ok(Change::Applied)
}

fn deal_all(room: &mut Room, ctx: &mut TxContext<'_>) {
    deck::deal_fresh(room, ctx.rules.hand_size, ctx.catalog, &mut ctx.rng);
    for player in room.players.values_mut() {
        player.joker_count = ctx.rules.starting_jokers;
        player.has_discarded = false;
    }
    room.turn_phase = TurnPhase::WaitingForSubmissions;
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

/// Records a player's submission.
///
/// Submitting again replaces the previous submission, whose cards go back
/// to the hand first. Every selected card must be in that combined hand,
/// matched by trimmed text.
pub fn play(
    room: &mut Room,
    _ctx: &mut TxContext<'_>,
    name: &PlayerName,
    cards: &[String],
) -> Result<Change, RoomError> {
    if cards.is_empty()
        || *name == room.judge
        || !accepting_submissions(room)
    {
        return Ok(Change::Unchanged);
    }
    let Some(player) = room.players.get(name) else {
        return Ok(Change::Unchanged);
    };

    let mut hand = player.hand.clone();
    if let Some(previous) = room.played_cards.get(name) {
        hand.extend(previous.iter().cloned());
    }

    let mut submitted = Vec::with_capacity(cards.len());
    for card in cards {
        let Some(pos) = hand.iter().position(|held| same_card(held, card)) else {
            tracing::trace!(code = %room.code, player = %name, %card, "submitted card not in hand");
            return Ok(Change::Unchanged);
        };
        submitted.push(hand.remove(pos));
    }

    if let Some(player) = room.players.get_mut(name) {
        player.hand = hand;
    }
    room.played_cards.insert(name.clone(), submitted);
    advance_if_quorum(room);
    Ok(Change::Applied)
}

/// Awards the round to `winner` and shows the result. Reaching
/// `pointsToWin` ends the game.
pub fn confirm_winner(
    room: &mut Room,
    _ctx: &mut TxContext<'_>,
    winner: &PlayerName,
) -> Result<Change, RoomError> {
    if !room.room_phase.is_active()
        || room.turn_phase != TurnPhase::JudgeChoosing
        || !room.has_player(winner)
    {
        return Ok(Change::Unchanged);
    }

    let score = room.scores.entry(winner.clone()).or_insert(0);
    *score += 1;
    let reached = *score >= room.points_to_win;

    room.round_winner = Some(winner.clone());
    if reached {
        room.room_phase = RoomPhase::GameOver;
        room.game_winner = Some(winner.clone());
    }
    room.turn_phase = TurnPhase::ShowingWinner;
    Ok(Change::Applied)
}

/// Starts the next round: the judge passes to the next seat, hands are
/// topped up, a new prompt is drawn.
pub fn next_round(room: &mut Room, ctx: &mut TxContext<'_>) -> Result<Change, RoomError> {
    if !room.room_phase.is_active() || room.turn_phase != TurnPhase::ShowingWinner {
        return Ok(Change::Unchanged);
    }

    room.played_cards.clear();
    if let Some(next_judge) = next_in_seating(room, &room.judge.clone()) {
        room.judge = next_judge;
    }
    sync_judge_index(room);

    deck::top_up_all(room, ctx.rules.hand_size, ctx.catalog, &mut ctx.rng);
    for player in room.players.values_mut() {
        player.has_discarded = false;
    }

    let previous = room.prompt_card.clone();
    room.prompt_card = deck::draw_prompt(room, ctx.catalog, &mut ctx.rng).or(previous);
    room.round_winner = None;
    room.turn_phase = TurnPhase::WaitingForSubmissions;
    room.current_turn += 1;
    Ok(Change::Applied)
}

/// Swaps one card for a fresh one, once per round.
pub fn discard(
    room: &mut Room,
    ctx: &mut TxContext<'_>,
    name: &PlayerName,
    card: &str,
) -> Result<Change, RoomError> {
    if !room.room_phase.is_active() {
        return Ok(Change::Unchanged);
    }
    let Some(player) = room.players.get_mut(name) else {
        return Ok(Change::Unchanged);
    };
    if player.has_discarded {
        return Ok(Change::Unchanged);
    }
    let Some(pos) = player.hand.iter().position(|held| same_card(held, card)) else {
        return Ok(Change::Unchanged);
    };

    player.hand.remove(pos);
    player.has_discarded = true;
    deck::top_up(room, name, ctx.rules.hand_size, ctx.catalog, &mut ctx.rng);
    Ok(Change::Applied)
}

/// Spends a joker: the first card in hand is traded for a strong answer.
///
/// Replacement order: a best answer for the current prompt that nobody
/// holds, then the top of the pile, then any catalog card nobody holds.
/// The traded card is never its own replacement. Without a replacement
/// nothing changes and the joker is kept.
pub fn use_joker(room: &mut Room, ctx: &mut TxContext<'_>, name: &PlayerName) -> Result<Change, RoomError> {
    if !room.room_phase.is_active() {
        return Ok(Change::Unchanged);
    }
    let Some(player) = room.players.get(name) else {
        return Ok(Change::Unchanged);
    };
    if player.joker_count == 0 || player.hand.is_empty() {
        return Ok(Change::Unchanged);
    }

    let Some(replacement) = joker_replacement(room, ctx) else {
        tracing::trace!(code = %room.code, player = %name, "no joker replacement available");
        return Ok(Change::Unchanged);
    };

    if let Some(player) = room.players.get_mut(name) {
        player.hand.push(replacement);
        player.joker_count -= 1;
    }
    // The traded card stays held through the top-up so a refill can't deal it back.
    deck::top_up(room, name, ctx.rules.hand_size + 1, ctx.catalog, &mut ctx.rng);
    if let Some(player) = room.players.get_mut(name) {
        player.hand.remove(0);
    }
    Ok(Change::Applied)
}

/// Finds and takes a joker replacement. A card taken from the pile is
/// removed from it.
fn joker_replacement(room: &mut Room, ctx: &mut TxContext<'_>) -> Option<String> {
    // Cards in hands or submissions, the traded card included.
    let in_play: std::collections::HashSet<String> = room
        .players
        .values()
        .flat_map(|p| p.hand.iter())
        .chain(room.played_cards.values().flatten())
        .map(|card| normalize(card).to_string())
        .collect();

    if let Some(prompt) = &room.prompt_card {
        let hints: Vec<&String> = prompt
            .best_answers
            .iter()
            .filter(|hint| !in_play.contains(normalize(hint)))
            .collect();
        if let Some(hint) = hints.choose(&mut ctx.rng) {
            let hint = normalize(hint).to_string();
            room.white_deck.retain(|card| !same_card(card, &hint));
            return Some(hint);
        }
    }

    if !room.white_deck.is_empty() {
        return Some(room.white_deck.remove(0));
    }

    let spare: Vec<&String> = ctx
        .catalog
        .answer_cards()
        .iter()
        .filter(|card| !in_play.contains(normalize(card)))
        .collect();
    spare.choose(&mut ctx.rng).map(|card| (*card).clone())
}

/// Lets the judge or the creator stop waiting for stragglers.
pub fn force_reveal(
    room: &mut Room,
    _ctx: &mut TxContext<'_>,
    requester: &PlayerName,
) -> Result<Change, RoomError> {
    if *requester != room.judge && *requester != room.creator {
        return Err(RoomError::NotAuthorized {
            code: room.code.clone(),
            player: requester.clone(),
        });
    }
    if !accepting_submissions(room) {
        return Ok(Change::Unchanged);
    }
    room.turn_phase = TurnPhase::JudgeChoosing;
    Ok(Change::Applied)
}

/// Full mulligan: the hand goes back into the pile, the pile is shuffled,
/// and a fresh hand is drawn.
pub fn bribe(room: &mut Room, ctx: &mut TxContext<'_>, name: &PlayerName) -> Result<Change, RoomError> {
    if !room.room_phase.is_active() {
        return Ok(Change::Unchanged);
    }
    let Some(player) = room.players.get_mut(name) else {
        return Ok(Change::Unchanged);
    };

    let returned = std::mem::take(&mut player.hand);
    room.white_deck.extend(returned);
    room.white_deck.shuffle(&mut ctx.rng);
    deck::top_up(room, name, ctx.rules.hand_size, ctx.catalog, &mut ctx.rng);
    Ok(Change::Applied)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn accepting_submissions(room: &Room) -> bool {
    room.room_phase.is_active() && room.turn_phase == TurnPhase::WaitingForSubmissions
}

/// `true` once every non-judge player has a submission on the table.
pub fn quorum_reached(room: &Room) -> bool {
    let active = room.active_player_count();
    let submitted = room
        .played_cards
        .keys()
        .filter(|name| **name != room.judge && room.has_player(name))
        .count();
    active > 0 && submitted >= active
}

/// Moves to `JUDGE_CHOOSING` if the round is waiting and quorum is met.
fn advance_if_quorum(room: &mut Room) {
    if accepting_submissions(room) && quorum_reached(room) {
        room.turn_phase = TurnPhase::JudgeChoosing;
        tracing::trace!(code = %room.code, "quorum reached");
    }
}

/// The player seated after `name`, wrapping around. `None` if `name` is
/// the only player or isn't seated.
fn next_in_seating(room: &Room, name: &PlayerName) -> Option<PlayerName> {
    let seating = room.seating();
    let pos = seating.iter().position(|n| n == name)?;
    let next = &seating[(pos + 1) % seating.len()];
    (next != name).then(|| next.clone())
}

fn sync_judge_index(room: &mut Room) {
    if let Some(pos) = room.seating().iter().position(|n| *n == room.judge) {
        room.judge_index = pos;
    }
}
