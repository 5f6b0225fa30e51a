//! Synchronization: how every participant's view of a game converges.
//!
//! A consumer opens a [`GameFeed`]: one initial fetch of the session,
//! roster, and answers, then a merged subscription to the three per-game
//! change streams. Session notifications carry the full record and are
//! applied directly; roster and answer notifications trigger a re-query of
//! the ordered collection, since consumers want a fresh full view rather
//! than an incremental patch. Dropping the feed cancels the forwarder, so
//! stopping observation at any time is safe.

use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{AnswerRecord, PlayerRecord, SessionRecord},
        session_store::{Change, SessionStore},
    },
    error::ServiceError,
};

/// Buffered updates between the forwarder and a slow consumer.
const FEED_BUFFER: usize = 16;

/// A change to a consumer's view of one game.
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    /// The shared session record changed; apply it as delivered.
    Session(SessionRecord),
    /// The roster changed; carries the freshly re-queried ordered list.
    Players(Vec<PlayerRecord>),
    /// The answer set changed; carries the freshly re-queried list.
    Answers(Vec<AnswerRecord>),
}

/// One participant's local view of a game, fed by a [`GameFeed`].
#[derive(Debug, Clone)]
pub struct GameView {
    /// Last observed session record.
    pub session: SessionRecord,
    /// Roster ordered by score, then join time.
    pub players: Vec<PlayerRecord>,
    /// All answers of the game so far.
    pub answers: Vec<AnswerRecord>,
}

impl GameView {
    /// Fold one update into the view.
    pub fn apply(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Session(session) => self.session = session,
            ViewUpdate::Players(players) => self.players = players,
            ViewUpdate::Answers(answers) => self.answers = answers,
        }
    }

    /// Answers submitted for one question.
    pub fn answers_for(&self, question_index: usize) -> impl Iterator<Item = &AnswerRecord> {
        self.answers
            .iter()
            .filter(move |answer| answer.question_index == question_index)
    }

    /// How many answers one question has received.
    pub fn answered_count(&self, question_index: usize) -> usize {
        self.answers_for(question_index).count()
    }

    /// Look up a player by id.
    pub fn player(&self, player_id: Uuid) -> Option<&PlayerRecord> {
        self.players.iter().find(|player| player.id == player_id)
    }
}

/// Which table a merged notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Table {
    Session,
    Players,
    Answers,
}

/// Notification from any of the three subscribed tables.
enum RawChange {
    Session(Change<SessionRecord>),
    Player(Change<PlayerRecord>),
    Answer(Change<AnswerRecord>),
}

/// Live subscription to one game's changes.
///
/// Holds the forwarder task; dropping the feed aborts it and releases the
/// underlying store subscriptions.
#[derive(Debug)]
pub struct GameFeed {
    updates: mpsc::Receiver<ViewUpdate>,
    forwarder: JoinHandle<()>,
}

impl GameFeed {
    /// Wait for the next view update; `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ViewUpdate> {
        self.updates.recv().await
    }
}

impl Drop for GameFeed {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Fetch a game's current view and subscribe to its future changes.
///
/// Subscriptions are registered before the initial fetch, so a change
/// racing the fetch is delivered as a (harmlessly redundant) update rather
/// than lost. Fails with `NotFound` when the game has no session.
pub async fn open_feed(
    store: Arc<dyn SessionStore>,
    game_id: Uuid,
) -> Result<(GameView, GameFeed), ServiceError> {
    let mut tables: StreamMap<Table, BoxStream<'static, RawChange>> = StreamMap::new();
    tables.insert(
        Table::Session,
        store.subscribe_session(game_id).map(RawChange::Session).boxed(),
    );
    tables.insert(
        Table::Players,
        store.subscribe_players(game_id).map(RawChange::Player).boxed(),
    );
    tables.insert(
        Table::Answers,
        store.subscribe_answers(game_id).map(RawChange::Answer).boxed(),
    );

    let session = store.session(game_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("game `{game_id}` has no session"))
    })?;
    let players = store.list_players(game_id).await?;
    let answers = store.list_answers(game_id, None).await?;

    let (tx, updates) = mpsc::channel(FEED_BUFFER);
    let forwarder = tokio::spawn(forward_changes(store, game_id, tables, tx));

    Ok((
        GameView {
            session,
            players,
            answers,
        },
        GameFeed { updates, forwarder },
    ))
}

/// Pump merged table notifications into a consumer's update channel until
/// either side disconnects.
async fn forward_changes(
    store: Arc<dyn SessionStore>,
    game_id: Uuid,
    mut tables: StreamMap<Table, BoxStream<'static, RawChange>>,
    tx: mpsc::Sender<ViewUpdate>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            next = tables.next() => {
                let Some((_, raw)) = next else { break };
                let Some(update) = resolve_update(&store, game_id, raw).await else {
                    continue;
                };
                if tx.send(update).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!(%game_id, "game feed disconnected");
}

/// Turn a raw table notification into a view update, re-querying the
/// list-shaped tables.
async fn resolve_update(
    store: &Arc<dyn SessionStore>,
    game_id: Uuid,
    raw: RawChange,
) -> Option<ViewUpdate> {
    match raw {
        RawChange::Session(Change::Created(session) | Change::Updated(session)) => {
            Some(ViewUpdate::Session(session))
        }
        // The core never deletes sessions; tolerate it from the store.
        RawChange::Session(Change::Deleted(_)) => None,
        RawChange::Player(_) => match store.list_players(game_id).await {
            Ok(players) => Some(ViewUpdate::Players(players)),
            Err(err) => {
                warn!(%game_id, error = %err, "failed to re-query players after change");
                None
            }
        },
        RawChange::Answer(_) => match store.list_answers(game_id, None).await {
            Ok(answers) => Some(ViewUpdate::Answers(answers)),
            Err(err) => {
                warn!(%game_id, error = %err, "failed to re-query answers after change");
                None
            }
        },
    }
}
