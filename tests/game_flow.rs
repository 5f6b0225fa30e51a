//! End-to-end flow of a full game against the in-memory store: hosting,
//! joining by code, answering under the clock, and walking every round to
//! the final scoreboard.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use uuid::Uuid;

use pixelquiz::{
    config::GameRules,
    dao::{
        models::{GameRecord, PlayerRecord, QuestionRecord, QuizRecord},
        session_store::{SessionPatch, SessionStore, memory::MemoryStore},
    },
    error::ServiceError,
    quiz::QuestionBank,
    services::{
        game_service::{self, HostController},
        player_service::{self, JoinRequest, SubmitAnswer},
        sync_service,
    },
    state::SessionPhase,
};

const CORRECT_CHOICE: usize = 1;

fn twelve_question_quiz() -> QuizRecord {
    QuizRecord {
        id: Uuid::new_v4(),
        name: "flow quiz".to_owned(),
        description: None,
        questions: (0..12)
            .map(|i| QuestionRecord {
                prompt: format!("question {i}"),
                options: [
                    "first".to_owned(),
                    "second".to_owned(),
                    "third".to_owned(),
                    "fourth".to_owned(),
                ],
                correct: CORRECT_CHOICE,
                image: None,
            })
            .collect(),
        created_at: SystemTime::now(),
        is_default: false,
    }
}

struct Table {
    store: Arc<dyn SessionStore>,
    rules: GameRules,
    bank: QuestionBank,
    game: GameRecord,
    ctrl: HostController,
}

async fn setup() -> Table {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let quiz = store.insert_quiz(twelve_question_quiz()).await.unwrap();
    let (game, _session) = game_service::create_game(&store, quiz.id).await.unwrap();
    let rules = GameRules::default();
    let bank = QuestionBank::new(quiz.questions, rules.round_size);
    let ctrl = HostController::new(store.clone(), bank.clone(), game.id);
    Table {
        store,
        rules,
        bank,
        game,
        ctrl,
    }
}

impl Table {
    async fn join(&self, name: &str) -> PlayerRecord {
        player_service::join_game(
            &self.store,
            JoinRequest {
                code: self.game.code.as_str().to_lowercase(),
                name: name.to_owned(),
                portrait: None,
            },
        )
        .await
        .unwrap()
    }

    /// Pin the question clock so speed scores are deterministic: a stamp in
    /// the future clamps elapsed time to zero (full bonus), one far in the
    /// past clamps remaining time to zero (base points only).
    async fn pin_clock(&self, future: bool) {
        let stamp = if future {
            SystemTime::now() + Duration::from_secs(60)
        } else {
            SystemTime::now() - Duration::from_secs(60)
        };
        self.store
            .update_session(
                self.game.id,
                SessionPatch {
                    question_started_at: Some(Some(stamp)),
                    ..SessionPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
    }

    async fn answer(&self, player: &PlayerRecord, question_index: usize, choice: usize) {
        player_service::submit_answer(
            &self.store,
            &self.rules,
            &self.bank,
            SubmitAnswer {
                game_id: self.game.id,
                player_id: player.id,
                question_index,
                choice,
            },
        )
        .await
        .unwrap()
        .unwrap();
    }

    async fn scores(&self) -> Vec<(String, u32)> {
        self.store
            .list_players(self.game.id)
            .await
            .unwrap()
            .into_iter()
            .map(|player| (player.name, player.score))
            .collect()
    }
}

#[tokio::test]
async fn three_players_answer_the_first_question() {
    let table = setup().await;
    let alice = table.join("Alice").await;
    let bob = table.join("Bob").await;
    let carol = table.join("Carol").await;

    table.ctrl.start().await.unwrap();
    table.pin_clock(true).await;

    table.answer(&alice, 0, CORRECT_CHOICE).await;
    table.answer(&bob, 0, 0).await;
    table.answer(&carol, 0, 3).await;

    let scores = table.scores().await;
    assert_eq!(scores[0], ("Alice".to_owned(), 1500));
    assert_eq!(scores[1].1, 0);
    assert_eq!(scores[2].1, 0);

    let answers = table.store.list_answers(table.game.id, Some(0)).await.unwrap();
    assert_eq!(answers.len(), 3);
    assert_eq!(answers.iter().filter(|a| a.is_correct).count(), 1);
}

#[tokio::test]
async fn a_correct_answer_after_time_ran_out_earns_the_base_points() {
    let table = setup().await;
    let dave = table.join("Dave").await;

    table.ctrl.start().await.unwrap();
    table.pin_clock(false).await;
    table.answer(&dave, 0, CORRECT_CHOICE).await;

    assert_eq!(table.scores().await, vec![("Dave".to_owned(), 1000)]);
}

#[tokio::test]
async fn answers_stop_counting_once_the_host_reveals() {
    let table = setup().await;
    let alice = table.join("Alice").await;
    let bob = table.join("Bob").await;

    table.ctrl.start().await.unwrap();
    table.pin_clock(true).await;
    table.answer(&alice, 0, CORRECT_CHOICE).await;

    // Timer expiry and a host force-reveal race; one write wins.
    let (first, second) = tokio::join!(table.ctrl.reveal(), table.ctrl.reveal());
    let effective = [first.unwrap(), second.unwrap()]
        .into_iter()
        .filter(Option::is_some)
        .count();
    assert_eq!(effective, 1);

    let err = player_service::submit_answer(
        &table.store,
        &table.rules,
        &table.bank,
        SubmitAnswer {
            game_id: table.game.id,
            player_id: bob.id,
            question_index: 0,
            choice: CORRECT_CHOICE,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    // Bob's late answer left no trace.
    let answers = table.store.list_answers(table.game.id, Some(0)).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(table.scores().await[1], ("Bob".to_owned(), 0));
}

#[tokio::test]
async fn the_session_walks_rounds_of_five_five_and_two() {
    let table = setup().await;
    table.ctrl.start().await.unwrap();

    let mut scoreboard_questions = Vec::new();
    loop {
        assert!(table.ctrl.reveal().await.unwrap().is_some());
        let session = table.ctrl.next().await.unwrap();
        if session.phase == SessionPhase::Scoreboard {
            scoreboard_questions.push(session.current_question);
            assert!(session.question_started_at.is_none());
            if table.bank.is_last_overall(session.current_question) {
                break;
            }
            let session = table.ctrl.continue_round().await.unwrap();
            assert_eq!(session.phase, SessionPhase::Question);
            assert!(session.question_started_at.is_some());
        }
    }

    // Rounds of 5, 5, and 2 end at these question indices.
    assert_eq!(scoreboard_questions, vec![4, 9, 11]);

    let err = table.ctrl.continue_round().await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    let session = table.store.session(table.game.id).await.unwrap().unwrap();
    assert_eq!(session.phase, SessionPhase::Scoreboard);
    assert_eq!(session.current_round, 3);
}

#[tokio::test]
async fn every_observer_converges_on_the_same_session() {
    let table = setup().await;
    let alice = table.join("Alice").await;

    let (mut host_view, mut host_feed) =
        sync_service::open_feed(table.store.clone(), table.game.id)
            .await
            .unwrap();
    let (mut player_view, mut player_feed) =
        sync_service::open_feed(table.store.clone(), table.game.id)
            .await
            .unwrap();

    table.ctrl.start().await.unwrap();
    table.pin_clock(true).await;
    table.answer(&alice, 0, CORRECT_CHOICE).await;
    assert!(table.ctrl.reveal().await.unwrap().is_some());

    // Drain both feeds until each has converged. Cross-table ordering is
    // not guaranteed, so wait for all three tables rather than stopping at
    // the phase change.
    for (view, feed) in [
        (&mut host_view, &mut host_feed),
        (&mut player_view, &mut player_feed),
    ] {
        while view.session.phase != SessionPhase::Reveal
            || view.answered_count(0) != 1
            || view.players.first().map(|p| p.score) != Some(1500)
        {
            let update = tokio::time::timeout(Duration::from_secs(1), feed.next())
                .await
                .expect("view did not converge in time")
                .expect("feed closed early");
            view.apply(update);
        }
    }

    assert_eq!(host_view.session, player_view.session);
    assert_eq!(host_view.session.current_question, 0);
    assert_eq!(host_view.answered_count(0), 1);
    assert_eq!(player_view.players[0].score, 1500);
}
