//! Demo binary: plays a scripted quiz night end-to-end against the
//! in-memory store, with bot players racing a real host loop.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use anyhow::Context;
use rand::Rng;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use pixelquiz::{
    config::GameRules,
    dao::{
        models::{PlayerRecord, QuestionRecord, QuizRecord},
        session_store::{SessionStore, memory::MemoryStore},
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let rules = GameRules::load();
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());

    let quiz = store
        .insert_quiz(demo_quiz())
        .await
        .context("seeding the demo quiz")?;
    let (game, _session) = game_service::create_game(&store, quiz.id)
        .await
        .context("creating the game")?;
    info!(code = %game.code, "lobby open; bots are joining");

    let mut bots = Vec::new();
    for name in ["Nova", "Pixel", "Vector"] {
        let player = player_service::join_game(
            &store,
            JoinRequest {
                code: game.code.as_str().to_owned(),
                name: name.to_owned(),
                portrait: None,
            },
        )
        .await
        .context("joining a bot")?;
        bots.push(tokio::spawn(run_bot(
            store.clone(),
            rules.clone(),
            quiz.clone(),
            player,
        )));
    }

    let bank = QuestionBank::new(quiz.questions.clone(), rules.round_size);
    let ctrl = HostController::new(store.clone(), bank, game.id);
    run_host(&store, &rules, &ctrl).await?;

    for bot in bots {
        let _ = bot.await;
    }

    for (rank, player) in store.list_players(game.id).await?.iter().enumerate() {
        info!(rank = rank + 1, name = %player.name, score = player.score, "final standing");
    }

    Ok(())
}

/// Drive the session from the first question to the final scoreboard.
async fn run_host(
    store: &Arc<dyn SessionStore>,
    rules: &GameRules,
    ctrl: &HostController,
) -> anyhow::Result<()> {
    let (mut view, mut feed) = sync_service::open_feed(store.clone(), ctrl.game_id()).await?;
    ctrl.start().await?;

    loop {
        game_service::run_question_phase(ctrl, rules, &mut view, &mut feed).await?;

        // Leave the answer on screen for a moment.
        tokio::time::sleep(Duration::from_secs(2)).await;

        let session = ctrl.next().await?;
        if session.phase == SessionPhase::Scoreboard {
            let standings = store.list_players(ctrl.game_id()).await?;
            let leader = standings
                .first()
                .map(|player| player.name.clone())
                .unwrap_or_default();
            info!(round = session.current_round, %leader, "scoreboard");

            if ctrl.bank().is_last_overall(session.current_question) {
                info!("final scoreboard reached");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
            ctrl.continue_round().await?;
        }
    }
}

/// A bot player: watches the game feed and answers each question once,
/// after a human-ish delay, with a random choice.
async fn run_bot(
    store: Arc<dyn SessionStore>,
    rules: GameRules,
    quiz: QuizRecord,
    player: PlayerRecord,
) {
    let bank = QuestionBank::new(quiz.questions, rules.round_size);
    let Ok((mut view, mut feed)) = sync_service::open_feed(store.clone(), player.game_id).await
    else {
        warn!(name = %player.name, "bot could not open its feed");
        return;
    };

    let mut answered: Option<usize> = None;
    loop {
        if view.session.phase == SessionPhase::Question
            && answered != Some(view.session.current_question)
        {
            let question_index = view.session.current_question;
            answered = Some(question_index);

            let (delay_ms, choice) = {
                let mut rng = rand::rng();
                (rng.random_range(400u64..2500), rng.random_range(0usize..4))
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            let submit = SubmitAnswer {
                game_id: player.game_id,
                player_id: player.id,
                question_index,
                choice,
            };
            match player_service::submit_answer(&store, &rules, &bank, submit).await {
                Ok(Some(answer)) if answer.is_correct => {
                    info!(name = %player.name, points = answer.points_earned, "answered correctly");
                }
                Ok(_) => {}
                Err(ServiceError::InvalidState(_)) => {
                    debug!(name = %player.name, question_index, "answered too late");
                }
                Err(err) => {
                    warn!(name = %player.name, error = %err, "submit failed");
                }
            }
        }

        if view.session.phase == SessionPhase::Scoreboard
            && bank.is_last_overall(view.session.current_question)
        {
            debug!(name = %player.name, "game over; bot leaving");
            return;
        }

        let Some(update) = feed.next().await else {
            return;
        };
        view.apply(update);
    }
}

/// A small built-in quiz so the demo runs without any seed data.
fn demo_quiz() -> QuizRecord {
    let question = |prompt: &str, options: [&str; 4], correct: usize| QuestionRecord {
        prompt: prompt.to_owned(),
        options: options.map(str::to_owned),
        correct,
        image: None,
    };

    QuizRecord {
        id: Uuid::new_v4(),
        name: "Arcade warm-up".to_owned(),
        description: Some("Eight quick questions to try the machine".to_owned()),
        questions: vec![
            question(
                "Which planet has the shortest day?",
                ["Mercury", "Jupiter", "Mars", "Venus"],
                1,
            ),
            question(
                "What does the C in CPU stand for?",
                ["Core", "Computer", "Central", "Control"],
                2,
            ),
            question(
                "Which of these animals can sleep standing up?",
                ["Horse", "Dog", "Penguin", "Octopus"],
                0,
            ),
            question(
                "How many keys does a standard piano have?",
                ["66", "76", "88", "96"],
                2,
            ),
            question(
                "Which ocean is the deepest?",
                ["Atlantic", "Indian", "Arctic", "Pacific"],
                3,
            ),
            question(
                "What year did the first arcade game Pong come out?",
                ["1968", "1972", "1978", "1983"],
                1,
            ),
            question(
                "Which metal is liquid at room temperature?",
                ["Gallium", "Sodium", "Mercury", "Tin"],
                2,
            ),
            question(
                "How many sides does a snowflake usually have?",
                ["Four", "Five", "Six", "Eight"],
                2,
            ),
        ],
        created_at: SystemTime::now(),
        is_default: true,
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
