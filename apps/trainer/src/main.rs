use std::{
    io::{self, Write},
    sync::Arc,
    time::Instant,
};

use anyhow::{anyhow, Result};
use tracing::warn;
use clap::{Parser, Subcommand};
use client_core::{
    practice::{
        FlipOutcome, GameOutcome, PracticeGame, PracticeRound, SelectResult, SequencePhase,
    },
    progress::Phase,
    AccountGateway, ChallengeGateway, HttpApi, LessonCatalog, LessonSession,
    MissingProgressStore, PracticeGateway, ProgressStore, SessionEvent, SessionMode,
    SessionOutcome, CORRECT_ADVANCE_DELAY, INCORRECT_RETRY_DELAY,
};
use shared::domain::{GameKind, LessonId, LevelId, UserId};

mod config;

#[derive(Parser, Debug)]
#[command(name = "trainer", about = "Headless driver for the Senya learning backend")]
struct Cli {
    /// Backend base URL; overrides trainer.toml and SENYA_API_URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the bearer token for later invocations.
    Login { email: String },
    /// Current hearts, rubies and streak.
    Status,
    /// List units with their lessons and progress.
    Units,
    /// Play a lesson interactively on stdin.
    Play { lesson_id: i64 },
    /// Fetch and play today's challenge (no progress is saved).
    Challenge,
    /// Run one practice game, e.g. `practice 3 speed`.
    Practice { level_id: i64, game: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.clone())
        .init();

    let api_url = cli.api_url.as_deref().unwrap_or(&settings.api_url);
    let api = Arc::new(match (&settings.access_token, settings.user_id) {
        (Some(token), Some(user_id)) => {
            HttpApi::with_credentials(api_url, token, UserId(user_id))?
        }
        _ => HttpApi::new(api_url)?,
    });

    match cli.command {
        Command::Login { email } => {
            let password = prompt("password: ");
            let session = api.login(&email, password.trim()).await?;
            println!("logged in as user {}", session.user.id.0);
            println!("export SENYA_TOKEN={}", session.access_token);
            println!("export SENYA_USER_ID={}", session.user.id.0);
        }
        Command::Status => {
            let status = api.fetch_status().await?;
            println!(
                "hearts: {}  rubies: {}  streak: {} day(s)",
                status.hearts, status.rubies, status.streak
            );
        }
        Command::Units => {
            for unit in api.list_units().await? {
                let unlocked = match api.unit_status(unit.unit_id).await {
                    Ok(status) => status.unlocked,
                    Err(error) => {
                        warn!(unit_id = unit.unit_id.0, %error, "unit status fetch failed");
                        false
                    }
                };
                let marker = if unlocked { " " } else { "🔒" };
                println!("{marker} unit {}: {}", unit.unit_id.0, unit.title);
                for lesson in &unit.lessons {
                    println!(
                        "    lesson {}: {} (+{} rubies)",
                        lesson.lesson_id.0, lesson.title, lesson.rubies_reward
                    );
                }
            }
        }
        Command::Play { lesson_id } => {
            let outcome = play_session(
                Arc::clone(&api) as Arc<dyn LessonCatalog>,
                Arc::clone(&api) as Arc<dyn ProgressStore>,
                Arc::clone(&api) as Arc<dyn AccountGateway>,
                LessonId(lesson_id),
                SessionMode::Lesson,
            )
            .await?;
            if let SessionOutcome::Completed {
                rubies_earned,
                streak,
            } = outcome
            {
                println!("🎉 lesson complete: +{rubies_earned} rubies, {streak}-day streak");
            }
        }
        Command::Challenge => {
            let challenge = api.daily_challenge().await?;
            println!(
                "today's challenge: {}",
                challenge.title.as_deref().unwrap_or("(untitled)")
            );
            let outcome = play_session(
                Arc::clone(&api) as Arc<dyn LessonCatalog>,
                Arc::new(MissingProgressStore),
                Arc::clone(&api) as Arc<dyn AccountGateway>,
                LessonId(challenge.challenge_id.0),
                SessionMode::DailyChallenge,
            )
            .await?;
            if matches!(outcome, SessionOutcome::Completed { .. }) {
                let completion = api.complete_daily_challenge().await?;
                println!(
                    "🎉 challenge complete: +{} rubies, {}-day streak",
                    completion.rubies_earned, completion.streak
                );
            }
        }
        Command::Practice { level_id, game } => {
            let kind = parse_game_kind(&game)?;
            let levels = api.practice_levels().await?;
            let level = levels
                .levels
                .into_iter()
                .find(|level| level.level_id == LevelId(level_id))
                .ok_or_else(|| anyhow!("no practice level {level_id}"))?;
            let mut round =
                PracticeRound::begin(Arc::clone(&api) as Arc<dyn PracticeGateway>, &level, kind)
                    .await?;
            println!(
                "{} on '{}', high score {}",
                kind.identifier(),
                level.name,
                round.high_score()
            );
            let outcome = drive_game(round.game_mut());
            match outcome {
                GameOutcome::Success { score } => println!("finished with {score} points"),
                GameOutcome::Failure { hearts_lost } => {
                    println!("time's up, lost {hearts_lost} heart(s)")
                }
            }
            let receipt = round.finish(outcome).await?;
            if let Some(rubies) = receipt.rubies_earned {
                println!("+{rubies} rubies");
            }
            if let Some(high_score) = receipt.game_high_score {
                println!("high score is now {high_score}");
            }
        }
    }

    Ok(())
}

fn prompt(message: &str) -> String {
    print!("{message}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
    line.trim().to_string()
}

/// Drive one lesson session over stdin. Enter advances clips and
/// reveals, `1`/`2` answers the quiz, `q` asks to leave.
async fn play_session(
    catalog: Arc<dyn LessonCatalog>,
    progress_store: Arc<dyn ProgressStore>,
    account: Arc<dyn AccountGateway>,
    lesson_id: LessonId,
    mode: SessionMode,
) -> Result<SessionOutcome> {
    let session = LessonSession::open(catalog, progress_store, account, lesson_id, mode).await?;
    println!(
        "{} ({} signs)",
        session.lesson().title,
        session.lesson().signs.len()
    );

    let mut events = session.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::HeartLost { remaining } => {
                    println!("💔 wrong answer, {remaining} heart(s) left");
                }
                SessionEvent::HeartsDepleted => println!("no hearts left!"),
                SessionEvent::HeartsRestored { hearts } => {
                    println!("❤️ hearts restored: {hearts}");
                }
                _ => {}
            }
        }
    });

    loop {
        let snapshot = session.snapshot().await;

        if snapshot.blocked {
            match prompt("out of hearts: [r]efresh or [q]uit? ").as_str() {
                "r" => {
                    if session.refresh_hearts().await? == 0 {
                        println!("still empty; hearts refill over time or in the shop");
                    }
                    continue;
                }
                _ => {
                    session.request_exit().await?;
                    return Ok(session.confirm_exit().await?);
                }
            }
        }

        match snapshot.phase {
            Phase::Video => {
                println!(
                    "sign {}/{}: watch {}",
                    snapshot.sign_index + 1,
                    snapshot.sign_count,
                    snapshot.video_url.as_deref().unwrap_or("(no clip)")
                );
                if confirm_or_exit(&session, "press Enter when the clip ends").await? {
                    return Ok(session.confirm_exit().await?);
                }
                session.video_ended().await?;
            }
            Phase::Reveal => {
                println!("this sign means “{}”", snapshot.sign_label);
                if confirm_or_exit(&session, "press Enter to continue").await? {
                    return Ok(session.confirm_exit().await?);
                }
                session.continue_from_reveal().await?;
            }
            Phase::Quiz => {
                let options = snapshot
                    .quiz_options
                    .ok_or_else(|| anyhow!("quiz phase without options"))?;
                println!("what sign is this?  [1] {}  [2] {}", options[0], options[1]);
                let input = prompt("> ");
                if input == "q" {
                    session.request_exit().await?;
                    if prompt("save and quit? [y/N] ") == "y" {
                        return Ok(session.confirm_exit().await?);
                    }
                    session.cancel_exit().await;
                    continue;
                }
                let index = match input.as_str() {
                    "1" => 0,
                    "2" => 1,
                    _ => {
                        println!("answer with 1 or 2");
                        continue;
                    }
                };
                let verdict = session.select_option(index).await?;
                if verdict.correct {
                    println!("✅ correct!");
                    tokio::time::sleep(CORRECT_ADVANCE_DELAY).await;
                } else {
                    tokio::time::sleep(INCORRECT_RETRY_DELAY).await;
                }
                if let Some(outcome) = session.advance_after_feedback().await? {
                    return Ok(outcome);
                }
            }
        }
    }
}

/// Returns true when the user asked to leave and confirmed.
async fn confirm_or_exit(session: &Arc<LessonSession>, message: &str) -> Result<bool> {
    if prompt(&format!("{message} (q to quit): ")) == "q" {
        session.request_exit().await?;
        if prompt("save and quit? [y/N] ") == "y" {
            return Ok(true);
        }
        session.cancel_exit().await;
    }
    Ok(false)
}

fn parse_game_kind(raw: &str) -> Result<GameKind> {
    let all = [
        GameKind::Matching,
        GameKind::Identification,
        GameKind::Speed,
        GameKind::Sequence,
        GameKind::AdvancedMatching,
        GameKind::SentenceBuilding,
    ];
    all.into_iter()
        .find(|kind| kind.identifier() == raw)
        .ok_or_else(|| {
            anyhow!(
                "unknown game '{raw}'; one of: {}",
                all.map(|kind| kind.identifier()).join(", ")
            )
        })
}

/// Count down for the wall-clock seconds spent waiting on input.
fn catch_up_ticks(game: &mut PracticeGame, waited_since: Instant) -> Option<GameOutcome> {
    for _ in 0..waited_since.elapsed().as_secs() {
        if let Some(outcome) = game.tick() {
            return Some(outcome);
        }
    }
    game.outcome()
}

fn drive_game(game: &mut PracticeGame) -> GameOutcome {
    loop {
        if let Some(outcome) = game.outcome() {
            return outcome;
        }
        println!("⏱ {}s left, {} points", game.time_left(), game.score());
        let waited = Instant::now();
        match game {
            PracticeGame::Matching(inner) => {
                for (i, card) in inner.cards().iter().enumerate() {
                    if inner.is_matched(i) {
                        println!("  [{i:2}] {}", card.content);
                    } else {
                        println!("  [{i:2}] ■");
                    }
                }
                let input = prompt("flip which card? ");
                if let Ok(index) = input.parse::<usize>() {
                    match inner.flip(index) {
                        Some(FlipOutcome::FaceUp) => {
                            println!("showing: {}", inner.cards()[index].content)
                        }
                        Some(FlipOutcome::Matched) => println!("✅ a pair!"),
                        Some(FlipOutcome::Mismatched) => {
                            println!("❌ not a pair: {}", inner.cards()[index].content);
                            inner.resolve_mismatch();
                        }
                        None => println!("that card can't be flipped"),
                    }
                }
            }
            PracticeGame::Identification(inner) => {
                if let Some(sign) = inner.current_sign() {
                    println!("which sign is {} ?", sign.video_url);
                    for (i, option) in inner.options().iter().enumerate() {
                        println!("  [{i}] {option}");
                    }
                    let input = prompt("> ");
                    if let Ok(index) = input.parse::<usize>() {
                        match inner.answer(index) {
                            Some(true) => println!("✅ correct"),
                            Some(false) => println!("❌ wrong, -5s"),
                            None => {}
                        }
                    }
                }
            }
            PracticeGame::Speed(inner) => {
                if let Some(sign) = inner.current_sign() {
                    let (round, total) = inner.round();
                    println!("round {round}/{total}: {}", sign.video_url);
                    for (i, option) in inner.options().iter().enumerate() {
                        println!("  [{i}] {option}");
                    }
                    let asked = Instant::now();
                    let input = prompt("> ");
                    if let Ok(index) = input.parse::<usize>() {
                        match inner.answer(index, asked.elapsed()) {
                            Some(true) => println!("✅ correct"),
                            Some(false) => println!("❌ wrong, -3s"),
                            None => {}
                        }
                    }
                }
            }
            PracticeGame::Sequence(inner) => match inner.phase() {
                SequencePhase::Showing => {
                    if let Some(sign) = inner.showing() {
                        println!("watch: {} ({})", sign.text, sign.video_url);
                    }
                    prompt("Enter for the next sign... ");
                    inner.advance_demo();
                }
                SequencePhase::Input => {
                    for (i, sign) in inner.pool().iter().enumerate() {
                        println!("  [{i}] {}", sign.text);
                    }
                    let input = prompt("repeat the sequence (numbers, space-separated): ");
                    for token in input.split_whitespace() {
                        let Ok(index) = token.parse::<usize>() else {
                            continue;
                        };
                        let Some(sign_id) = inner.pool().get(index).map(|sign| sign.sign_id)
                        else {
                            continue;
                        };
                        if let SelectResult::Judged(correct) = inner.select(sign_id) {
                            if correct {
                                println!("✅ right order!");
                            } else {
                                println!("❌ wrong, -5s, watch it again");
                            }
                        }
                    }
                }
            },
            PracticeGame::AdvancedMatching(inner) => {
                for (i, phrase) in inner.phrases().iter().enumerate() {
                    let marker = if inner.is_matched(i) { "✅" } else { "  " };
                    println!("{marker}[{i}] {}", phrase.text);
                }
                let input = prompt("phrase number: ");
                let Ok(phrase_index) = input.parse::<usize>() else {
                    continue;
                };
                inner.select_phrase(phrase_index);
                for (i, sign) in inner.pool().iter().enumerate() {
                    println!("  [{i}] {}", sign.text);
                }
                let picks = prompt("signs (numbers, space-separated): ");
                for token in picks.split_whitespace() {
                    if let Ok(index) = token.parse::<usize>() {
                        if let Some(sign_id) = inner.pool().get(index).map(|sign| sign.sign_id) {
                            inner.toggle_sign(sign_id);
                        }
                    }
                }
                match inner.check_match() {
                    Some(true) => println!("✅ matched!"),
                    Some(false) => println!("❌ wrong, -5s"),
                    None => println!("pick exactly as many signs as the phrase needs"),
                }
            }
            PracticeGame::SentenceBuilding(inner) => {
                if let Some(sentence) = inner.current_sentence() {
                    let (current, total) = inner.progress();
                    println!("sentence {current}/{total}: “{}”", sentence.text);
                }
                for (i, sign) in inner.pool().iter().enumerate() {
                    println!("  [{i}] {}", sign.text);
                }
                let picks = prompt("signs (numbers, space-separated): ");
                for token in picks.split_whitespace() {
                    if let Ok(index) = token.parse::<usize>() {
                        if let Some(sign_id) = inner.pool().get(index).map(|sign| sign.sign_id) {
                            inner.toggle_sign(sign_id);
                        }
                    }
                }
                match inner.check_sentence() {
                    Some(true) => println!("✅ correct!"),
                    Some(false) => println!("❌ not quite, try again"),
                    None => {}
                }
            }
        }
        if let Some(outcome) = catch_up_ticks(game, waited) {
            return outcome;
        }
    }
}
