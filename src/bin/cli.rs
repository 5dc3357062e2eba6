// Ticks CLI
// Drives a running ticks server as a tutor or learner and validates it end to end

use clap::{Parser, Subcommand};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use ticks_server::client::{ClientSession, PingSchedule, LEARNER_PING_INTERVAL, TUTOR_PING_INTERVAL};
use ticks_server::presence::{
    status_counts, ClientEvent, ClientId, LearnerView, RoomCode, RoomSummary, ServerEvent, TutorView,
    HAND_UP,
};

#[derive(Parser)]
#[command(name = "ticks-cli")]
#[command(about = "Ticks classroom presence CLI", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// List every known room
    Rooms,

    /// Show one room
    Room {
        /// Room code (case-insensitive)
        code: String,
    },

    /// Create a room with a generated code
    NewRoom {
        /// Room description (defaults to the code)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Watch a room as tutor (stdin: clear, kick <client>, kick-all)
    Tutor {
        /// Room code
        room: String,

        /// Show a tally of learner statuses
        #[arg(short, long)]
        poll: bool,
    },

    /// Join a room as learner (stdin: up, ok, down, status <t>, answer <text>, name <n>)
    Learner {
        /// Room code
        room: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Stable client id (generated when omitted)
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Run scripted scenarios against a running server
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => check_health(&cli.server).await,
        Commands::Rooms => list_rooms(&cli.server).await,
        Commands::Room { code } => show_room(&cli.server, code).await,
        Commands::NewRoom { description } => new_room(&cli.server, description.clone()).await,
        Commands::Tutor { room, poll } => {
            if let Some(room) = parse_room(room) {
                run_tutor(&cli.server, room, *poll).await;
            }
        }
        Commands::Learner { room, name, client } => {
            let Some(room) = parse_room(room) else { return };
            let client = client
                .clone()
                .unwrap_or_else(|| format!("cli-{:08x}", rand::random::<u32>()));
            match ClientId::parse(&client) {
                Ok(client_id) => run_learner(&cli.server, room, client_id, name.clone()).await,
                Err(e) => println!("{} {}", "✗".red(), e),
            }
        }
        Commands::Validate => run_all_validations(&cli.server).await,
    }
}

fn parse_room(raw: &str) -> Option<RoomCode> {
    match RoomCode::parse(raw) {
        Ok(code) => Some(code),
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            None
        }
    }
}

fn ws_url(server: &str) -> String {
    format!("ws://{}/ws", server)
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/api/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn list_rooms(server: &str) {
    let url = format!("http://{}/api/rooms", server);

    match fetch_json::<Vec<RoomSummary>>(reqwest::Client::new().get(&url)).await {
        Ok(rooms) if rooms.is_empty() => println!("{}", "No rooms yet".yellow()),
        Ok(rooms) => {
            println!("{}", "Rooms".bold());
            println!("{}", "─".repeat(60));
            for room in &rooms {
                print_summary(room);
            }
        }
        Err(e) => println!("{} {}", "✗".red(), e),
    }
}

async fn show_room(server: &str, code: &str) {
    let url = format!("http://{}/api/rooms/{}", server, urlencoding::encode(code));

    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
            println!("{} No room with code {}", "✗".yellow(), code.to_uppercase());
        }
        Ok(resp) if resp.status().is_success() => match resp.json::<RoomSummary>().await {
            Ok(room) => print_summary(&room),
            Err(e) => println!("{} Unexpected response: {}", "✗".red(), e),
        },
        Ok(resp) => println!("{} Request failed: {}", "✗".red(), resp.status()),
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn new_room(server: &str, description: Option<String>) {
    let url = format!("http://{}/api/rooms", server);
    let body = serde_json::json!({ "description": description });

    match fetch_json::<RoomSummary>(reqwest::Client::new().post(&url).json(&body)).await {
        Ok(room) => {
            println!("{} Room created successfully!", "✓".green());
            println!("\n{}", "═".repeat(50).green());
            println!("{} {}", "Room code:".bold(), room.room_code.as_str().green().bold());
            println!("{} {}", "Description:".bold(), room.description);
            println!("{}", "═".repeat(50).green());
        }
        Err(e) => println!("{} {}", "✗".red(), e),
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, String> {
    let resp = request
        .send()
        .await
        .map_err(|e| format!("Cannot connect to server: {}", e))?;
    if !resp.status().is_success() {
        return Err(format!("Request failed: {}", resp.status()));
    }
    resp.json::<T>().await.map_err(|e| format!("Unexpected response: {}", e))
}

fn print_summary(room: &RoomSummary) {
    println!(
        "  {}  {}  learners: {}  active: {}  hands up: {}",
        room.room_code.as_str().cyan().bold(),
        room.description,
        room.learner_count,
        room.active_count,
        room.hands_up
    );
}

/// Reads stdin lines on a background task.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_tutor(server: &str, room_code: RoomCode, poll: bool) {
    let (session, mut events) = match ClientSession::connect(&ws_url(server)).await {
        Ok(connected) => connected,
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return;
        }
    };
    println!("{} Watching room {}", "✓".green(), room_code.as_str().green().bold());
    println!("Commands: {}, {}, {}, {}", "clear".cyan(), "kick <client>".cyan(), "kick-all".cyan(), "quit".cyan());

    if session
        .send(ClientEvent::JoinAsTutor { room_code: room_code.clone() })
        .is_err()
    {
        println!("{} Failed to join room", "✗".red());
        return;
    }
    let _pings = PingSchedule::start(
        session.sender(),
        ClientEvent::PingFromTutor { room_code: room_code.clone() },
        TUTOR_PING_INTERVAL,
    );

    let mut input = stdin_lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ServerEvent::RefreshTutor(view)) => print_tutor_view(&view, poll),
                Some(_) => continue,
                None => {
                    println!("{} Connection closed", "✗".yellow());
                    break;
                }
            },
            line = input.recv() => {
                let Some(line) = line else { break };
                let event = match tutor_command(&room_code, line.trim()) {
                    TutorCommand::Send(event) => event,
                    TutorCommand::Quit => break,
                    TutorCommand::Invalid(message) => {
                        println!("{} {}", "✗".yellow(), message);
                        continue;
                    }
                };
                if session.send(event).is_err() {
                    println!("{} Connection closed", "✗".red());
                    break;
                }
            }
        }
    }
}

enum TutorCommand {
    Send(ClientEvent),
    Quit,
    Invalid(String),
}

fn tutor_command(room_code: &RoomCode, line: &str) -> TutorCommand {
    let room_code = room_code.clone();
    let (command, argument) = line.split_once(' ').unwrap_or((line, ""));

    match command {
        "clear" => TutorCommand::Send(ClientEvent::Clear { room_code }),
        "kick-all" => TutorCommand::Send(ClientEvent::KickAllLearners { room_code }),
        "kick" => match ClientId::parse(argument.trim()) {
            Ok(client_id) => TutorCommand::Send(ClientEvent::KickLearner { room_code, client_id }),
            Err(_) => TutorCommand::Invalid("Usage: kick <client>".to_string()),
        },
        "quit" | "exit" => TutorCommand::Quit,
        other => TutorCommand::Invalid(format!("Unknown command: {}", other)),
    }
}

fn print_tutor_view(view: &TutorView, poll: bool) {
    println!("\n{} {}", view.room_code.as_str().cyan().bold(), view.description);
    if view.beep_fired {
        println!("\x07{}", "✋ Hand up!".yellow().bold());
    }
    println!("{}", "─".repeat(60));

    if view.learners.is_empty() {
        println!("  {}", "No learners".dimmed());
    }
    for learner in &view.learners {
        let rank = learner
            .hand_up_rank
            .map(|r| format!("#{}", r))
            .unwrap_or_default();
        let line = format!(
            "  {:<4} {:<20} {:<12} {:<16} {}",
            rank,
            learner.name,
            learner.status,
            learner.answer,
            learner.client_id
        );
        if learner.is_active {
            println!("{}", line);
        } else {
            println!("{}", line.dimmed());
        }
    }

    if poll {
        let counts = status_counts(view);
        if !counts.is_empty() {
            println!("{}", "Poll".bold());
            for (status, count) in counts {
                println!("  {:<12} {}", status, count.to_string().green());
            }
        }
    }
}

async fn run_learner(server: &str, room_code: RoomCode, client_id: ClientId, mut name: String) {
    let (session, mut events) = match ClientSession::connect(&ws_url(server)).await {
        Ok(connected) => connected,
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return;
        }
    };
    println!(
        "{} Joined room {} as {} ({})",
        "✓".green(),
        room_code.as_str().green().bold(),
        name.bold(),
        client_id
    );
    println!(
        "Commands: {}, {}, {}, {}, {}, {}, {}",
        "up".cyan(),
        "ok".cyan(),
        "down".cyan(),
        "status <t>".cyan(),
        "answer <text>".cyan(),
        "name <n>".cyan(),
        "quit".cyan()
    );

    let join = [
        ClientEvent::JoinAsLearner {
            room_code: room_code.clone(),
            client_id: client_id.clone(),
        },
        learner_status(&room_code, &client_id, Some(name.clone()), None, None),
    ];
    for event in join {
        if session.send(event).is_err() {
            println!("{} Failed to join room", "✗".red());
            return;
        }
    }

    let ping = |name: &str| {
        PingSchedule::start(
            session.sender(),
            ClientEvent::PingFromLearner {
                room_code: room_code.clone(),
                client_id: client_id.clone(),
                name: Some(name.to_string()),
            },
            LEARNER_PING_INTERVAL,
        )
    };
    let mut pings = ping(&name);

    let mut input = stdin_lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ServerEvent::RefreshLearner(view)) => print_learner_view(&view),
                Some(ServerEvent::Clear) => println!("{}", "Tutor cleared the room".yellow()),
                Some(_) => continue,
                None => {
                    println!("{} Connection closed", "✗".yellow());
                    break;
                }
            },
            line = input.recv() => {
                let Some(line) = line else { break };
                let line = line.trim();
                let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
                let argument = argument.trim();

                let event = match command {
                    "up" => learner_status(&room_code, &client_id, None, Some(HAND_UP), None),
                    "ok" => learner_status(&room_code, &client_id, None, Some("ok"), None),
                    "down" => learner_status(&room_code, &client_id, None, Some(""), None),
                    "status" => learner_status(&room_code, &client_id, None, Some(argument), None),
                    "answer" => learner_status(&room_code, &client_id, None, None, Some(argument)),
                    "name" if !argument.is_empty() => {
                        name = argument.to_string();
                        pings = ping(&name);
                        learner_status(&room_code, &client_id, Some(name.clone()), None, None)
                    }
                    "quit" | "exit" => break,
                    other => {
                        println!("{} Unknown command: {}", "✗".yellow(), other);
                        continue;
                    }
                };
                if session.send(event).is_err() {
                    println!("{} Connection closed", "✗".red());
                    break;
                }
            }
        }
    }
    pings.cancel();
}

fn learner_status(
    room_code: &RoomCode,
    client_id: &ClientId,
    name: Option<String>,
    status: Option<&str>,
    answer: Option<&str>,
) -> ClientEvent {
    ClientEvent::Status {
        room_code: room_code.clone(),
        client_id: client_id.clone(),
        name,
        status: status.map(str::to_string),
        answer: answer.map(str::to_string),
    }
}

fn print_learner_view(view: &LearnerView) {
    let status = if view.status.is_empty() { "-" } else { view.status.as_str() };
    println!(
        "{} {}  name: {}  status: {}  answer: {}",
        "◀".green(),
        view.room_code.as_str().cyan(),
        view.name.bold(),
        status,
        view.answer
    );
}

async fn run_all_validations(server: &str) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let scenarios = ["health", "hand-up", "clear", "kick-all", "room-code-case"];
    let mut passed = 0;
    let mut failed = 0;

    for scenario in scenarios {
        println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
        println!("{}", "─".repeat(60));

        let result = match scenario {
            "health" => validate_health(server).await,
            "hand-up" => validate_hand_up(server).await,
            "clear" => validate_clear(server).await,
            "kick-all" => validate_kick_all(server).await,
            "room-code-case" => validate_room_code_case(server).await,
            _ => Err("unknown scenario".to_string()),
        };

        match result {
            Ok(()) => {
                println!("{} Scenario passed", "✓".green());
                passed += 1;
            }
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                failed += 1;
            }
        }
    }

    println!("\n{}", "═".repeat(60).green());
    println!("{}", "Validation Summary".bold());
    println!("{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    println!("  Total: {}", passed + failed);

    if failed == 0 {
        println!("\n{}", "All validations passed! 🎉".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

type Validation = Result<(), String>;

/// A fresh room per scenario so runs against a shared server do not collide.
async fn fresh_room(server: &str) -> Result<RoomCode, String> {
    let url = format!("http://{}/api/rooms", server);
    let room = fetch_json::<RoomSummary>(reqwest::Client::new().post(&url)).await?;
    Ok(room.room_code)
}

async fn connect(server: &str) -> Result<(ClientSession, mpsc::UnboundedReceiver<ServerEvent>), String> {
    ClientSession::connect(&ws_url(server))
        .await
        .map_err(|e| format!("Connection failed: {}", e))
}

fn send(session: &ClientSession, value: serde_json::Value) -> Validation {
    let event = serde_json::from_value::<ClientEvent>(value).map_err(|e| e.to_string())?;
    session.send(event).map_err(|e| e.to_string())
}

/// Waits for the next tutor view that satisfies `accept`.
async fn await_tutor_view(
    events: &mut mpsc::UnboundedReceiver<ServerEvent>,
    accept: impl Fn(&TutorView) -> bool,
) -> Result<TutorView, String> {
    timeout(Duration::from_secs(3), async {
        while let Some(event) = events.recv().await {
            if let ServerEvent::RefreshTutor(view) = event {
                if accept(&view) {
                    return Ok(view);
                }
            }
        }
        Err("Connection closed".to_string())
    })
    .await
    .map_err(|_| "Timeout waiting for tutor view".to_string())?
}

fn rank_of(view: &TutorView, client: &str) -> Option<u32> {
    view.learners
        .iter()
        .find(|l| l.client_id.as_str() == client)
        .and_then(|l| l.hand_up_rank)
}

async fn validate_health(server: &str) -> Validation {
    let url = format!("http://{}/api/health", server);
    let body = fetch_json::<serde_json::Value>(reqwest::Client::new().get(&url)).await?;
    if body["status"] == "healthy" {
        println!("{} Server is healthy", "✓".green());
        Ok(())
    } else {
        Err(format!("Unexpected health response: {}", body))
    }
}

async fn validate_hand_up(server: &str) -> Validation {
    let room = fresh_room(server).await?;
    let code = room.as_str();
    println!("  Room: {}", code.cyan());

    let (tutor, mut tutor_events) = connect(server).await?;
    send(&tutor, serde_json::json!({"type": "join-as-tutor", "roomCode": code}))?;

    let (learner, _learner_events) = connect(server).await?;
    send(&learner, serde_json::json!({"type": "join-as-learner", "roomCode": code, "clientId": "validator-1"}))?;
    send(&learner, serde_json::json!({"type": "status", "room": code, "clientId": "validator-1", "name": "Ada", "status": HAND_UP}))?;

    let view = await_tutor_view(&mut tutor_events, |v| rank_of(v, "validator-1").is_some()).await?;
    if rank_of(&view, "validator-1") != Some(1) || !view.beep_fired {
        return Err(format!("Expected rank 1 with a beep, got {:?}", view));
    }
    println!("{} First hand up ranked 1 and beeped", "✓".green());

    send(&learner, serde_json::json!({"type": "status", "room": code, "clientId": "validator-1", "status": HAND_UP}))?;
    let view = await_tutor_view(&mut tutor_events, |_| true).await?;
    if rank_of(&view, "validator-1") != Some(1) || view.beep_fired {
        return Err("Repeated hand up changed the rank or beeped again".to_string());
    }
    println!("{} Repeated hand up kept its rank", "✓".green());
    Ok(())
}

async fn validate_clear(server: &str) -> Validation {
    let room = fresh_room(server).await?;
    let code = room.as_str();

    let (tutor, mut tutor_events) = connect(server).await?;
    send(&tutor, serde_json::json!({"type": "join-as-tutor", "roomCode": code}))?;

    let (learner, mut learner_events) = connect(server).await?;
    send(&learner, serde_json::json!({"type": "join-as-learner", "roomCode": code, "clientId": "validator-2"}))?;
    send(&learner, serde_json::json!({"type": "status", "room": code, "clientId": "validator-2", "name": "Bea", "status": HAND_UP, "answer": "42"}))?;
    await_tutor_view(&mut tutor_events, |v| rank_of(v, "validator-2").is_some()).await?;

    send(&tutor, serde_json::json!({"type": "clear", "roomCode": code}))?;
    let view = await_tutor_view(&mut tutor_events, |v| rank_of(v, "validator-2").is_none()).await?;
    if view.learners.iter().any(|l| !l.status.is_empty() || !l.answer.is_empty()) {
        return Err("Clear left a status or answer behind".to_string());
    }

    let cleared = timeout(Duration::from_secs(3), async {
        while let Some(event) = learner_events.recv().await {
            if event == ServerEvent::Clear {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);
    if !cleared {
        return Err("Learner never received clear".to_string());
    }
    println!("{} Room cleared and learner notified", "✓".green());
    Ok(())
}

async fn validate_kick_all(server: &str) -> Validation {
    let room = fresh_room(server).await?;
    let code = room.as_str();

    let (tutor, mut tutor_events) = connect(server).await?;
    send(&tutor, serde_json::json!({"type": "join-as-tutor", "roomCode": code}))?;

    let (learner, _learner_events) = connect(server).await?;
    for client in ["validator-3", "validator-4"] {
        send(&learner, serde_json::json!({"type": "status", "room": code, "clientId": client, "name": client}))?;
    }
    await_tutor_view(&mut tutor_events, |v| v.learners.len() == 2).await?;

    send(&tutor, serde_json::json!({"type": "kick-all-learners", "roomCode": code}))?;
    await_tutor_view(&mut tutor_events, |v| v.learners.is_empty()).await?;
    println!("{} Roster emptied", "✓".green());

    let url = format!("http://{}/api/rooms/{}", server, code);
    let summary = fetch_json::<RoomSummary>(reqwest::Client::new().get(&url)).await?;
    if summary.learner_count != 0 {
        return Err(format!("Room still lists {} learners", summary.learner_count));
    }
    println!("{} Room still resolvable", "✓".green());
    Ok(())
}

async fn validate_room_code_case(server: &str) -> Validation {
    let room = fresh_room(server).await?;
    let upper = room.as_str().to_string();
    let lower = upper.to_lowercase();

    let (tutor, mut tutor_events) = connect(server).await?;
    send(&tutor, serde_json::json!({"type": "join-as-tutor", "roomCode": lower}))?;

    let (learner, _learner_events) = connect(server).await?;
    send(&learner, serde_json::json!({"type": "status", "room": upper, "clientId": "validator-5", "name": "Cy"}))?;

    let view = await_tutor_view(&mut tutor_events, |v| !v.learners.is_empty()).await?;
    if view.room_code.as_str() != upper {
        return Err(format!("Expected room {}, got {}", upper, view.room_code));
    }
    println!("{} {} and {} resolve to the same room", "✓".green(), lower, upper);
    Ok(())
}
