//! Chat command - interactive messaging session.
//!
//! Runs the frontend event loop: server events come in over the socket,
//! controller events go out to the terminal, and stdin lines become
//! commands or message sends. All network requests with a deferred outcome
//! (history fetches, send acknowledgments) run in spawned tasks and report
//! back through a completion channel, tagged with the ticket that ordered
//! them.

use anyhow::{Context, Result};
use mentorlink_core::{
    ApiClient, Config, ConversationController, ConversationEvent, Counterpart, HistoryTicket,
    Message, MessageView, Notice, NoticeKind, PendingSend, Profile, SendAck, SendTicket,
    SocketChannel, UserId,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Outcome of a spawned network request.
enum Completion {
    History(HistoryTicket, mentorlink_core::Result<Vec<Message>>),
    Ack(SendTicket, Option<SendAck>),
}

pub async fn execute(config_path: Option<String>) -> Result<()> {
    // Load configuration
    let config = if let Some(path) = config_path {
        info!("Loading config from: {}", path);
        let contents = std::fs::read_to_string(&path)?;
        serde_json::from_str(&contents)?
    } else {
        Config::load_with_env()?
    };

    let api = ApiClient::new(&config)?;
    let me = api.me().await.context("could not load your profile")?;
    println!("Signed in as \x1b[1m{}\x1b[0m ({})", me.name, me.id);

    let roster = fetch_roster(&api, &me).await?;
    if roster.is_empty() {
        println!("No conversations available for this account yet.");
    }

    let (channel, mut stream) = SocketChannel::connect(&config.socket_url, me.id.clone())
        .await
        .context("could not open the event channel")?;
    let (mut controller, mut events) = ConversationController::new(channel, &config);
    controller.update_roster(roster);

    let (completion_tx, mut completions) = mpsc::unbounded_channel();

    // Auto-open the single approved conversation, the common case for a
    // student with one mentor.
    let approved: Vec<UserId> = controller
        .roster_entries()
        .into_iter()
        .filter(|e| e.counterpart.approved)
        .map(|e| e.counterpart.id)
        .collect();
    if let [only] = approved.as_slice() {
        open_conversation(&mut controller, &api, &completion_tx, only);
    }

    print_help();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            maybe = stream.recv() => match maybe {
                Some(event) => controller.handle_event(event),
                None => {
                    println!("Connection closed by the server.");
                    break;
                }
            },
            Some(event) = events.recv() => render_event(&controller, event),
            Some(done) = completions.recv() => match done {
                Completion::History(ticket, result) => {
                    controller.apply_history(&ticket, result).await;
                }
                Completion::Ack(ticket, ack) => controller.apply_send_ack(&ticket, ack),
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_line(&mut controller, &api, &completion_tx, line.trim()).await? {
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => controller.tick(),
        }
    }

    info!("Session ended");
    Ok(())
}

/// Process one stdin line. Returns `false` when the session should end.
async fn handle_line(
    controller: &mut ConversationController,
    api: &ApiClient,
    completions: &mpsc::UnboundedSender<Completion>,
    line: &str,
) -> Result<bool> {
    match line {
        "" => {}
        "/quit" | "/q" => return Ok(false),
        "/help" => print_help(),
        "/roster" => print_roster(controller),
        _ if line.starts_with("/open ") => {
            let id: UserId = line["/open ".len()..].trim().into();
            open_conversation(controller, api, completions, &id);
        }
        _ if line.starts_with('/') => println!("Unknown command: {}", line),
        text => {
            // A submitted line is the only input activity a line reader
            // can observe.
            if let Err(err) = controller.input_activity().await {
                debug!("typing signal failed: {}", err);
            }
            match controller.send(text).await {
                Ok(PendingSend { ticket, ack }) => {
                    let tx = completions.clone();
                    tokio::spawn(async move {
                        let ack = ack.await.ok();
                        let _ = tx.send(Completion::Ack(ticket, ack));
                    });
                }
                // The controller already raised a notice for the reason.
                Err(err) => debug!("send rejected: {}", err),
            }
        }
    }
    Ok(true)
}

/// Select a counterpart and fetch its history in the background.
fn open_conversation(
    controller: &mut ConversationController,
    api: &ApiClient,
    completions: &mpsc::UnboundedSender<Completion>,
    id: &UserId,
) {
    let ticket = match controller.select_counterpart(id) {
        Ok(ticket) => ticket,
        // The controller already raised a notice for the reason.
        Err(err) => {
            debug!("selection rejected: {}", err);
            return;
        }
    };

    let api = api.clone();
    let id = id.clone();
    let tx = completions.clone();
    tokio::spawn(async move {
        let result = api.messages_with(&id).await;
        let _ = tx.send(Completion::History(ticket, result));
    });
}

/// Fetch the counterpart roster for the account type.
async fn fetch_roster(api: &ApiClient, me: &Profile) -> Result<Vec<Counterpart>> {
    let mut roster = Vec::new();
    if me.is_university() {
        for request in api.my_requests().await? {
            if let Some(counterpart) = request.counterpart() {
                roster.push(counterpart);
            }
        }
    } else if let Some(link) = api.my_mentor().await? {
        roster.push(link.counterpart());
    }
    Ok(roster)
}

fn render_event(controller: &ConversationController, event: ConversationEvent) {
    match event {
        ConversationEvent::Connected { user_id } => {
            println!("\x1b[32m● Connected\x1b[0m as {}", user_id);
        }
        ConversationEvent::RosterUpdated { entries } => {
            debug!("roster updated: {} counterpart(s)", entries.len());
        }
        ConversationEvent::ConversationLoading { counterpart_id } => {
            println!(
                "Opening conversation with {}...",
                display_name(controller, &counterpart_id)
            );
        }
        ConversationEvent::HistoryLoaded {
            counterpart_id,
            count,
        } => {
            println!(
                "--- {} ({} message(s)) ---",
                display_name(controller, &counterpart_id),
                count
            );
            for view in controller.render() {
                print_message(controller, &view);
            }
        }
        ConversationEvent::MessageAppended { view } => print_message(controller, &view),
        ConversationEvent::TypingChanged { typing } => {
            if typing {
                if let Some(id) = controller.active_counterpart() {
                    println!(
                        "\x1b[90m({} is typing...)\x1b[0m",
                        display_name(controller, id)
                    );
                }
            }
        }
        ConversationEvent::UnreadChanged {
            counterpart_id,
            unread,
        } => {
            if unread > 0 {
                println!(
                    "\x1b[33m● {} unread from {}\x1b[0m",
                    unread,
                    display_name(controller, &counterpart_id)
                );
            }
        }
        ConversationEvent::SendStateChanged { enabled } => {
            debug!("send {}", if enabled { "enabled" } else { "disabled" });
        }
        ConversationEvent::NoticeRaised(notice) => print_notice(&notice),
    }
}

fn print_message(controller: &ConversationController, view: &MessageView) {
    let stamp = view
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M");
    let pending = if view.confirmed {
        ""
    } else {
        " \x1b[90m(sending)\x1b[0m"
    };
    let who = if view.mine {
        "\x1b[36myou\x1b[0m".to_string()
    } else {
        format!("\x1b[35m{}\x1b[0m", display_name(controller, &view.sender_id))
    };
    println!("[{}] {}: {}{}", stamp, who, view.body, pending);
}

fn print_notice(notice: &Notice) {
    match notice.kind {
        NoticeKind::Error => println!("\x1b[31m! {}\x1b[0m", notice.text),
        NoticeKind::Info => println!("\x1b[90m· {}\x1b[0m", notice.text),
    }
}

fn print_roster(controller: &ConversationController) {
    let entries = controller.roster_entries();
    if entries.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for entry in entries {
        let status = if entry.counterpart.approved {
            "\x1b[32m●\x1b[0m"
        } else {
            "\x1b[33m○ pending\x1b[0m"
        };
        let unread = if entry.unread > 0 {
            format!("  [{} unread]", entry.unread)
        } else {
            String::new()
        };
        println!(
            "  {} {} - {}{}",
            status, entry.counterpart.name, entry.counterpart.id, unread
        );
    }
}

fn display_name(controller: &ConversationController, id: &UserId) -> String {
    controller
        .roster_entries()
        .into_iter()
        .find(|e| &e.counterpart.id == id)
        .map(|e| e.counterpart.name)
        .unwrap_or_else(|| id.to_string())
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  /roster       List your conversations");
    println!("  /open <id>    Open a conversation");
    println!("  /help         Show this help");
    println!("  /quit         Exit");
    println!("Anything else is sent to the open conversation.");
    println!();
}
