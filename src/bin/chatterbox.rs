//! Interactive terminal front end for a chat backend.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on localhost
//! chatterbox
//!
//! # Point at another backend
//! chatterbox --base-url https://chat.example.com/api/
//!
//! # Disable colors (useful for piping output)
//! chatterbox --no-color
//! ```
//!
//! Lines starting with `/` are commands (see `/help`); anything else is sent
//! as a message on the open chat.

use std::io::{self, BufRead, Write};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use chatterbox::chat::{
    ChatArgs, ChatCommand, ChatConfig, DeleteOutcome, Dialog, PlainTextRenderer, SessionController,
    SessionRef, help_text, parse_command,
};
use chatterbox::{ChatClient, ChatError, SessionId};

/// Asks questions on the terminal.
struct TerminalDialog;

impl Dialog for TerminalDialog {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{question} [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

type Controller = SessionController<ChatClient, PlainTextRenderer>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatterbox [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = ChatClient::with_options(Some(config.base_url.clone()), Some(config.timeout))?;
    let renderer = PlainTextRenderer::with_color(config.use_color);
    let mut controller = SessionController::new(client, renderer, TerminalDialog);
    let mut rl = DefaultEditor::new()?;

    println!("Chatterbox ({})", controller.backend().base_url());
    println!("Type /help for commands, /quit to exit\n");

    if let Err(err) = controller.start().await {
        report(&mut controller, &err);
    }
    print_sessions(&controller);

    loop {
        let readline = rl.readline("you> ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    let result = match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                            Ok(())
                        }
                        ChatCommand::New => {
                            controller.new_session();
                            Ok(())
                        }
                        ChatCommand::List => {
                            print_sessions(&controller);
                            Ok(())
                        }
                        ChatCommand::Refresh => {
                            let result = controller.refresh_sessions().await;
                            print_sessions(&controller);
                            result
                        }
                        ChatCommand::Open(target) => match resolve(&controller, &target) {
                            Some(id) => controller.select_session(&id).await,
                            None => {
                                controller.renderer_mut().print_error("no such chat; try /list");
                                Ok(())
                            }
                        },
                        ChatCommand::Delete(target) => match resolve(&controller, &target) {
                            Some(id) => match controller.delete_session(&id).await {
                                Ok(DeleteOutcome::Deleted) => {
                                    controller.renderer_mut().print_info("Chat deleted.");
                                    Ok(())
                                }
                                Ok(DeleteOutcome::Cancelled) => Ok(()),
                                Err(err) => Err(err),
                            },
                            None => {
                                controller.renderer_mut().print_error("no such chat; try /list");
                                Ok(())
                            }
                        },
                        ChatCommand::Invalid(message) => {
                            controller.renderer_mut().print_error(&message);
                            Ok(())
                        }
                    };
                    if let Err(err) = result {
                        report(&mut controller, &err);
                    }
                    continue;
                }

                if let Err(err) = controller.send_message(line).await {
                    report(&mut controller, &err);
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                controller
                    .renderer_mut()
                    .print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Map a command argument onto a listed session.
fn resolve(controller: &Controller, target: &SessionRef) -> Option<SessionId> {
    let registry = controller.registry();
    match target {
        SessionRef::Index(n) => registry.nth(n - 1).map(|session| session.id.clone()),
        SessionRef::Id(id) => {
            let id = SessionId::new(id.as_str());
            registry.get(&id).map(|session| session.id.clone())
        }
    }
}

fn report(controller: &mut Controller, err: &ChatError) {
    // failed sends and deletes were already shown in the log or a dialog
    if matches!(err, ChatError::Send(_) | ChatError::Delete(_)) {
        return;
    }
    controller.renderer_mut().print_error(&err.to_string());
}

fn print_sessions(controller: &Controller) {
    let entries = controller.registry().entries();
    if entries.is_empty() {
        println!("    (no saved chats)");
        return;
    }
    println!("    Chats:");
    for (i, entry) in entries.iter().enumerate() {
        let marker = if entry.active { '*' } else { ' ' };
        println!(
            "    {marker} {:>2}. {} ({})",
            i + 1,
            entry.session.display_title(),
            entry.session.id
        );
    }
}
