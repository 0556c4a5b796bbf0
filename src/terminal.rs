//! Terminal front end: prints engine events as a chat log and feeds the
//! player's typed answers back in.

use std::future::Future;
use std::io::{self, Write};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::effects::SideEffect;
use crate::engine::{Engine, EngineEvent, RunOutcome};
use crate::error::EngineResult;
use crate::story::node::{Author, ChoiceOption, Node};
use crate::story::Story;

const DEFAULT_RESET_NOTICE: &str = "Restarting simulation…";

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// An option id from the pending choice.
    Pick(String),
    Reset,
    Quit,
    Unknown,
}

pub struct InputParser {
    re: Regex,
}

impl InputParser {
    pub fn new() -> Result<Self> {
        let re = Regex::new(r"^\s*(?:(\d+)|([A-Za-z][\w-]*))\s*$")
            .context("failed to compile input pattern")?;
        Ok(Self { re })
    }

    /// Accepts a 1-based option number, an option id, or a command word.
    /// Option ids win over command words.
    pub fn parse(&self, line: &str, options: &[ChoiceOption]) -> Input {
        let Some(caps) = self.re.captures(line) else {
            return Input::Unknown;
        };

        if let Some(num) = caps.get(1) {
            return num
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| options.get(i))
                .map_or(Input::Unknown, |o| Input::Pick(o.id.clone()));
        }

        let word = caps.get(2).map_or("", |m| m.as_str());
        if let Some(option) = options.iter().find(|o| o.id.eq_ignore_ascii_case(word)) {
            return Input::Pick(option.id.clone());
        }
        match word.to_lowercase().as_str() {
            "reset" | "restart" => Input::Reset,
            "quit" | "exit" => Input::Quit,
            _ => Input::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Event rendering
// ---------------------------------------------------------------------------

pub struct Renderer {
    persona: String,
    reset_notice: String,
}

impl Renderer {
    pub fn new(persona: impl Into<String>, reset_notice: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            reset_notice: reset_notice.into(),
        }
    }

    /// Uses the story's `sysreset` node as the restart notice when present.
    pub fn for_story(story: &Story) -> Self {
        let reset_notice = match story.graph.nodes.get("sysreset") {
            Some(Node::Message { text, .. }) => text.clone(),
            _ => DEFAULT_RESET_NOTICE.to_owned(),
        };
        Self::new("Omniscye", reset_notice)
    }

    /// Lines to print for one event. Empty when the event has no visible form.
    pub fn render(&self, event: &EngineEvent) -> Vec<String> {
        match event {
            EngineEvent::MessageEmitted { author, text } => match author {
                Author::Antagonist => vec![format!("[{}]: {text}", self.persona)],
                Author::User => vec![format!("[You]: {text}")],
                Author::System => vec![format!("({text})")],
            },
            EngineEvent::TypingStateChanged { active: true } => {
                vec![format!("({} is typing…)", self.persona)]
            }
            EngineEvent::TypingStateChanged { active: false } => Vec::new(),
            EngineEvent::ChoicesPresented { options, .. } => {
                let mut lines = vec![String::new()];
                lines.extend(
                    options
                        .iter()
                        .enumerate()
                        .map(|(i, o)| format!("  [{}] {}", i + 1, o.label)),
                );
                lines
            }
            EngineEvent::SideEffectFired { effect, .. } => match effect {
                SideEffect::Notify { text } => vec![format!("  [!] {text}")],
                SideEffect::SetCarrier { name } => vec![format!("  [carrier: {name}]")],
            },
            EngineEvent::Stalled { reason } => vec![format!("(connection lost: {reason})")],
            EngineEvent::SessionReset => vec![format!("({})", self.reset_notice)],
            EngineEvent::PathLoaded { .. } | EngineEvent::Finished { .. } => Vec::new(),
        }
    }

    fn print(&self, event: &EngineEvent) {
        for line in self.render(event) {
            println!("{line}");
        }
    }

    /// Print whatever is already queued without waiting.
    fn flush_pending(&self, rx: &mut broadcast::Receiver<EngineEvent>) {
        loop {
            match rx.try_recv() {
                Ok(event) => self.print(&event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Terminal fell behind by {n} events")
                }
                Err(_) => break,
            }
        }
    }

    /// Drive `fut` while printing events as they arrive, then print the rest.
    async fn pump<F>(&self, rx: &mut broadcast::Receiver<EngineEvent>, fut: F) -> F::Output
    where
        F: Future,
    {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                biased;
                event = rx.recv() => match event {
                    Ok(event) => self.print(&event),
                    Err(RecvError::Lagged(n)) => warn!("Terminal fell behind by {n} events"),
                    Err(RecvError::Closed) => {
                        let out = fut.as_mut().await;
                        self.flush_pending(rx);
                        return out;
                    }
                },
                out = &mut fut => {
                    self.flush_pending(rx);
                    return out;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Game over screen
// ---------------------------------------------------------------------------

/// How a single playthrough ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// The story ran out on an ending node.
    Finished {
        ending: Option<String>,
        choices_made: usize,
        messages: usize,
    },
    /// An internal error stopped the story.
    Stalled { reason: String },
    /// Player asked for a fresh run mid-game.
    Restart,
    Quit,
}

fn show_banner() {
    println!("\n========================================");
    println!("       OMNISCYE - SECURE CHAT");
    println!("========================================");
    println!("Someone is texting you. Answer with a number.");
    println!("Type 'reset' to start over, 'quit' to leave.\n");
}

fn show_game_over(outcome: &GameOutcome) {
    println!("\n========================================");
    println!("             CONNECTION CLOSED");
    println!("========================================");

    match outcome {
        GameOutcome::Finished {
            ending,
            choices_made,
            messages,
        } => {
            println!("  Ending:   {}", ending.as_deref().unwrap_or("-"));
            println!("  Choices:  {choices_made}");
            println!("  Messages: {messages}");
        }
        GameOutcome::Stalled { reason } => {
            println!("  The chat froze: {reason}");
        }
        GameOutcome::Restart | GameOutcome::Quit => {}
    }

    println!("========================================\n");
    println!("  [r] Restart    [q] Quit\n");
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

/// Read the player's post-game choice. Returns `true` to restart, `false` to quit.
async fn prompt_restart<R>(lines: &mut Lines<R>) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        prompt()?;
        let Some(input) = lines.next_line().await? else {
            return Ok(false);
        };
        match input.trim().to_lowercase().as_str() {
            "r" => return Ok(true),
            "q" => return Ok(false),
            _ => println!("  Press [r] to restart or [q] to quit."),
        }
    }
}

// ---------------------------------------------------------------------------
// Single playthrough
// ---------------------------------------------------------------------------

async fn play_round<R>(
    engine: &Engine,
    parser: &InputParser,
    renderer: &Renderer,
    rx: &mut broadcast::Receiver<EngineEvent>,
    lines: &mut Lines<R>,
) -> Result<GameOutcome>
where
    R: AsyncBufRead + Unpin,
{
    let mut outcome: EngineResult<RunOutcome> = renderer.pump(rx, engine.begin()).await;

    loop {
        match outcome {
            Ok(RunOutcome::AwaitingChoice { node_id }) => debug!("Waiting for input at {node_id}"),
            Ok(RunOutcome::Finished { node_id }) => {
                let snap = engine.snapshot();
                return Ok(GameOutcome::Finished {
                    ending: node_id,
                    choices_made: snap.choices_made(),
                    messages: snap.transcript().len(),
                });
            }
            Ok(RunOutcome::Cancelled) => return Ok(GameOutcome::Restart),
            Err(e) => return Ok(GameOutcome::Stalled { reason: e.to_string() }),
        }

        let options = engine
            .snapshot()
            .pending()
            .map(|p| p.options.clone())
            .unwrap_or_default();

        outcome = loop {
            prompt()?;
            let Some(line) = lines.next_line().await? else {
                return Ok(GameOutcome::Quit);
            };
            match parser.parse(&line, &options) {
                Input::Pick(option_id) => {
                    info!("Player picked '{option_id}'");
                    break renderer.pump(rx, engine.select(&option_id)).await;
                }
                Input::Reset => return Ok(GameOutcome::Restart),
                Input::Quit => return Ok(GameOutcome::Quit),
                Input::Unknown => {
                    println!("  Pick 1-{}, or type reset / quit.", options.len());
                }
            }
        };
    }
}

// ---------------------------------------------------------------------------
// Public entry point: plays until the player quits
// ---------------------------------------------------------------------------

pub async fn run(engine: Engine) -> Result<()> {
    let parser = InputParser::new()?;
    let renderer = Renderer::for_story(engine.story());
    let mut rx = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    show_banner();
    loop {
        let outcome = play_round(&engine, &parser, &renderer, &mut rx, &mut lines).await?;

        match &outcome {
            GameOutcome::Quit => {
                println!("Thanks for playing!");
                break;
            }
            GameOutcome::Restart => info!("Player restarted mid-game"),
            GameOutcome::Finished { .. } | GameOutcome::Stalled { .. } => {
                show_game_over(&outcome);
                if !prompt_restart(&mut lines).await? {
                    println!("Thanks for playing!");
                    break;
                }
                info!("Player chose to restart");
            }
        }

        engine.reset();
        renderer.flush_pending(&mut rx);
    }

    Ok(())
}
