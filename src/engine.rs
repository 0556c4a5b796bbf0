//! Script Runner: walks the active path, emits chat bubbles after their
//! authored delay, and parks on choice nodes until a selection arrives.
//!
//! The runner is cooperative and single-session. Guards against duplicate
//! UI events are phase checks under the session lock; cancellation of a
//! superseded run is an epoch comparison before every emission.

pub mod event;
pub mod session;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::routing::Resolution;
use crate::story::node::Author;
use crate::story::Story;
use crate::validate;

pub use event::EngineEvent;
pub use session::{Line, PendingChoice, Phase, Session};

use session::Step;

/// How a call into the runner ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Parked on a choice node.
    AwaitingChoice { node_id: String },
    /// The active path ran out. `node_id` is its last node.
    Finished { node_id: Option<String> },
    /// A newer run (reset, goto) took over before this one finished.
    Cancelled,
}

struct Inner {
    story: Story,
    config: EngineConfig,
    session: Mutex<Session>,
    events: broadcast::Sender<EngineEvent>,
}

/// Cloneable handle to one live session.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Validate `story` per `config.validation` and set up an idle session
    /// on its start path.
    pub fn new(story: Story, config: EngineConfig) -> EngineResult<Self> {
        validate::check(&story, config.validation)?;
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let session = Session::new(&story.start_path);
        Ok(Self {
            inner: Arc::new(Inner {
                story,
                config,
                session: Mutex::new(session),
                events,
            }),
        })
    }

    pub fn story(&self) -> &Story {
        &self.inner.story
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// A copy of the current session state.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EngineEvent) {
        // No subscriber is fine; the transcript stays authoritative.
        let _ = self.inner.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Inbound calls
    // -----------------------------------------------------------------------

    /// Start the story's own start path.
    pub async fn begin(&self) -> EngineResult<RunOutcome> {
        let start = self.inner.story.start_path.clone();
        self.start(&start).await
    }

    /// Load `path` at cursor 0 and run until a choice or the end.
    ///
    /// A no-op (`Reentrant`) while another run or selection is in flight.
    pub async fn start(&self, path: &str) -> EngineResult<RunOutcome> {
        let epoch = {
            let mut session = self.lock();
            if let Err(e) = session.ensure_can_start() {
                debug!("Ignoring start('{path}'): {e}");
                return Err(e);
            }
            let epoch = session.load(&self.inner.story.graph, path, 0)?;
            self.emit(EngineEvent::PathLoaded {
                path: path.to_owned(),
                cursor: 0,
            });
            epoch
        };
        info!("Run started on path '{path}'");
        self.drive(epoch).await
    }

    /// Switch to `path` unconditionally. Any in-flight run stops before its
    /// next emission.
    pub async fn goto(&self, path: &str) -> EngineResult<RunOutcome> {
        let epoch = {
            let mut session = self.lock();
            let superseded = matches!(session.phase(), Phase::Running | Phase::Selecting);
            let epoch = session.load(&self.inner.story.graph, path, 0)?;
            if session.typing() {
                session.set_typing(false);
                self.emit(EngineEvent::TypingStateChanged { active: false });
            }
            self.emit(EngineEvent::PathLoaded {
                path: path.to_owned(),
                cursor: 0,
            });
            if superseded {
                info!("Jumped to path '{path}', superseding the active run");
            } else {
                info!("Jumped to path '{path}'");
            }
            epoch
        };
        self.drive(epoch).await
    }

    /// Answer the pending choice with `option_id`.
    ///
    /// The selection lock is taken before the first suspension point, so a
    /// second call racing this one gets `Reentrant` and changes nothing.
    pub async fn select(&self, option_id: &str) -> EngineResult<RunOutcome> {
        let selection = {
            let mut session = self.lock();
            match session.begin_selection(option_id) {
                Ok(selection) => selection,
                Err(e) => {
                    if e.is_reentrant() {
                        debug!("Ignoring duplicate selection '{option_id}': {e}");
                    } else {
                        warn!("Rejected selection '{option_id}': {e}");
                    }
                    return Err(e);
                }
            }
        };
        info!(
            "Selected '{}' at {} (\"{}\")",
            selection.option.id, selection.node_id, selection.option.label
        );

        let reply_delay = self.inner.config.scaled(self.inner.config.reply_delay_ms);
        if !reply_delay.is_zero() {
            tokio::time::sleep(reply_delay).await;
        }

        let epoch = {
            let mut session = self.lock();
            if session.epoch() != selection.epoch {
                debug!("Selection at {} cancelled by a newer run", selection.node_id);
                return Ok(RunOutcome::Cancelled);
            }
            session.record(Author::User, &selection.option.label);
            self.emit(EngineEvent::MessageEmitted {
                author: Author::User,
                text: selection.option.label.clone(),
            });

            let story = &self.inner.story;
            let resolution = story.routes.resolve(
                &story.graph,
                &selection.node_id,
                &selection.option.id,
                self.inner.config.reentry,
            );
            match session.complete_selection(&story.graph, &resolution) {
                Ok(epoch) => {
                    match &resolution {
                        Resolution::Switch { path, cursor } => {
                            info!("Transition: {} -> path '{path}' @ {cursor}", selection.node_id);
                            self.emit(EngineEvent::PathLoaded {
                                path: path.clone(),
                                cursor: *cursor,
                            });
                        }
                        Resolution::Fallthrough => {
                            info!(
                                "No route for {}/{}; falling through to cursor {}",
                                selection.node_id,
                                selection.option.id,
                                session.cursor()
                            );
                        }
                    }
                    epoch
                }
                Err(e) => {
                    self.stall(&mut session, &e);
                    return Err(e);
                }
            }
        };
        self.drive(epoch).await
    }

    /// Throw the playthrough away: empty transcript, start path, cursor 0.
    pub fn reset(&self) {
        let mut session = self.lock();
        let was_typing = session.typing();
        session.reset(&self.inner.story.start_path);
        if was_typing {
            self.emit(EngineEvent::TypingStateChanged { active: false });
        }
        self.emit(EngineEvent::SessionReset);
        info!("Session reset to path '{}'", self.inner.story.start_path);
    }

    pub fn dismiss_notification(&self) {
        self.lock().flags_mut().notification = None;
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    async fn drive(&self, epoch: u64) -> EngineResult<RunOutcome> {
        loop {
            let (node_id, author, text, delay_ms) = {
                let mut session = self.lock();
                if session.epoch() != epoch {
                    debug!("Run {epoch} superseded before reading the next node");
                    return Ok(RunOutcome::Cancelled);
                }
                let step = match session.step(&self.inner.story.graph) {
                    Ok(step) => step,
                    Err(e) => {
                        self.stall(&mut session, &e);
                        return Err(e);
                    }
                };
                match step {
                    Step::End { last } => {
                        session.finish();
                        info!(
                            "Path '{}' finished at {}",
                            session.path(),
                            last.as_deref().unwrap_or("<empty>")
                        );
                        self.emit(EngineEvent::Finished {
                            node_id: last.clone(),
                        });
                        return Ok(RunOutcome::Finished { node_id: last });
                    }
                    Step::Choice { node_id, options } => {
                        self.fire_effects(&mut session, &node_id);
                        debug!("Awaiting choice at {node_id} ({} options)", options.len());
                        session.present(&node_id, options.clone());
                        self.emit(EngineEvent::ChoicesPresented {
                            node_id: node_id.clone(),
                            options,
                        });
                        return Ok(RunOutcome::AwaitingChoice { node_id });
                    }
                    Step::Message {
                        node_id,
                        author,
                        text,
                        delay_ms,
                    } => {
                        if author.shows_typing() {
                            session.set_typing(true);
                            self.emit(EngineEvent::TypingStateChanged { active: true });
                        }
                        (node_id, author, text, delay_ms)
                    }
                }
            };

            tokio::time::sleep(self.inner.config.scaled(delay_ms)).await;

            {
                let mut session = self.lock();
                if session.epoch() != epoch {
                    debug!("Run {epoch} superseded while {node_id} was pending");
                    return Ok(RunOutcome::Cancelled);
                }
                session.record(author, &text);
                self.emit(EngineEvent::MessageEmitted { author, text });
                if author.shows_typing() {
                    session.set_typing(false);
                    self.emit(EngineEvent::TypingStateChanged { active: false });
                }
                self.fire_effects(&mut session, &node_id);
                session.advance();
            }

            tokio::task::yield_now().await;
        }
    }

    fn fire_effects(&self, session: &mut Session, node_id: &str) {
        for effect in self.inner.story.effects.for_node(node_id) {
            debug!("Side effect at {node_id}: {} {}", effect.kind(), effect.payload());
            session.flags_mut().apply(effect);
            self.emit(EngineEvent::SideEffectFired {
                node_id: node_id.to_owned(),
                effect: effect.clone(),
            });
        }
    }

    fn stall(&self, session: &mut Session, error: &EngineError) {
        warn!("Run stalled on path '{}' at {}: {error}", session.path(), session.cursor());
        let was_typing = session.typing();
        session.stall();
        if was_typing {
            self.emit(EngineEvent::TypingStateChanged { active: false });
        }
        self.emit(EngineEvent::Stalled {
            reason: error.to_string(),
        });
    }
}
