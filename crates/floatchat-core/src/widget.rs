// ABOUTME: Async driver that owns a Session and performs its effects
// ABOUTME: Spawns transport, catalog and timer work as tasks and bridges completions back over mpsc

use crate::config::WidgetConfig;
use crate::error::{ConfigError, TransportError};
use crate::events::{Command, Effect, Event, HostEvent};
use crate::session::Session;
use crate::transport::{Catalog, Transport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Widget runtime: the session plus its collaborators.
///
/// Must be driven from inside a tokio runtime since effects are spawned
/// as tasks.
pub struct Widget {
    session: Session,
    transport: Option<Arc<dyn Transport>>,
    catalog: Option<Arc<dyn Catalog>>,
    host_tx: Option<mpsc::UnboundedSender<HostEvent>>,
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    outstanding: usize,
}

impl Widget {
    pub fn new(config: WidgetConfig) -> Result<Self, ConfigError> {
        let session = Session::new(config)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Ok(Self {
            session,
            transport: None,
            catalog: None,
            host_tx: None,
            event_tx,
            event_rx,
            outstanding: 0,
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        info!(transport = transport.name(), "Transport attached");
        self.transport = Some(transport);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Publish host notifications on the given channel.
    pub fn with_host_events(mut self, tx: mpsc::UnboundedSender<HostEvent>) -> Self {
        self.host_tx = Some(tx);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of spawned tasks whose completion has not been handled yet
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Apply a command and start whatever work it produces.
    pub fn apply(&mut self, command: Command) {
        if matches!(command, Command::Send) && self.transport.is_none() {
            warn!("No transport configured, send skipped");
            return;
        }
        let effects = self.session.handle(command);
        self.dispatch(effects);
    }

    /// Feed one completion back into the session.
    pub fn handle_event(&mut self, event: Event) {
        self.outstanding = self.outstanding.saturating_sub(1);
        let effects = self.session.handle_event(event);
        self.dispatch(effects);
    }

    /// Wait for the next completion and apply it. Returns false when
    /// nothing is outstanding.
    pub async fn next_event(&mut self) -> bool {
        if self.outstanding == 0 {
            return false;
        }
        match self.event_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Drive completions until no spawned work remains, including
    /// follow-ups and timers scheduled along the way.
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    /// Process host commands and completions until the command channel
    /// closes and all outstanding work has drained.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        let mut commands_open = true;
        loop {
            if !commands_open && self.outstanding == 0 {
                break;
            }
            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                },
                Some(event) = self.event_rx.recv(), if self.outstanding > 0 => {
                    self.handle_event(event);
                }
                else => break,
            }
        }
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.perform(effect);
        }
    }

    fn notify(&self, event: HostEvent) {
        if let Some(tx) = &self.host_tx {
            if tx.send(event).is_err() {
                debug!("Host event receiver dropped");
            }
        }
    }

    fn perform(&mut self, effect: Effect) {
        let tx = self.event_tx.clone();

        match effect {
            Effect::Notify(event) => {
                self.notify(event);
                return;
            }
            Effect::Transmit { ticket, message } => {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    let result = match transport {
                        Some(transport) => transport.send(&message).await,
                        None => Err(TransportError::Connection(
                            "no transport configured".into(),
                        )),
                    };
                    let _ = tx.send(Event::Reply { ticket, result });
                });
            }
            Effect::FetchSegments { generation } => {
                let catalog = self.catalog.clone();
                tokio::spawn(async move {
                    let result = match catalog {
                        Some(catalog) => catalog.fetch_segments().await,
                        None => Err(no_catalog()),
                    };
                    let _ = tx.send(Event::Segments { generation, result });
                });
            }
            Effect::FetchProducts {
                generation,
                segment,
            } => {
                let catalog = self.catalog.clone();
                tokio::spawn(async move {
                    let result = match catalog {
                        Some(catalog) => catalog.fetch_products(&segment).await,
                        None => Err(no_catalog()),
                    };
                    let _ = tx.send(Event::Products {
                        generation,
                        segment,
                        result,
                    });
                });
            }
            Effect::FetchDetail { generation, code } => {
                let catalog = self.catalog.clone();
                tokio::spawn(async move {
                    let result = match catalog {
                        Some(catalog) => catalog.fetch_product_detail(&code).await,
                        None => Err(no_catalog()),
                    };
                    let _ = tx.send(Event::Detail { generation, result });
                });
            }
            Effect::Schedule { after, timer } => {
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Event::TimerFired(timer));
                });
            }
        }
        self.outstanding += 1;
    }
}

fn no_catalog() -> TransportError {
    TransportError::Connection("no catalog configured".into())
}
