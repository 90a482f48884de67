// ABOUTME: Interactive line-mode chat driving a Widget from stdin
// ABOUTME: Prints transcript updates, selection lists, and host notifications as they arrive

use crate::attach::attachment_from_path;
use crate::input::{Input, HELP};
use crate::render::{format_message, format_products, format_segments, format_staged, resolve_pick};
use anyhow::{Context, Result};
use floatchat_core::{
    CannedTransport, Command, Config, DefaultOption, HostEvent, Session, Visibility, Widget,
};
use floatchat_http::{HttpCatalog, HttpClient, HttpTransport};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

/// Build a widget wired to the configured endpoint, or to the canned
/// transport when offline.
pub fn build_widget(config: &Config, offline: bool) -> Result<Widget> {
    let widget = Widget::new(config.widget.clone()).context("Invalid widget configuration")?;
    if offline {
        info!("Running offline with canned replies");
        return Ok(widget.with_transport(Arc::new(CannedTransport::default())));
    }

    // Transport and catalog share one connection pool
    let client = HttpClient::new(&config.endpoint).context("Failed to create HTTP client")?;
    Ok(widget
        .with_transport(Arc::new(HttpTransport::from_client(client.clone())))
        .with_catalog(Arc::new(HttpCatalog::from_client(client))))
}

/// What has already been written to the terminal
#[derive(Debug, Default)]
struct View {
    printed: u64,
    dirty: bool,
    segments_shown: bool,
    products_shown: bool,
}

impl View {
    fn on_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::TranscriptChanged => self.dirty = true,
            HostEvent::TypingChanged(true) => println!("  ..."),
            HostEvent::TypingChanged(false) | HostEvent::FocusInput => {}
            HostEvent::UnreadChanged(true) => {
                println!("  * New message while closed. /open to read it.")
            }
            HostEvent::UnreadChanged(false) => {}
            HostEvent::AttachmentsEnabledChanged(true) => {
                println!("  Attachments enabled. Use /attach <path>, then /send.")
            }
            HostEvent::AttachmentsEnabledChanged(false) => println!("  Attachments disabled."),
            HostEvent::StagingWarnings(rejections) => {
                for rejection in rejections {
                    println!("  ! {}", rejection);
                }
            }
        }
    }

    /// Print unseen messages and freshly arrived choice lists, but only
    /// while the widget is open.
    fn refresh(&mut self, session: &Session) {
        if session.visibility() != Visibility::Open {
            return;
        }

        if self.dirty {
            self.dirty = false;
            let last = session.store().last().map(|m| m.id).unwrap_or(0);
            if last < self.printed {
                println!("-- conversation cleared --");
                self.printed = 0;
            }
            for message in session.messages().filter(|m| m.id > self.printed) {
                println!("{}", format_message(message));
            }
            self.printed = last;
        }

        match session.pending_segments() {
            Some(segments) if !self.segments_shown => {
                println!("{}", format_segments(segments));
                self.segments_shown = true;
            }
            Some(_) => {}
            None => self.segments_shown = false,
        }
        match session.pending_products() {
            Some(products) if !self.products_shown => {
                println!("{}", format_products(products));
                self.products_shown = true;
            }
            Some(_) => {}
            None => self.products_shown = false,
        }
    }
}

pub async fn run(config: Config, offline: bool) -> Result<()> {
    let (host_tx, mut host_rx) = mpsc::unbounded_channel();
    let mut widget = build_widget(&config, offline)?.with_host_events(host_tx);
    let mut view = View {
        dirty: true,
        ..View::default()
    };

    println!("{} - {}", config.widget.title, config.widget.subtitle);
    println!(
        "Quick options: {}  (/help for commands)",
        DefaultOption::ALL
            .iter()
            .map(|o| o.label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    widget.apply(Command::Open);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        while let Ok(event) = host_rx.try_recv() {
            view.on_host_event(event);
        }
        view.refresh(widget.session());

        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read input")? {
                    Some(line) => {
                        if !handle_line(&mut widget, &mut view, &line).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = widget.next_event(), if widget.outstanding() > 0 => {}
        }
    }

    info!("Chat session ended");
    Ok(())
}

/// Apply one line of input. Returns false when the user quits.
async fn handle_line(widget: &mut Widget, view: &mut View, line: &str) -> bool {
    match Input::parse(line) {
        Input::Text(text) => {
            widget.apply(Command::SetInput(text));
            if widget.session().can_send() {
                widget.apply(Command::Send);
            } else {
                println!("  Still waiting for the assistant, try again in a moment.");
            }
        }
        Input::SendStaged => {
            if widget.session().staged().is_empty() {
                println!("  Nothing staged.");
            } else {
                widget.apply(Command::SetInput(String::new()));
                widget.apply(Command::Send);
            }
        }
        Input::Option(option) => widget.apply(Command::SelectOption(option)),
        Input::Pick(choice) => match resolve_pick(widget.session(), &choice) {
            Some(command) => widget.apply(command),
            None => println!("  Nothing to pick matching {:?}.", choice),
        },
        Input::Attach(path) => match attachment_from_path(&path).await {
            Ok(attachment) => {
                widget.apply(Command::StageFiles(vec![attachment]));
                let report = widget.session().last_stage_report();
                println!(
                    "  {} staged, {} rejected.",
                    report.accepted,
                    report.rejected.len()
                );
            }
            Err(e) => println!("  ! {:#}", e),
        },
        Input::Remove(n) => {
            widget.apply(Command::RemoveFile(n - 1));
            println!("{}", format_staged(widget.session().staged()));
        }
        Input::Staged => println!("{}", format_staged(widget.session().staged())),
        Input::Open => {
            widget.apply(Command::Open);
            view.dirty = true;
        }
        Input::Close => widget.apply(Command::Close),
        Input::Clear => widget.apply(Command::Clear),
        Input::Help => println!("{}", HELP),
        Input::Quit => return false,
        Input::Nothing => {}
        Input::Unknown(what) => println!("  Unknown command: /{} (try /help)", what),
    }
    true
}
