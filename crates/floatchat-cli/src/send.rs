// ABOUTME: Non-interactive send command for scripting.
// ABOUTME: Sends one message, prints the assistant's reply to stdout.

use crate::attach::attachment_from_path;
use crate::chat::build_widget;
use anyhow::{bail, Context, Result};
use floatchat_core::{Command, Config, DefaultOption};
use std::path::PathBuf;
use tracing::debug;

pub struct SendArgs {
    pub message: String,
    pub option: Option<DefaultOption>,
    pub attachments: Vec<PathBuf>,
}

pub async fn run(mut config: Config, offline: bool, args: SendArgs) -> Result<()> {
    // No one is watching the prompt, so don't wait for it
    config.widget.timings.prompt_delay_ms = 0;
    let mut widget = build_widget(&config, offline)?;

    if let Some(option) = args.option {
        widget.apply(Command::SelectOption(option));
        widget.settle().await;
        debug!(context = %widget.session().context(), "Context selected");
    }

    if !args.attachments.is_empty() {
        let mut files = Vec::with_capacity(args.attachments.len());
        for path in &args.attachments {
            files.push(attachment_from_path(path).await?);
        }
        widget.apply(Command::SetAttachmentEnabled(true));
        widget.apply(Command::StageFiles(files));

        let report = widget.session().last_stage_report();
        if !report.rejected.is_empty() {
            let reasons: Vec<String> = report.rejected.iter().map(|r| r.to_string()).collect();
            bail!("Attachments rejected: {}", reasons.join("; "));
        }
    }

    widget.apply(Command::SetInput(args.message));
    if !widget.session().can_send() {
        bail!("Nothing to send: the message is empty and no files were attached");
    }
    widget.apply(Command::Send);
    widget.settle().await;

    let reply = widget
        .session()
        .store()
        .last()
        .context("Transcript is empty after sending")?;
    if reply.flags.is_error {
        bail!("{} (run with -v for details)", reply.content);
    }
    println!("{}", reply.content);

    if widget.session().attachments_enabled() {
        eprintln!("The assistant is asking for documents; resend with --attach <path>.");
    }
    Ok(())
}
