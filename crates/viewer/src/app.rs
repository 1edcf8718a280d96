use std::io;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::Event;
use dronewatch_link::TelemetryLink;
use futures_util::{Stream, StreamExt};
use ratatui::{backend::Backend, Terminal};
use tracing::info;

use crate::controller::{Control, Controller};
use crate::ui;

/// Drive the view until the user quits or a frame fails under the `fail`
/// policy. The link is released on every way out of the loop.
pub async fn run<B, K>(
    terminal: &mut Terminal<B>,
    mut link: TelemetryLink,
    mut ctl: Controller,
    mut keys: K,
) -> Result<()>
where
    B: Backend,
    K: Stream<Item = io::Result<Event>> + Unpin,
{
    ctl.mount();
    info!(endpoint = %link.endpoint(), "telemetry view mounted");

    let outcome = match terminal.draw(|f| ui::draw(f, ctl.view())) {
        Ok(_) => event_loop(terminal, &mut link, &mut ctl, &mut keys).await,
        Err(e) => Err(e).context("initial draw failed"),
    };

    ctl.teardown();
    link.close().await;
    info!(samples = ctl.view().samples_applied(), "telemetry view unmounted");
    outcome
}

async fn event_loop<B, K>(
    terminal: &mut Terminal<B>,
    link: &mut TelemetryLink,
    ctl: &mut Controller,
    keys: &mut K,
) -> Result<()>
where
    B: Backend,
    K: Stream<Item = io::Result<Event>> + Unpin,
{
    loop {
        let control = tokio::select! {
            event = link.recv(), if ctl.view().is_connected() => {
                ctl.on_link_event(event, Utc::now()).context("malformed telemetry frame")?
            }
            key = keys.next() => match key {
                Some(Ok(Event::Key(key))) => ctl.on_key(key),
                Some(Ok(Event::Resize(..))) => Control::Redraw,
                Some(Ok(_)) => Control::Continue,
                Some(Err(e)) => return Err(e).context("terminal input failed"),
                None => Control::Quit,
            },
        };
        match control {
            Control::Quit => return Ok(()),
            Control::Redraw => {
                terminal.draw(|f| ui::draw(f, ctl.view())).context("draw failed")?;
            }
            Control::Continue => {}
        }
    }
}
