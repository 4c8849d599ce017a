//! Terminal prompt
//!
//! In prompt mode the terminal shows a short greeting and waits for a single
//! key: stream logs, open the legacy terminal UI, open the browser or toggle
//! local metrics.
//!
//! Keys are read on a blocking thread and handed to an async task one at a
//! time. The reader waits for the handler's verdict before reading again, so
//! it stops touching the terminal as soon as the user switches modes.

use super::MetricsModeController;
use crate::analytics::{tags, Analytics, Tags};
use crate::utils::browser::UrlOpener;
use crate::utils::terminal_input::{Key, OpenInput, TerminalInput};
use crossterm::style::Stylize;
use devloop_store::patterns::OneShot;
use devloop_store::state::TerminalMode;
use devloop_store::{Action, ChangeSummary, StoreHandle, Subscriber};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// How long a single read waits before checking for cancellation
const READ_POLL: Duration = Duration::from_millis(100);

pub type Stdout = Arc<Mutex<Box<dyn Write + Send>>>;

type SharedInput = Arc<Mutex<Option<Box<dyn TerminalInput>>>>;

/// Stdout shared by the prompt and its key handler
///
/// A failing terminal doesn't stop the prompt; the first error is logged.
#[derive(Clone)]
struct Output {
    out: Stdout,
    failed: Arc<AtomicBool>,
}

impl Output {
    fn new(out: Stdout) -> Self {
        Self {
            out,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn write(&self, text: &str) {
        let mut out = lock(&self.out);
        let result = out
            .write_all(text.as_bytes())
            .and_then(|()| out.flush());
        if let Err(e) = result {
            if !self.failed.swap(true, Ordering::SeqCst) {
                log::debug!("Writing to the terminal: {}", e);
            }
        }
    }
}

/// A key waiting for the handler; `stop` tells the reader whether to quit
struct KeyMessage {
    key: Key,
    stop: oneshot::Sender<bool>,
}

pub struct TerminalPrompt {
    analytics: Arc<Analytics>,
    open_input: OpenInput,
    opener: Arc<dyn UrlOpener>,
    out: Output,
    host: String,
    url: String,
    metrics: Option<MetricsModeController>,
    printed: OneShot,
    input: SharedInput,
}

impl TerminalPrompt {
    pub fn new(
        analytics: Arc<Analytics>,
        open_input: OpenInput,
        opener: Arc<dyn UrlOpener>,
        stdout: Stdout,
        host: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            analytics,
            open_input,
            opener,
            out: Output::new(stdout),
            host: host.into(),
            url: url.into(),
            metrics: None,
            printed: OneShot::new(),
            input: Arc::new(Mutex::new(None)),
        }
    }

    /// Let the `m` key switch the local metrics stack on and off
    pub fn with_metrics(mut self, metrics: MetricsModeController) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn print_greeting(&self, build_stamp: &str) {
        let mut text = format!(
            "{}\n{}\n\n",
            start_status_line(&self.url, &self.host),
            build_stamp
        );
        if !self.url.is_empty() {
            text.push_str("(space) to open the browser\n");
        }
        text.push_str("(s) to stream logs (--stream=true)\n");
        text.push_str("(t) to open legacy terminal mode (--legacy=true)\n");
        if self.metrics.is_some() {
            text.push_str("(m) to toggle local metrics\n");
        }
        text.push_str("(ctrl-c) to exit\n");
        self.out.write(&text);
    }
}

impl Subscriber for TerminalPrompt {
    fn on_change(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        _summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        let (enabled, build_stamp) = {
            let state = store.read_state();
            (
                state.terminal_mode == TerminalMode::Prompt,
                state.build_info.human_stamp(),
            )
        };
        if !enabled || !self.printed.claim() {
            return Ok(());
        }

        self.print_greeting(&build_stamp);

        let term = match (self.open_input)() {
            Ok(term) => term,
            Err(e) => {
                store.dispatch(Action::error(format!(
                    "Failed to open terminal input: {:#}",
                    e
                )));
                return Ok(());
            }
        };
        *lock(&self.input) = Some(term);

        let (key_tx, key_rx) = mpsc::unbounded_channel();
        {
            let ctx = ctx.clone();
            let store = store.clone();
            let input = self.input.clone();
            tokio::task::spawn_blocking(move || read_keys(ctx, store, input, key_tx));
        }

        let handler = KeyHandler {
            analytics: self.analytics.clone(),
            opener: self.opener.clone(),
            out: self.out.clone(),
            url: self.url.clone(),
            metrics: self.metrics.clone(),
        };
        tokio::spawn(handler.run(ctx.clone(), store.clone(), key_rx));
        Ok(())
    }

    fn tear_down(&mut self) {
        close_input(&self.input);
    }
}

struct KeyHandler {
    analytics: Arc<Analytics>,
    opener: Arc<dyn UrlOpener>,
    out: Output,
    url: String,
    metrics: Option<MetricsModeController>,
}

impl KeyHandler {
    async fn run(
        self,
        ctx: CancellationToken,
        store: StoreHandle,
        mut keys: mpsc::UnboundedReceiver<KeyMessage>,
    ) {
        loop {
            let msg = tokio::select! {
                _ = ctx.cancelled() => return,
                msg = keys.recv() => match msg {
                    Some(msg) => msg,
                    None => return,
                },
            };
            let stop = self.handle(&ctx, &store, msg.key).await;
            let _ = msg.stop.send(stop);
            if stop {
                return;
            }
        }
    }

    /// Returns true when the prompt is done reading keys
    async fn handle(&self, ctx: &CancellationToken, store: &StoreHandle, key: Key) -> bool {
        match key {
            Key::Char('s') => {
                self.switch(store, TerminalMode::Stream, "stream");
                true
            }
            Key::Char('t' | 'h') => {
                self.switch(store, TerminalMode::Hud, "hud");
                true
            }
            Key::Char(' ') if !self.url.is_empty() => {
                self.analytics.incr("ui.prompt.browser", Tags::new());
                self.print(&format!("Opening browser: {}", self.url));
                store.dispatch(Action::OpenBrowser(self.url.clone()));
                if let Err(e) = self.opener.open(&self.url).await {
                    self.print(&format!("Error: {:#}", e));
                }
                false
            }
            Key::Char('m') => {
                if let Some(metrics) = &self.metrics {
                    match metrics.toggle_local(store) {
                        Ok(mode) => {
                            self.analytics
                                .incr("ui.prompt.metrics", tags([("mode", mode.to_string())]));
                            self.print(&format!("Metrics: {}", mode));
                        }
                        Err(e) => self.print(&format!("Error: {:#}", e)),
                    }
                }
                false
            }
            Key::Interrupt => {
                ctx.cancel();
                true
            }
            Key::Char(_) => false,
        }
    }

    fn switch(&self, store: &StoreHandle, mode: TerminalMode, kind: &str) {
        self.analytics
            .incr("ui.prompt.switch", tags([("type", kind.to_string())]));
        store.dispatch(Action::SwitchTerminalMode(mode));
    }

    /// The terminal is in raw mode here, so lines need an explicit return
    fn print(&self, line: &str) {
        self.out.write(&format!("{}\r\n", line));
    }
}

/// Blocking loop feeding keys to the handler until it says stop
fn read_keys(
    ctx: CancellationToken,
    store: StoreHandle,
    input: SharedInput,
    keys: mpsc::UnboundedSender<KeyMessage>,
) {
    while !ctx.is_cancelled() {
        let read = match lock(&input).as_mut() {
            Some(term) => term.read_key(READ_POLL),
            // closed by tear down
            None => break,
        };
        match read {
            Ok(None) => {}
            Ok(Some(key)) => {
                let (stop, verdict) = oneshot::channel();
                if keys.send(KeyMessage { key, stop }).is_err() {
                    break;
                }
                if verdict.blocking_recv().unwrap_or(true) {
                    break;
                }
            }
            Err(e) => {
                if !ctx.is_cancelled() {
                    store.dispatch(Action::error(format!(
                        "Failed to read terminal input: {:#}",
                        e
                    )));
                }
                break;
            }
        }
    }
    close_input(&input);
}

/// Close the terminal input; only the first call does anything
fn close_input(input: &Mutex<Option<Box<dyn TerminalInput>>>) {
    let term = lock(input).take();
    if let Some(mut term) = term {
        if let Err(e) = term.close() {
            log::debug!("Closing terminal input: {:#}", e);
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// First line of the greeting, in green
pub fn start_status_line(url: &str, host: &str) -> String {
    let server_status = if url.is_empty() {
        "(without browser UI)".to_string()
    } else if host == "0.0.0.0" {
        format!("on {} (listening on 0.0.0.0)", url)
    } else {
        format!("on {}", url)
    };
    format!("devloop started {}", server_status)
        .green()
        .to_string()
}
