//! Raw keyboard input for the terminal prompt

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Ctrl-C; raw mode swallows the signal, so it arrives as a key
    Interrupt,
}

/// A source of key presses
pub trait TerminalInput: Send {
    /// Wait up to `timeout` for a key press
    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>>;

    fn close(&mut self) -> Result<()>;
}

/// Opens the terminal for reading
pub type OpenInput = Box<dyn Fn() -> Result<Box<dyn TerminalInput>> + Send>;

/// Terminal input through crossterm, in raw mode while open
#[derive(Debug)]
pub struct CrosstermInput {
    raw: bool,
}

impl CrosstermInput {
    pub fn open() -> Result<Box<dyn TerminalInput>> {
        terminal::enable_raw_mode().context("Failed to put terminal in raw mode")?;
        Ok(Box::new(Self { raw: true }))
    }
}

impl TerminalInput for CrosstermInput {
    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let key = match event::read()? {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(Key::Interrupt)
                }
                KeyCode::Char(c) => Some(Key::Char(c)),
                _ => None,
            },
            _ => None,
        };
        Ok(key)
    }

    fn close(&mut self) -> Result<()> {
        if std::mem::take(&mut self.raw) {
            terminal::disable_raw_mode().context("Failed to restore terminal")?;
        }
        Ok(())
    }
}

impl Drop for CrosstermInput {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{:#}", e);
        }
    }
}
