use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::Event as TermEvent;

/// Everything the backend needs from the controlling terminal
///
/// The crossterm implementation talks to the real tty; tests substitute a
/// scripted one.
pub trait TerminalOps {
    /// Enter raw mode and the alternate screen
    fn setup(&mut self) -> io::Result<()>;

    /// Undo `setup`; keeps going when a step fails and reports the first error
    fn restore(&mut self) -> io::Result<()>;

    /// Current size as (cols, rows)
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Next raw event; `None` timeout blocks
    fn read_event(&mut self, timeout: Option<Duration>) -> io::Result<Option<TermEvent>>;

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()>;

    /// Write one composed frame and flush it
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct CrosstermOps;

impl TerminalOps for CrosstermOps {
    fn setup(&mut self) -> io::Result<()> {
        use crossterm::{
            cursor, execute,
            terminal::{enable_raw_mode, Clear, ClearType, EnterAlternateScreen},
        };

        enable_raw_mode()?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            cursor::Hide,
            Clear(ClearType::All)
        )?;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        use crossterm::{
            cursor,
            event::DisableMouseCapture,
            execute,
            style::ResetColor,
            terminal::{disable_raw_mode, LeaveAlternateScreen},
        };

        let mut first_err: Option<io::Error> = None;

        if let Err(err) = execute!(
            io::stdout(),
            DisableMouseCapture,
            ResetColor,
            cursor::Show,
            LeaveAlternateScreen
        ) {
            first_err.get_or_insert(err);
        }
        if let Err(err) = disable_raw_mode() {
            first_err.get_or_insert(err);
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    fn read_event(&mut self, timeout: Option<Duration>) -> io::Result<Option<TermEvent>> {
        match timeout {
            None => crossterm::event::read().map(Some),
            Some(timeout) => {
                if crossterm::event::poll(timeout)? {
                    crossterm::event::read().map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
        };

        if enabled {
            execute!(io::stdout(), EnableMouseCapture)
        } else {
            execute!(io::stdout(), DisableMouseCapture)
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(frame)?;
        out.flush()
    }
}

/// Owns the terminal ops and guarantees the terminal is restored at most once per setup
///
/// Dropping the guard restores the terminal, so a panic unwinding through the
/// renderer still leaves the user's shell usable.
pub struct TerminalGuard<O: TerminalOps> {
    ops: O,
    active: bool,
}

impl<O: TerminalOps> TerminalGuard<O> {
    pub fn new(ops: O) -> Self {
        Self { ops, active: false }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        if let Err(err) = self.ops.setup() {
            // Partial setup (raw mode without alternate screen) must not leak
            let _ = self.ops.restore();
            return Err(err);
        }
        self.active = true;
        Ok(())
    }

    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.ops.restore()
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn ops_mut(&mut self) -> &mut O {
        &mut self.ops
    }
}

impl<O: TerminalOps> Drop for TerminalGuard<O> {
    fn drop(&mut self) {
        if let Err(err) = self.leave() {
            log::warn!("failed to restore terminal: {}", err);
        }
    }
}
