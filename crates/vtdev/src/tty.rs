//! Unix tty plumbing: raw mode, readiness-based input, size queries.

use std::io;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use vtgrid::Size;
use vtkeys::InputSource;

use crate::error::TermError;
use crate::restore::{RestoreState, SavedSettings};

/// Raw-mode lifecycle of one tty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TtyState {
    Cooked,
    /// Original settings captured, terminal still cooked.
    Saved,
    Raw,
    Disposed,
}

/// Puts a tty into raw mode and guarantees restoration.
///
/// The saved settings live in the shared [`RestoreState`] so that the
/// process-exit hook can restore them even if `release` is never
/// called. Restoring twice is safe: the first restore consumes the
/// saved settings.
pub(crate) struct RawMode {
    fd: RawFd,
    state: TtyState,
    restore: Arc<RestoreState>,
}

impl RawMode {
    /// Walk `Cooked -> Saved -> Raw`.
    pub(crate) fn acquire(
        fd: RawFd,
        restore: Arc<RestoreState>,
        stty_override: Option<&Path>,
        catch_special_characters: bool,
    ) -> Result<Self, TermError> {
        let mut mode = Self {
            fd,
            state: TtyState::Cooked,
            restore,
        };
        match stty_override {
            Some(command) => mode.acquire_via_stty(command, catch_special_characters)?,
            None => mode.acquire_via_termios(catch_special_characters)?,
        }
        Ok(mode)
    }

    fn acquire_via_termios(&mut self, catch_special_characters: bool) -> Result<(), TermError> {
        let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
        if unsafe { libc::tcgetattr(self.fd, &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        self.save(SavedSettings::Termios {
            fd: self.fd,
            termios,
        });
        self.state = TtyState::Saved;

        termios.c_iflag &= !(libc::IXON | libc::ICRNL | libc::INLCR | libc::ISTRIP);
        termios.c_oflag &= !libc::OPOST;
        termios.c_lflag &= !(libc::ICANON | libc::ECHO);
        if catch_special_characters {
            termios.c_lflag &= !libc::ISIG;
        }
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &raw const termios) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        self.state = TtyState::Raw;
        Ok(())
    }

    fn acquire_via_stty(
        &mut self,
        command: &Path,
        catch_special_characters: bool,
    ) -> Result<(), TermError> {
        let saved = run_stty(command, &["-g"])?;
        self.save(SavedSettings::Stty {
            command: command.to_path_buf(),
            state: saved.trim().to_string(),
        });
        self.state = TtyState::Saved;

        let mut args = vec!["-icanon", "-echo", "-ixon", "-icrnl"];
        if catch_special_characters {
            args.push("-isig");
        }
        run_stty(command, &args)?;
        self.state = TtyState::Raw;
        Ok(())
    }

    fn save(&mut self, settings: SavedSettings) {
        *self.restore.lock_saved() = Some(settings);
    }

    /// Walk `Raw -> Disposed`, restoring the saved settings.
    pub(crate) fn release(&mut self) -> Result<(), TermError> {
        if self.state == TtyState::Disposed {
            return Ok(());
        }
        self.state = TtyState::Disposed;
        self.restore.restore_settings()?;
        Ok(())
    }
}

/// Run the (overridden) stty binary against the controlling terminal.
fn run_stty(command: &Path, args: &[&str]) -> Result<String, TermError> {
    let output = Command::new(command)
        .args(args)
        .stdin(Stdio::inherit())
        .output()
        .map_err(TermError::Io)?;
    if !output.status.success() {
        return Err(TermError::InvalidState("stty command failed"));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Restore a tty from an stty-captured state string.
pub(crate) fn run_stty_restore(command: &PathBuf, state: &str) -> io::Result<()> {
    let status = Command::new(command)
        .arg(state)
        .stdin(Stdio::inherit())
        .status()?;
    if !status.success() {
        return Err(io::Error::other("stty restore failed"));
    }
    Ok(())
}

/// The read half of a tty, with `poll(2)`-based readiness.
pub struct TtyInput {
    fd: RawFd,
}

impl TtyInput {
    #[must_use]
    pub const fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl InputSource for TtyInput {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        usize::try_from(n).map_err(|_| io::Error::other("negative read count"))
    }

    fn poll_ready(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let n = unsafe { libc::poll(&raw mut fds, 1, millis) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(n > 0)
    }
}

/// Ask the kernel for the window size of `fd`.
pub(crate) fn query_tty_size(fd: RawFd) -> io::Result<Size> {
    let mut winsize = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut winsize) } != 0 {
        return Err(io::Error::last_os_error());
    }
    if winsize.ws_col == 0 || winsize.ws_row == 0 {
        debug!("kernel reported a zero-sized terminal");
        return Err(io::Error::other("zero-sized terminal"));
    }
    Ok(Size::new(winsize.ws_col, winsize.ws_row))
}

/// Whether `fd` refers to a terminal.
#[must_use]
pub(crate) fn is_tty(fd: RawFd) -> bool {
    unsafe { libc::isatty(fd) == 1 }
}
