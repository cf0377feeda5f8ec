//! Process-wide terminal restoration registry.
//!
//! Every live tty device registers the state needed to put its
//! terminal back the way it was found. A single `atexit` hook walks
//! the registry so the shell is usable even when the application never
//! reached `dispose`. Restoration is idempotent: the saved settings
//! are consumed by whichever path runs first.

use std::collections::HashMap;
use std::io::Write;
use std::os::fd::RawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once, OnceLock};

use tracing::error;

use crate::tty::run_stty_restore;

/// Original terminal settings, captured before raw mode.
pub(crate) enum SavedSettings {
    Termios { fd: RawFd, termios: libc::termios },
    Stty { command: PathBuf, state: String },
}

/// Everything needed to restore one terminal.
pub(crate) struct RestoreState {
    out_fd: RawFd,
    saved: Mutex<Option<SavedSettings>>,
    /// Whether the device currently has the alternate screen active;
    /// flipped by the device as it enters and leaves.
    pub(crate) in_alternate: AtomicBool,
    /// Whether the device currently has the cursor hidden.
    pub(crate) cursor_hidden: AtomicBool,
}

impl RestoreState {
    pub(crate) fn new(out_fd: RawFd) -> Self {
        Self {
            out_fd,
            saved: Mutex::new(None),
            in_alternate: AtomicBool::new(false),
            cursor_hidden: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock_saved(&self) -> MutexGuard<'_, Option<SavedSettings>> {
        match self.saved.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Undo raw mode. Consumes the saved settings, so a second call is
    /// a no-op.
    pub(crate) fn restore_settings(&self) -> std::io::Result<()> {
        let Some(settings) = self.lock_saved().take() else {
            return Ok(());
        };
        match settings {
            SavedSettings::Termios { fd, termios } => {
                if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw const termios) } != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            }
            SavedSettings::Stty { command, state } => run_stty_restore(&command, &state),
        }
    }

    /// Best-effort full restoration: screen state first, then the tty
    /// settings. Never panics; failures are logged.
    pub(crate) fn restore_all(&self) {
        let mut sequences = Vec::new();
        if self.in_alternate.swap(false, Ordering::SeqCst) {
            sequences.extend_from_slice(b"\x1B[0m\x1B[?1049l");
        }
        if self.cursor_hidden.swap(false, Ordering::SeqCst) {
            sequences.extend_from_slice(b"\x1B[?25h");
        }
        if !sequences.is_empty() {
            let mut out = FdWriter(self.out_fd);
            let _ = out.write_all(&sequences);
        }
        if let Err(err) = self.restore_settings() {
            error!(%err, "failed to restore terminal settings");
        }
    }
}

/// Minimal writer over a raw fd, used where no buffered handle is
/// available (the exit hook).
struct FdWriter(RawFd);

impl Write for FdWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = unsafe { libc::write(self.0, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(std::io::Error::last_os_error());
        }
        usize::try_from(n).map_err(|_| std::io::Error::other("negative write count"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Registration handle; revoked on device dispose.
pub(crate) struct RestoreToken(u64);

static REGISTRY: OnceLock<Mutex<HashMap<u64, Arc<RestoreState>>>> = OnceLock::new();
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);
static INSTALL_HOOK: Once = Once::new();

fn registry() -> &'static Mutex<HashMap<u64, Arc<RestoreState>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

extern "C" fn restore_all_at_exit() {
    let Some(registry) = REGISTRY.get() else {
        return;
    };
    // Entries are left in place: restoration consumes the saved
    // settings, so a later dispose finds nothing left to do.
    let Ok(entries) = registry.try_lock() else {
        return;
    };
    for state in entries.values() {
        state.restore_all();
    }
}

/// Put `state` under the protection of the exit hook.
pub(crate) fn register(state: &Arc<RestoreState>) -> RestoreToken {
    INSTALL_HOOK.call_once(|| unsafe {
        libc::atexit(restore_all_at_exit);
    });
    let token = NEXT_TOKEN.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut entries) = registry().lock() {
        entries.insert(token, Arc::clone(state));
    }
    RestoreToken(token)
}

/// Revoke a registration made with [`register`].
pub(crate) fn unregister(token: &RestoreToken) {
    if let Ok(mut entries) = registry().lock() {
        entries.remove(&token.0);
    }
}
