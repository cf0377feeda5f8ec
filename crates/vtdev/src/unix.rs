//! Ownership bundle for a device attached to the real tty.

use std::os::fd::RawFd;
use std::sync::Arc;

use vtkeys::{InputDecoder, InputSource};

use crate::ansi::ResizeWatcher;
use crate::config::DeviceConfig;
use crate::error::TermError;
use crate::restore::{self, RestoreState, RestoreToken};
use crate::terminal::SharedListeners;
use crate::tty::{RawMode, is_tty};

/// Raw mode, restore registration and the resize watcher of one tty.
pub(crate) struct TtyHandles {
    pub(crate) raw: RawMode,
    pub(crate) restore: Arc<RestoreState>,
    pub(crate) token: RestoreToken,
    pub(crate) out_fd: RawFd,
    watcher: Option<ResizeWatcher>,
}

impl TtyHandles {
    pub(crate) fn open(config: &DeviceConfig) -> Result<Self, TermError> {
        let out_fd = libc::STDOUT_FILENO;
        let in_fd = libc::STDIN_FILENO;
        if !is_tty(out_fd) && !is_tty(in_fd) {
            return Err(TermError::InvalidState("not attached to a terminal"));
        }
        let restore = Arc::new(RestoreState::new(out_fd));
        let raw = RawMode::acquire(
            in_fd,
            Arc::clone(&restore),
            config.stty_command_override.as_deref(),
            config.catch_special_characters,
        )?;
        let token = restore::register(&restore);
        Ok(Self {
            raw,
            restore,
            token,
            out_fd,
            watcher: None,
        })
    }

    pub(crate) fn start_watcher<S: InputSource + 'static>(
        &mut self,
        decoder: Arc<InputDecoder<S>>,
        listeners: SharedListeners,
    ) {
        self.watcher = Some(ResizeWatcher::spawn(self.out_fd, decoder, listeners));
    }

    pub(crate) fn stop_watcher(&mut self) {
        if let Some(watcher) = &mut self.watcher {
            watcher.stop();
        }
    }
}
