//! SIGINT/SIGTERM handling for the binary.
//!
//! The first signal raises the cancel flag so delivery stops between chunks.
//! A second signal exits immediately.

use std::io;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use chat_session::CancelSignal;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::warn;

/// Exit status used when a second signal aborts the run.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Unregisters the handlers and joins the listener thread on drop.
pub struct CancelOnSignal {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for CancelOnSignal {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn cancel_on_signal(cancel: CancelSignal) -> io::Result<CancelOnSignal> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    let thread = thread::spawn(move || {
        for signal in signals.forever() {
            if cancel.swap(true, Ordering::AcqRel) {
                warn!(signal, "second interrupt; exiting now");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            warn!(signal, "interrupt received; stopping before the next chunk");
        }
    });

    Ok(CancelOnSignal {
        handle,
        thread: Some(thread),
    })
}
