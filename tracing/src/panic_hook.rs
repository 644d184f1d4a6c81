//! Saves the buffered events of loggers when the process panics
use crate::logger::Logger;
use std::io::Write;
use std::panic::{PanicHookInfo, take_hook};
use std::sync::{Arc, Mutex, Once, PoisonError, Weak};

static LOGGERS: Mutex<Vec<Weak<Logger>>> = Mutex::new(Vec::new());

fn flush_registered_loggers() {
    let loggers = LOGGERS.lock().unwrap_or_else(PoisonError::into_inner);
    for logger in loggers.iter().filter_map(Weak::upgrade) {
        if let Err(e) = logger.try_flush() {
            log::error!("cannot save {} log: {e}", logger.side());
        }
    }
}

/// Registers `logger` to be flushed on panic. Every registered logger still alive is
/// flushed, then the hook that was installed before the first call runs.
pub fn init_panic_hook(logger: &Arc<Logger>) {
    type BoxedHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;
    static PREVIOUS_HOOK: Mutex<Option<BoxedHook>> = Mutex::new(None);
    static INSTALL: Once = Once::new();

    {
        let mut loggers = LOGGERS.lock().unwrap_or_else(PoisonError::into_inner);
        loggers.retain(|weak| weak.strong_count() > 0);
        loggers.push(Arc::downgrade(logger));
    }

    INSTALL.call_once(|| {
        *PREVIOUS_HOOK.lock().unwrap_or_else(PoisonError::into_inner) = Some(take_hook());
        std::panic::set_hook(Box::new(|panic_info| {
            log::error!("panic: {panic_info}");
            flush_registered_loggers();
            if let Ok(guard) = PREVIOUS_HOOK.lock()
                && let Some(hook) = guard.as_ref()
            {
                let _ = std::io::stdout().flush();
                hook(panic_info);
            }
        }));
    });
}
