use std::error::Error;

use crate::{
    level::LogLevel,
    sink::{FallbackSink, Sink},
};

/// The emit/drop decision. `Off` on either side always drops; otherwise an
/// event goes through when it is at least as severe as the effective level.
/// Pure comparison, no I/O and no locking.
pub fn should_emit(event: LogLevel, effective: LogLevel) -> bool {
    if event == LogLevel::Off || effective == LogLevel::Off {
        return false;
    }
    event >= effective
}

/// Hands an allowed event to the sink. A sink failure is absorbed: the
/// built-in [`FallbackSink`] gets one attempt, and if that fails too the
/// event is dropped. A broken sink must never take the host down.
pub(crate) fn emit(
    sink: &dyn Sink,
    caller: &str,
    level: LogLevel,
    message: Option<&str>,
    error: Option<&dyn Error>,
) {
    if sink.write(caller, level, message, error).is_err() {
        let _ = FallbackSink.write(caller, level, message, error);
    }
}
