//! Logging macros.

/// Evaluates the given expression and logs the formatted message at the given
/// [`log::Level`] together with the elapsed wall time. Nothing is timed when
/// the level is disabled.
macro_rules! log_elapsed {
    ($level:expr, $message:literal $(, $arg:expr)*; $expression:expr) => {{
        if ::log::log_enabled!($level) {
            let start_time = ::std::time::Instant::now();
            let result = $expression;
            ::log::log!(
                $level,
                concat!($message, " ({:.2} ms)")$(, $arg)*,
                start_time.elapsed().as_secs_f64() * 1e3
            );
            result
        } else {
            $expression
        }
    }};
}
