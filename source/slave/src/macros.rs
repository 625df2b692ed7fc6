#[cfg(feature = "defmt-logging")]
macro_rules! rtu_log {
    (trace,   $($arg:expr),*) => { defmt::trace!($($arg),*) };
    (debug,   $($arg:expr),*) => { defmt::debug!($($arg),*) };
    (info,    $($arg:expr),*) => { defmt::info!($($arg),*) };
    (warn,    $($arg:expr),*) => { defmt::warn!($($arg),*) };
    (error,   $($arg:expr),*) => { defmt::error!($($arg),*) };
}

#[cfg(not(feature = "defmt-logging"))]
macro_rules! rtu_log {
    ($level:ident, $($arg:expr),*) => {{ $( let _ = &$arg; )* }}
}

macro_rules! rtu_trace {
    ($($arg:expr),*) => (rtu_log!(trace, $($arg),*));
}

macro_rules! rtu_debug {
    ($($arg:expr),*) => (rtu_log!(debug, $($arg),*));
}

macro_rules! rtu_info {
    ($($arg:expr),*) => (rtu_log!(info, $($arg),*));
}

macro_rules! rtu_warn {
    ($($arg:expr),*) => (rtu_log!(warn, $($arg),*));
}

macro_rules! rtu_error {
    ($($arg:expr),*) => (rtu_log!(error, $($arg),*));
}
