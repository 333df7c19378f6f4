use std::io;

/// Waits for a signal that requests a graceful shutdown, SIGTERM or SIGINT.
#[cfg(unix)]
async fn wait_for_signal_impl() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        _ = interrupt.recv() => "SIGINT",
    })
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_signal_impl() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}

/// Registers the handlers and resolves with the name of the first signal.
pub(crate) async fn wait_for_stop_signal() -> io::Result<&'static str> {
    wait_for_signal_impl().await
}
