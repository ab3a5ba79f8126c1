use crate::runtime_config::{resolve_listen_address, ConfigSource};
use anyhow::Context;
use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Wrapper around may_minihttp's HTTP server
///
/// Uses 32 max headers (Standard) to handle modern API gateway/proxy traffic.
pub struct HttpServer<T>(pub T);

/// Handle to a running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the server address by attempting TCP connections until successful.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` error if the server doesn't become ready within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop the server gracefully
    ///
    /// Cancels the server coroutine and waits for it to finish.
    pub fn stop(self) {
        // SAFETY: may::CoroutineHandle::coroutine().cancel() is marked unsafe by the may runtime.
        // The handle is owned here and cancellation is the intended shutdown path.
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            warn!(addr = %self.addr, "server coroutine panicked during shutdown");
        }
    }

    /// Block until the server coroutine finishes.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Start the HTTP server on the given address
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = HttpServerWithHeaders::<_, 32>(self.0).start(addr)?;
        Ok(ServerHandle { addr, handle })
    }
}

/// Resolve the listen address from `source` and start serving `service`.
pub fn start<T>(source: &dyn ConfigSource, service: T) -> anyhow::Result<ServerHandle>
where
    T: HttpService + Clone + Send + Sync + 'static,
{
    let (host, port) = resolve_listen_address(source)?;
    info!("Starting server on {}:{}", host, port);
    let handle = HttpServer(service)
        .start((host.as_str(), port))
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    info!("Server listening on {}", handle.addr());
    Ok(handle)
}
