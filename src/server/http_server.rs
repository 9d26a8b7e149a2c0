use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Header slots per request; generous enough for proxy-heavy traffic.
const MAX_HEADERS: usize = 32;

/// Listener running a [`HttpService`] on `may` coroutines
///
/// Wraps `may_minihttp`'s header-bounded server so callers only deal with a
/// service value and an address. Each accepted connection is served on its
/// own coroutine, sized by the `may` configuration applied at startup.
pub struct HttpServer<T>(pub T);

/// Handle to a running server
///
/// Owns the accept coroutine. Dropping the handle leaves the server
/// running; call [`ServerHandle::stop`] to shut it down or
/// [`ServerHandle::join`] to block on it.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener was bound to
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the listener to accept connections
    ///
    /// Polls the bound address with plain TCP connects. Tests call this
    /// before sending their first request so they never race the accept
    /// loop.
    ///
    /// # Returns
    ///
    /// `Ok(())` once a connection succeeds
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the listener is not reachable within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        self.wait_ready_timeout(Duration::from_millis(250))
    }

    /// Wait for the listener with an explicit deadline
    ///
    /// Same polling as [`ServerHandle::wait_ready`], retrying every 5ms
    /// until `timeout` has elapsed.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound on the total wait
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the listener is not reachable before the deadline.
    pub fn wait_ready_timeout(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"));
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Stop the server
    ///
    /// Cancels the accept coroutine and waits for it to finish. Connections
    /// already being served finish on their own coroutines. Consumes the
    /// handle, so no further operations are possible.
    pub fn stop(self) {
        // SAFETY: may marks coroutine cancellation unsafe.
        // - `self` is consumed, so the handle and its coroutine are still valid
        //   and nothing else can cancel or join them
        // - the coroutine only runs the accept loop, which holds no state that
        //   needs unwinding beyond the listener socket
        // - the join below waits for cancellation to complete
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
        info!(addr = %self.addr, "Server stopped");
    }

    /// Block until the server coroutine exits
    ///
    /// The accept loop runs until the process ends or the coroutine is
    /// cancelled, so this is what the `serve` command parks on.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the coroutine finished normally
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind an address and start serving
    ///
    /// Only the first address `addr` resolves to is used.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind (e.g. `"0.0.0.0:9081"` or `"127.0.0.1:0"`)
    ///
    /// # Returns
    ///
    /// A [`ServerHandle`] for the running accept loop
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `addr` resolves to nothing, or the bind
    /// error if the port cannot be taken.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = HttpServerWithHeaders::<_, MAX_HEADERS>(self.0).start(addr)?;
        info!(addr = %addr, max_headers = MAX_HEADERS, "Server listening");
        Ok(ServerHandle { addr, handle })
    }
}
