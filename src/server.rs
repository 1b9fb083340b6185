use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use socket2::SockRef;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::commands::{CommandSpec, COMMAND_TABLE};
use crate::config::{Config, DEFAULT_DB_NUM};
use crate::connection;
use crate::db::Db;
use crate::list::{NodeId, SyncList};
use crate::shared::Shared;
use crate::shutdown::Shutdown;
use crate::Error;

/// Counters exposed by the server. All of them are updated with relaxed
/// atomics from whatever task observes the event.
#[derive(Debug, Default)]
pub struct Stats {
    pub conn_count: AtomicU64,
    pub rejected_conn: AtomicU64,
    pub num_commands: AtomicU64,
    pub net_input_bytes: AtomicU64,
    pub net_output_bytes: AtomicU64,
}

/// Registry entry for a connected client. The session task holds the
/// [`NodeId`] returned at link time and removes itself with it on close.
#[derive(Debug)]
pub struct ClientEntry {
    pub id: u64,
    pub addr: String,
    pub created_at_ms: u64,
}

pub struct Server {
    pub config: Config,
    pub shared: Arc<Shared>,
    pub stats: Stats,
    dbs: Vec<Arc<Mutex<Db>>>,
    commands: HashMap<&'static str, &'static CommandSpec>,
    clients: SyncList<ClientEntry>,
    next_client_id: AtomicU64,
    // Cached clock, written only by the cron so command paths never pay a
    // syscall for "now".
    unix_time_ms: AtomicU64,
    lru_clock: AtomicU32,
    cron_count: AtomicU64,
    loading: AtomicBool,
}

impl Server {
    pub fn new(config: Config) -> Server {
        let dbs = (0..DEFAULT_DB_NUM)
            .map(|id| Arc::new(Mutex::new(Db::new(id))))
            .collect();
        let commands = COMMAND_TABLE.iter().map(|spec| (spec.name, spec)).collect();

        let server = Server {
            config,
            shared: Arc::new(Shared::new()),
            stats: Stats::default(),
            dbs,
            commands,
            clients: SyncList::new(),
            next_client_id: AtomicU64::new(0),
            unix_time_ms: AtomicU64::new(0),
            lru_clock: AtomicU32::new(0),
            cron_count: AtomicU64::new(0),
            loading: AtomicBool::new(false),
        };
        // Seed the cached clock so sessions created before the first cron
        // tick see a sane "now".
        server.refresh_clock();
        server
    }

    pub fn db(&self, index: usize) -> Option<Arc<Mutex<Db>>> {
        self.dbs.get(index).cloned()
    }

    pub fn db_count(&self) -> usize {
        self.dbs.len()
    }

    pub fn lookup_command(&self, name: &str) -> Option<&'static CommandSpec> {
        self.commands.get(name).copied()
    }

    /// Cached Unix time in milliseconds, refreshed by the cron.
    pub fn now_ms(&self) -> u64 {
        self.unix_time_ms.load(Ordering::Relaxed)
    }

    /// Cached coarse clock stamped onto objects on access.
    pub fn lru_clock(&self) -> u32 {
        self.lru_clock.load(Ordering::Relaxed)
    }

    pub fn cron_count(&self) -> u64 {
        self.cron_count.load(Ordering::Relaxed)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::Relaxed);
    }

    /// Eviction hook consulted before DENYOOM commands when a memory limit
    /// is configured. Policies are not part of the core; the stub always
    /// reports success.
    pub fn try_free_memory(&self) -> bool {
        true
    }

    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub(crate) fn link_client(&self, entry: ClientEntry) -> NodeId {
        let node = self.clients.push_back(entry);
        self.stats.conn_count.fetch_add(1, Ordering::Relaxed);
        node
    }

    pub(crate) fn unlink_client(&self, node: NodeId) {
        if self.clients.remove(node).is_some() {
            self.stats.conn_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn refresh_clock(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        self.unix_time_ms
            .store(now.as_millis() as u64, Ordering::Relaxed);
        self.lru_clock
            .store(now.as_secs() as u32, Ordering::Relaxed);
    }
}

/// Run a server until the `shutdown` future completes, then close every
/// listener and session, wait for them to drain, and clean up the PID file
/// and Unix socket. Startup failures (invalid config, PID conflict, bind
/// errors) return an error without serving anything.
pub async fn run(config: Config, shutdown: impl Future) -> crate::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(config.tracing_level()?)
        .try_init()
        .map_err(|e| debug!("failed to initialize global tracing: {}", e));

    config.validate()?;

    let pidfile = config.pidfile_path();
    acquire_pid_file(&pidfile)?;

    let server = Arc::new(Server::new(config));

    // Bind everything before spawning anything, so a failed bind is a
    // clean startup error.
    let mut tcp_listeners = Vec::new();
    for addr in server.config.listen_addrs() {
        match TcpListener::bind((addr.as_str(), server.config.port)).await {
            Ok(listener) => {
                info!("listening on {}:{}", addr, server.config.port);
                tcp_listeners.push(listener);
            }
            Err(err) => {
                let _ = std::fs::remove_file(&pidfile);
                return Err(format!("failed to bind {}:{}: {err}", addr, server.config.port).into());
            }
        }
    }

    let unix_listener = match server.config.unixsocket_path() {
        Some(path) => {
            // A previous unclean exit may have left the socket inode behind.
            let _ = std::fs::remove_file(&path);
            match UnixListener::bind(&path) {
                Ok(listener) => {
                    info!("listening on unix socket {}", path.display());
                    Some((listener, path))
                }
                Err(err) => {
                    let _ = std::fs::remove_file(&pidfile);
                    return Err(format!("failed to bind {}: {err}", path.display()).into());
                }
            }
        }
        None => None,
    };

    let (notify_shutdown, _) = broadcast::channel(1);
    let (drain_tx, mut drain_rx) = mpsc::channel::<()>(1);

    for listener in tcp_listeners {
        tokio::spawn(tcp_acceptor(
            server.clone(),
            listener,
            notify_shutdown.clone(),
            drain_tx.clone(),
            Shutdown::new(notify_shutdown.subscribe()),
        ));
    }

    let unix_socket_path = match unix_listener {
        Some((listener, path)) => {
            tokio::spawn(unix_acceptor(
                server.clone(),
                listener,
                notify_shutdown.clone(),
                drain_tx.clone(),
                Shutdown::new(notify_shutdown.subscribe()),
            ));
            Some(path)
        }
        None => None,
    };

    tokio::spawn(cron(
        server.clone(),
        drain_tx.clone(),
        Shutdown::new(notify_shutdown.subscribe()),
    ));

    shutdown.await;
    info!("shutting down");

    // Broadcast the close signal. The acceptors hold sender clones (they
    // subscribe sessions), so an explicit send is what wakes everyone;
    // dropping our drain sender then lets recv() below complete once the
    // last task has dropped its clone.
    let _ = notify_shutdown.send(());
    drop(notify_shutdown);
    drop(drain_tx);
    let _ = drain_rx.recv().await;

    if let Some(path) = unix_socket_path {
        let _ = std::fs::remove_file(&path);
    }
    let _ = std::fs::remove_file(&pidfile);

    info!("shutdown complete");
    Ok(())
}

/// Refuse to start while a PID file from a live server exists, then claim
/// it for this process.
fn acquire_pid_file(path: &Path) -> Result<(), Error> {
    if let Ok(contents) = std::fs::read_to_string(path) {
        if let Ok(pid) = contents.trim().parse::<u32>() {
            return Err(format!(
                "a kiwi server is already running (pid file {} holds pid {pid})",
                path.display()
            )
            .into());
        }
    }
    std::fs::write(path, std::process::id().to_string())?;
    Ok(())
}

async fn tcp_acceptor(
    server: Arc<Server>,
    listener: TcpListener,
    notify: broadcast::Sender<()>,
    drain: mpsc::Sender<()>,
    mut shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("tcp acceptor stopped");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if server.config.tcp_keepalive {
                        if let Err(err) = SockRef::from(&stream).set_keepalive(true) {
                            warn!("failed to enable keepalive for {}: {}", peer, err);
                        }
                    }
                    let _ = stream.set_nodelay(true);
                    let loopback = peer.ip().is_loopback();
                    setup_session(
                        server.clone(),
                        stream,
                        peer.to_string(),
                        false,
                        loopback,
                        &notify,
                        &drain,
                    )
                    .await;
                }
                Err(err) => error!("tcp accept error: {}", err),
            }
        }
    }
}

async fn unix_acceptor(
    server: Arc<Server>,
    listener: UnixListener,
    notify: broadcast::Sender<()>,
    drain: mpsc::Sender<()>,
    mut shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("unix acceptor stopped");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    setup_session(
                        server.clone(),
                        stream,
                        "unix".to_string(),
                        true,
                        true,
                        &notify,
                        &drain,
                    )
                    .await;
                }
                Err(err) => error!("unix accept error: {}", err),
            }
        }
    }
}

/// Accept-time policy checks, then hand the stream to a session task.
async fn setup_session<S>(
    server: Arc<Server>,
    mut stream: S,
    addr: String,
    unix_socket: bool,
    loopback: bool,
    notify: &broadcast::Sender<()>,
    drain: &mpsc::Sender<()>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    use tokio::io::AsyncWriteExt;

    if server.client_count() as u64 >= server.config.maxclients {
        let _ = stream.write_all(&server.shared.max_clients_err).await;
        server.stats.rejected_conn.fetch_add(1, Ordering::Relaxed);
        info!(client = %addr, "connection rejected: maxclients reached");
        return;
    }

    if server.config.protected_mode
        && server.config.binds.is_empty()
        && server.config.requirepass.is_none()
        && !unix_socket
        && !loopback
    {
        let _ = stream.write_all(&server.shared.denied_err).await;
        server.stats.rejected_conn.fetch_add(1, Ordering::Relaxed);
        info!(client = %addr, "connection rejected: protected mode");
        return;
    }

    let shutdown = Shutdown::new(notify.subscribe());
    let drain = drain.clone();
    tokio::spawn(async move {
        connection::serve(server, stream, addr, unix_socket, shutdown).await;
        drop(drain);
    });
}

/// The periodic maintenance tick. Sole writer of the cached clock.
async fn cron(server: Arc<Server>, _drain: mpsc::Sender<()>, mut shutdown: Shutdown) {
    let period = Duration::from_millis(u64::from(1000 / server.config.hz).max(1));
    let mut ticker = time::interval(period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("cron stopped");
                return;
            }
            _ = ticker.tick() => {
                server.refresh_clock();
                server.cron_count.fetch_add(1, Ordering::Relaxed);
                server.try_free_memory();
            }
        }
    }
}
