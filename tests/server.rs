use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use kiwi::config::Config;
use kiwi::server;

// Each test gets its own port and PID file so they can run in parallel.
static NEXT_PORT: AtomicU16 = AtomicU16::new(9961);

struct TestServer {
    port: u16,
    pidfile: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<kiwi::Result<()>>,
}

impl TestServer {
    async fn start() -> TestServer {
        TestServer::start_with(|_| {}).await
    }

    async fn start_with(f: impl FnOnce(&mut Config)) -> TestServer {
        let port = NEXT_PORT.fetch_add(1, Ordering::Relaxed);
        let pidfile =
            std::env::temp_dir().join(format!("kiwi-test-{}-{}.pid", std::process::id(), port));
        let _ = std::fs::remove_file(&pidfile);

        let mut config = Config::default();
        config.port = port;
        config.binds = vec!["127.0.0.1".to_string()];
        config.no_unixsocket = true;
        config.pidfile = Some(pidfile.clone());
        config.timeout = 60;
        f(&mut config);

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::run(config, async {
            let _ = rx.await;
        }));

        let server = TestServer {
            port,
            pidfile,
            shutdown: Some(tx),
            handle,
        };
        // Wait for the listener to come up. The probe session quits and
        // drains fully so it never counts against maxclients later.
        for _ in 0..100 {
            if let Ok(mut probe) = TcpStream::connect(("127.0.0.1", server.port)).await {
                let _ = probe.write_all(b"*1\r\n$4\r\nQUIT\r\n").await;
                let mut sink = [0u8; 64];
                while let Ok(n) = probe.read(&mut sink).await {
                    if n == 0 {
                        break;
                    }
                }
                return server;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("server did not start listening on port {}", server.port);
    }

    async fn connect(&self) -> TcpStream {
        TcpStream::connect(("127.0.0.1", self.port)).await.unwrap()
    }

    async fn stop(mut self) {
        self.shutdown.take().unwrap().send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

async fn expect(stream: &mut TcpStream, expected: &[u8]) {
    let mut buf = vec![0u8; expected.len()];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(
        buf,
        expected,
        "expected {:?}, got {:?}",
        String::from_utf8_lossy(expected),
        String::from_utf8_lossy(&buf)
    );
}

async fn expect_eof(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}

#[tokio::test]
async fn ping_inline() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"PING\n").await.unwrap();
    expect(&mut conn, b"+PONG\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn set_then_get() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"+OK\r\n").await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"$3\r\nbar\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn get_missing_key() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nnop\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"$-1\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn unknown_command() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*1\r\n$4\r\nNOPE\r\n").await.unwrap();
    expect(&mut conn, b"-ERR unknown command 'nope'\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn wrong_arity() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*1\r\n$3\r\nSET\r\n").await.unwrap();
    expect(&mut conn, b"-ERR wrong number of arguments for 'set' command\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn protocol_error_closes_the_connection() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*2\r\nfoo").await.unwrap();
    expect(&mut conn, b"-ERR Protocol error: expected '$', got 'f'\r\n").await;
    expect_eof(&mut conn).await;

    server.stop().await;
}

#[tokio::test]
async fn incr_keeps_integer_encoding() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\n10\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"+OK\r\n").await;

    conn.write_all(b"*2\r\n$4\r\nINCR\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut conn, b":11\r\n").await;

    conn.write_all(b"*2\r\n$4\r\nINCR\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut conn, b":12\r\n").await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"$2\r\n12\r\n").await;

    server.stop().await;
}

// A request split across several writes must parse exactly like one sent
// in a single write.
#[tokio::test]
async fn request_split_across_reads() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    for part in [
        &b"*3\r\n$3\r\nSE"[..],
        &b"T\r\n$5\r\nmyke"[..],
        &b"y\r\n$7\r\nmyvalue\r\n"[..],
    ] {
        conn.write_all(part).await.unwrap();
        conn.flush().await.unwrap();
        sleep(Duration::from_millis(20)).await;
    }
    expect(&mut conn, b"+OK\r\n").await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"$7\r\nmyvalue\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn pipelined_requests() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(
        b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n\
          *3\r\n$3\r\nSET\r\n$2\r\nk2\r\n$2\r\nv2\r\n\
          *2\r\n$3\r\nGET\r\n$2\r\nk1\r\n\
          *2\r\n$3\r\nGET\r\n$2\r\nk2\r\n",
    )
    .await
    .unwrap();

    expect(&mut conn, b"+OK\r\n+OK\r\n$2\r\nv1\r\n$2\r\nv2\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn quit_replies_then_closes() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*1\r\n$4\r\nQUIT\r\n").await.unwrap();
    expect(&mut conn, b"+OK\r\n").await;
    expect_eof(&mut conn).await;

    server.stop().await;
}

#[tokio::test]
async fn auth_gate() {
    let server =
        TestServer::start_with(|c| c.requirepass = Some("sesame".to_string())).await;
    let mut conn = server.connect().await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"-NOAUTH Authentication required.\r\n").await;

    conn.write_all(b"*2\r\n$4\r\nAUTH\r\n$5\r\nwrong\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"-ERR invalid password\r\n").await;

    conn.write_all(b"*2\r\n$4\r\nAUTH\r\n$6\r\nsesame\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"+OK\r\n").await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"$-1\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn select_switches_databases() {
    let server = TestServer::start().await;
    let mut conn = server.connect().await;

    conn.write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$3\r\ndb0\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"+OK\r\n").await;

    conn.write_all(b"*2\r\n$6\r\nSELECT\r\n$1\r\n1\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"+OK\r\n").await;

    conn.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await
        .unwrap();
    expect(&mut conn, b"$-1\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn maxclients_rejects_excess_connections() {
    let server = TestServer::start_with(|c| c.maxclients = 1).await;

    let mut first = server.connect().await;
    first.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
    expect(&mut first, b"+PONG\r\n").await;

    let mut second = server.connect().await;
    expect(&mut second, b"-ERR max number of clients reached\r\n").await;
    expect_eof(&mut second).await;

    // The first session keeps working.
    first.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
    expect(&mut first, b"+PONG\r\n").await;

    server.stop().await;
}

#[tokio::test]
async fn unix_socket_sessions() {
    let path = std::env::temp_dir().join(format!("kiwi-test-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let socket = path.clone();
    let server = TestServer::start_with(move |c| {
        c.no_unixsocket = false;
        c.unixsocket = Some(socket);
    })
    .await;

    let mut conn = tokio::net::UnixStream::connect(&path).await.unwrap();
    conn.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
    let mut buf = [0u8; 7];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"+PONG\r\n");

    server.stop().await;
    assert!(!path.exists(), "unix socket inode should be removed");
}

// Shutdown broadcasts to every session, waits for them to drain, and
// removes the PID file exactly once.
#[tokio::test]
async fn graceful_shutdown_drains_sessions() {
    let server = TestServer::start().await;
    let pidfile = server.pidfile.clone();
    assert!(pidfile.exists());

    let mut conn = server.connect().await;
    conn.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
    expect(&mut conn, b"+PONG\r\n").await;

    server.stop().await;

    // The connected session was closed by the broadcast.
    expect_eof(&mut conn).await;
    assert!(!pidfile.exists(), "pid file should be removed on shutdown");
}

#[tokio::test]
async fn pid_file_conflict_fails_startup() {
    let pidfile = std::env::temp_dir().join(format!(
        "kiwi-test-conflict-{}.pid",
        std::process::id()
    ));
    std::fs::write(&pidfile, "12345").unwrap();

    let mut config = Config::default();
    config.port = NEXT_PORT.fetch_add(1, Ordering::Relaxed);
    config.binds = vec!["127.0.0.1".to_string()];
    config.no_unixsocket = true;
    config.pidfile = Some(pidfile.clone());

    let result = server::run(config, std::future::pending::<()>()).await;
    assert!(result.is_err());

    std::fs::remove_file(&pidfile).unwrap();
}
