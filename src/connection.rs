use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::client::Client;
use crate::server::{ClientEntry, Server};
use crate::shutdown::Shutdown;

/// Byte cap for a single write pass. A session with more pending reply
/// bytes yields between passes so one slow client cannot monopolize.
pub const NET_MAX_WRITES_PER_EVENT: usize = 64 * 1024;

/// Drive one client session to completion: read, process, write, repeat,
/// with close as a transverse edge taken on shutdown, idle timeout, peer
/// close, transport error or a protocol error marked by the processor.
pub async fn serve<S>(
    server: Arc<Server>,
    mut stream: S,
    addr: String,
    unix_socket: bool,
    mut shutdown: Shutdown,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = server.next_client_id();
    let mut client = Client::new(&server, id, addr.clone());
    client.flags.unix_socket = unix_socket;

    let node = server.link_client(ClientEntry {
        id,
        addr: addr.clone(),
        created_at_ms: client.created_at_ms,
    });
    info!(client = %addr, id, "client connected");

    let idle_limit = Duration::from_secs(server.config.timeout.max(1));
    let mut last_activity = Instant::now();

    loop {
        if let Err(err) = flush_reply(&server, &mut client, &mut stream).await {
            debug!(client = %addr, "write failed: {}", err);
            break;
        }
        if client.flags.close_after_reply {
            debug!(client = %addr, "closing after reply");
            break;
        }

        tokio::select! {
            _ = shutdown.recv() => break,
            _ = time::sleep_until(last_activity + idle_limit), if !client.flags.lua => {
                debug!(client = %addr, "idle for more than {:?}, closing", idle_limit);
                break;
            }
            read = stream.read_buf(&mut client.querybuf) => match read {
                Ok(0) => {
                    debug!(client = %addr, "peer closed the connection");
                    break;
                }
                Ok(n) => {
                    // Any received byte resets the heartbeat deadline.
                    last_activity = Instant::now();
                    server.stats.net_input_bytes.fetch_add(n as u64, Ordering::Relaxed);
                    client.process_input(&server);
                }
                Err(err) => {
                    debug!(client = %addr, "read failed: {}", err);
                    break;
                }
            }
        }
    }

    server.unlink_client(node);
    info!(client = %addr, id, "client disconnected");
}

async fn flush_reply<S>(
    server: &Server,
    client: &mut Client,
    stream: &mut S,
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    while !client.reply.is_empty() {
        let chunk = client.reply.take_chunk(NET_MAX_WRITES_PER_EVENT);
        stream.write_all(&chunk).await?;
        server
            .stats
            .net_output_bytes
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        if !client.reply.is_empty() {
            tokio::task::yield_now().await;
        }
    }
    stream.flush().await
}
