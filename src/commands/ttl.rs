use crate::client::Client;
use crate::server::Server;

/// Replies the remaining time to live of a key in seconds, -1 when the key
/// has no deadline and -2 when the key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/ttl/>
pub fn ttl(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let now_ms = server.now_ms();

    let mut db = client.db.lock().unwrap();
    if !db.exists(&key, now_ms) {
        drop(db);
        client.reply.integer(-2);
        return;
    }
    let remaining = db.ttl_ms(&key, now_ms);
    drop(db);

    match remaining {
        // Round up so a deadline under a second away still reads as 1.
        Some(ms) => client.reply.integer((ms.div_ceil(1000)) as i64),
        None => client.reply.integer(-1),
    }
}
