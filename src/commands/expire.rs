use crate::client::Client;
use crate::commands::{parse_int_arg, MSG_NOT_INTEGER};
use crate::server::Server;

/// Attaches a time to live in seconds to a key. A non-positive value
/// deletes the key outright. Replies 1 when a deadline was set (or the key
/// deleted) and 0 when the key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/expire/>
pub fn expire(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let Some(seconds) = parse_int_arg(client.arg(2)) else {
        client.reply.error(MSG_NOT_INTEGER);
        return;
    };

    let now_ms = server.now_ms();
    let mut db = client.db.lock().unwrap();

    if !db.exists(&key, now_ms) {
        drop(db);
        client.reply.integer(0);
        return;
    }

    if seconds <= 0 {
        db.delete(&key);
    } else {
        let deadline = now_ms.saturating_add(seconds.saturating_mul(1000) as u64);
        db.set_expire(&key, deadline);
    }
    drop(db);

    client.reply.integer(1);
}
