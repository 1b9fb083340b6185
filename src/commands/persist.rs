use crate::client::Client;
use crate::server::Server;

/// Removes the time to live of a key. Replies 1 when a deadline was
/// dropped, 0 when the key is missing or had none.
///
/// Ref: <https://redis.io/docs/latest/commands/persist/>
pub fn persist(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();

    let mut db = client.db.lock().unwrap();
    let removed = db.exists(&key, server.now_ms()) && db.remove_expire(&key);
    drop(db);

    client.reply.integer(i64::from(removed));
}
