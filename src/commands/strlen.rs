use crate::client::Client;
use crate::server::Server;

/// Replies the length of the string stored at key, 0 for a missing key.
/// For int-encoded values this is the length of the decimal form.
///
/// Ref: <https://redis.io/docs/latest/commands/strlen/>
pub fn strlen(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let object = client.db.lock().unwrap().lookup(&key, server.now_ms());

    let length = object.map(|o| o.len()).unwrap_or(0);
    client.reply.integer(length as i64);
}
