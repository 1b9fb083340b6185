use crate::client::Client;
use crate::server::Server;

/// Removes the specified keys, ignoring the ones that do not exist.
/// Replies the number of keys actually removed.
///
/// Ref: <https://redis.io/docs/latest/commands/del/>
pub fn del(server: &Server, client: &mut Client) {
    let now_ms = server.now_ms();
    let mut deleted = 0i64;

    let mut db = client.db.lock().unwrap();
    for key in &client.argv[1..] {
        // Keys that only exist as expired leftovers do not count.
        db.expire_check(key, now_ms);
        if db.delete(key) {
            deleted += 1;
        }
    }
    drop(db);

    client.reply.integer(deleted);
}
