use crate::client::Client;
use crate::server::Server;

/// Replies how many of the given keys exist. A key repeated in the
/// argument list is counted every time it appears.
///
/// Ref: <https://redis.io/docs/latest/commands/exists/>
pub fn exists(server: &Server, client: &mut Client) {
    let now_ms = server.now_ms();
    let mut count = 0i64;

    let mut db = client.db.lock().unwrap();
    for key in &client.argv[1..] {
        if db.exists(key, now_ms) {
            count += 1;
        }
    }
    drop(db);

    client.reply.integer(count);
}
