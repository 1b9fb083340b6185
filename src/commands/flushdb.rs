use crate::client::Client;
use crate::server::Server;

/// Removes every key of the currently selected database.
///
/// Ref: <https://redis.io/docs/latest/commands/flushdb/>
pub fn flushdb(_server: &Server, client: &mut Client) {
    client.db.lock().unwrap().clear();
    client.reply.ok();
}

/// Removes every key of every database.
///
/// Ref: <https://redis.io/docs/latest/commands/flushall/>
pub fn flushall(server: &Server, client: &mut Client) {
    for index in 0..server.db_count() {
        if let Some(db) = server.db(index) {
            db.lock().unwrap().clear();
        }
    }
    client.reply.ok();
}
