use crate::client::Client;
use crate::server::Server;

/// Replies the number of keys in the currently selected database.
///
/// Ref: <https://redis.io/docs/latest/commands/dbsize/>
pub fn dbsize(_server: &Server, client: &mut Client) {
    let size = client.db.lock().unwrap().len();
    client.reply.integer(size as i64);
}
