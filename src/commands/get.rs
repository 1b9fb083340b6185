use crate::client::Client;
use crate::server::Server;

/// Returns the value of a key, or a null bulk when it does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
pub fn get(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let object = client.db.lock().unwrap().lookup(&key, server.now_ms());

    match object {
        Some(object) => {
            object.touch(server.lru_clock());
            client.reply.bulk_object(&object);
        }
        None => client.reply.null_bulk(),
    }
}
