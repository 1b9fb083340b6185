use crate::client::Client;
use crate::object::Object;
use crate::server::Server;

/// Sets key to value only when the key does not exist. Replies 1 when the
/// key was set and 0 when it was left alone.
///
/// Ref: <https://redis.io/docs/latest/commands/setnx/>
pub fn setnx(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let value = client.arg(2).clone();

    let mut db = client.db.lock().unwrap();
    if db.exists(&key, server.now_ms()) {
        drop(db);
        client.reply.integer(0);
        return;
    }

    let object = Object::from_bytes(value, &server.shared);
    object.touch(server.lru_clock());
    db.add(key, object);
    drop(db);

    client.reply.integer(1);
}
