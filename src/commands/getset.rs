use crate::client::Client;
use crate::object::Object;
use crate::server::Server;

/// Atomically sets key to value and returns the old value, clearing any
/// time to live the key carried.
///
/// Ref: <https://redis.io/docs/latest/commands/getset/>
pub fn getset(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let value = client.arg(2).clone();
    let now_ms = server.now_ms();

    let mut db = client.db.lock().unwrap();
    let old = db.lookup(&key, now_ms);

    let object = Object::from_bytes(value, &server.shared);
    object.touch(server.lru_clock());
    db.overwrite(key.clone(), object);
    db.remove_expire(&key);
    drop(db);

    match old {
        Some(old) => client.reply.bulk_object(&old),
        None => client.reply.null_bulk(),
    }
}
