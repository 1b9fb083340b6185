use crate::client::Client;
use crate::object::Object;
use crate::server::Server;

/// Appends the value at the end of the string stored at key, creating the
/// key when it does not exist. Replies the length of the string after the
/// append. Int-encoded values materialize their decimal form first.
///
/// Ref: <https://redis.io/docs/latest/commands/append/>
pub fn append(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let tail = client.arg(2).clone();
    let now_ms = server.now_ms();

    let mut db = client.db.lock().unwrap();
    let length = match db.lookup(&key, now_ms) {
        Some(object) => {
            let (object, length) = Object::append(&object, &tail, &server.shared);
            object.touch(server.lru_clock());
            db.overwrite(key, object);
            length
        }
        None => {
            let length = tail.len();
            let object = Object::from_bytes(tail, &server.shared);
            object.touch(server.lru_clock());
            db.add(key, object);
            length
        }
    };
    drop(db);

    client.reply.integer(length as i64);
}
