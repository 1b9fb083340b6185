use crate::client::Client;
use crate::commands::{parse_int_arg, MSG_NOT_INTEGER, MSG_SYNTAX};
use crate::object::Object;
use crate::server::Server;

/// Sets key to a string value, replacing any previous value and clearing
/// any previous time to live. `EX`/`PX` attach a new expiry; `NX`/`XX`
/// restrict the write to missing or existing keys and reply a null bulk
/// when the condition fails.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
pub fn set(server: &Server, client: &mut Client) {
    let key = client.arg(1).clone();
    let value = client.arg(2).clone();

    let mut nx = false;
    let mut xx = false;
    let mut expire_ms: Option<i64> = None;

    let mut i = 3;
    while i < client.argc() {
        let option = String::from_utf8_lossy(client.arg(i)).to_uppercase();
        match option.as_str() {
            "NX" if !xx => nx = true,
            "XX" if !nx => xx = true,
            "EX" | "PX" if expire_ms.is_none() && i + 1 < client.argc() => {
                let Some(raw) = parse_int_arg(client.arg(i + 1)) else {
                    client.reply.error(MSG_NOT_INTEGER);
                    return;
                };
                if raw <= 0 {
                    client.reply.error("invalid expire time in 'set' command");
                    return;
                }
                expire_ms = Some(if option == "EX" {
                    raw.saturating_mul(1000)
                } else {
                    raw
                });
                i += 1;
            }
            _ => {
                client.reply.error(MSG_SYNTAX);
                return;
            }
        }
        i += 1;
    }

    let now_ms = server.now_ms();
    let mut db = client.db.lock().unwrap();

    let exists = db.exists(&key, now_ms);
    if (nx && exists) || (xx && !exists) {
        drop(db);
        client.reply.null_bulk();
        return;
    }

    let object = Object::from_bytes(value, &server.shared);
    object.touch(server.lru_clock());
    db.overwrite(key.clone(), object);
    db.remove_expire(&key);
    if let Some(ms) = expire_ms {
        db.set_expire(&key, now_ms.saturating_add(ms as u64));
    }
    drop(db);

    client.reply.ok();
}
