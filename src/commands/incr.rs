use crate::client::Client;
use crate::commands::{parse_int_arg, MSG_NOT_INTEGER, MSG_OVERFLOW};
use crate::object::{checked_incr, Object};
use crate::server::Server;

/// Increments the number stored at key by one. Missing keys count as 0.
///
/// Ref: <https://redis.io/docs/latest/commands/incr/>
pub fn incr(server: &Server, client: &mut Client) {
    incr_decr(server, client, 1);
}

/// Decrements the number stored at key by one.
///
/// Ref: <https://redis.io/docs/latest/commands/decr/>
pub fn decr(server: &Server, client: &mut Client) {
    incr_decr(server, client, -1);
}

/// Increments the number stored at key by the given amount.
///
/// Ref: <https://redis.io/docs/latest/commands/incrby/>
pub fn incrby(server: &Server, client: &mut Client) {
    let Some(by) = parse_int_arg(client.arg(2)) else {
        client.reply.error(MSG_NOT_INTEGER);
        return;
    };
    incr_decr(server, client, by);
}

/// Decrements the number stored at key by the given amount.
///
/// Ref: <https://redis.io/docs/latest/commands/decrby/>
pub fn decrby(server: &Server, client: &mut Client) {
    let Some(by) = parse_int_arg(client.arg(2)) else {
        client.reply.error(MSG_NOT_INTEGER);
        return;
    };
    let Some(by) = by.checked_neg() else {
        client.reply.error(MSG_OVERFLOW);
        return;
    };
    incr_decr(server, client, by);
}

fn incr_decr(server: &Server, client: &mut Client, by: i64) {
    let key = client.arg(1).clone();
    let now_ms = server.now_ms();

    let mut db = client.db.lock().unwrap();
    let current = match db.lookup(&key, now_ms) {
        Some(object) => match object.as_int() {
            Some(value) => value,
            None => {
                drop(db);
                client.reply.error(MSG_NOT_INTEGER);
                return;
            }
        },
        None => 0,
    };

    let Some(value) = checked_incr(current, by) else {
        drop(db);
        client.reply.error(MSG_OVERFLOW);
        return;
    };

    let object = Object::from_int(value, &server.shared);
    object.touch(server.lru_clock());
    db.overwrite(key, object);
    drop(db);

    client.reply.integer(value);
}

#[cfg(test)]
mod tests {
    use crate::commands::test_util::{client, exec, server};
    use crate::object::Encoding;
    use bytes::Bytes;

    #[tokio::test]
    async fn incr_from_set_value() {
        let server = server();
        let mut client = client(&server);

        exec(&server, &mut client, &["SET", "k", "10"]);

        let reply = exec(&server, &mut client, &["INCR", "k"]);
        assert_eq!(reply, ":11\r\n");
        let reply = exec(&server, &mut client, &["INCR", "k"]);
        assert_eq!(reply, ":12\r\n");

        let reply = exec(&server, &mut client, &["GET", "k"]);
        assert_eq!(reply, "$2\r\n12\r\n");

        let obj = client
            .db
            .lock()
            .unwrap()
            .lookup(&Bytes::from("k"), 0)
            .unwrap();
        assert_eq!(obj.encoding(), Encoding::Int);
    }

    #[tokio::test]
    async fn missing_key_counts_as_zero() {
        let server = server();
        let mut client = client(&server);

        let reply = exec(&server, &mut client, &["INCR", "counter"]);
        assert_eq!(reply, ":1\r\n");

        let reply = exec(&server, &mut client, &["DECR", "other"]);
        assert_eq!(reply, ":-1\r\n");
    }

    #[tokio::test]
    async fn incrby_and_decrby() {
        let server = server();
        let mut client = client(&server);

        let reply = exec(&server, &mut client, &["INCRBY", "k", "50"]);
        assert_eq!(reply, ":50\r\n");

        let reply = exec(&server, &mut client, &["DECRBY", "k", "8"]);
        assert_eq!(reply, ":42\r\n");

        let reply = exec(&server, &mut client, &["INCRBY", "k", "abc"]);
        assert_eq!(reply, "-ERR value is not an integer or out of range\r\n");
    }

    #[tokio::test]
    async fn non_integer_value_is_rejected() {
        let server = server();
        let mut client = client(&server);

        exec(&server, &mut client, &["SET", "k", "not a number"]);

        let reply = exec(&server, &mut client, &["INCR", "k"]);
        assert_eq!(reply, "-ERR value is not an integer or out of range\r\n");

        let reply = exec(&server, &mut client, &["GET", "k"]);
        assert_eq!(reply, "$12\r\nnot a number\r\n");
    }

    #[tokio::test]
    async fn overflow_is_rejected() {
        let server = server();
        let mut client = client(&server);

        exec(&server, &mut client, &["SET", "k", "9223372036854775807"]);

        let reply = exec(&server, &mut client, &["INCR", "k"]);
        assert_eq!(reply, "-ERR increment or decrement would overflow\r\n");

        exec(&server, &mut client, &["SET", "k", "-9223372036854775808"]);
        let reply = exec(&server, &mut client, &["DECR", "k"]);
        assert_eq!(reply, "-ERR increment or decrement would overflow\r\n");

        let reply = exec(&server, &mut client, &["DECRBY", "j", "-9223372036854775808"]);
        assert_eq!(reply, "-ERR increment or decrement would overflow\r\n");
    }
}
