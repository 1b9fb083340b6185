use crate::client::Client;
use crate::server::Server;

/// Returns the message argument as a bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/echo/>
pub fn echo(_server: &Server, client: &mut Client) {
    let msg = client.arg(1).clone();
    client.reply.bulk(Some(&msg[..]));
}
