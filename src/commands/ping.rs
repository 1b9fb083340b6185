use crate::client::Client;
use crate::server::Server;

/// Returns PONG, or echoes the optional message argument back as a bulk
/// string.
///
/// Ref: <https://redis.io/docs/latest/commands/ping/>
pub fn ping(server: &Server, client: &mut Client) {
    match client.argc() {
        1 => {
            let pong = server.shared.pong.clone();
            client.reply.push_shared(&pong);
        }
        2 => {
            let msg = client.arg(1).clone();
            client.reply.bulk(Some(&msg[..]));
        }
        _ => client
            .reply
            .error("wrong number of arguments for 'ping' command"),
    }
}
