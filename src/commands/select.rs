use crate::client::Client;
use crate::commands::parse_int_arg;
use crate::server::Server;

/// Rebinds the session to the logical database with the given zero-based
/// index. New connections always start on database 0.
///
/// Ref: <https://redis.io/docs/latest/commands/select/>
pub fn select(server: &Server, client: &mut Client) {
    let Some(index) = parse_int_arg(client.arg(1)) else {
        client.reply.error("invalid DB index");
        return;
    };

    if index < 0 || index as usize >= server.db_count() {
        client.reply.error("DB index is out of range");
        return;
    }

    client.db = server.db(index as usize).expect("index checked above");
    client.db_index = index as usize;
    client.reply.ok();
}
