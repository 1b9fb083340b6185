use glob_match::glob_match;

use crate::client::Client;
use crate::server::Server;

/// Replies every key of the selected database matching a glob pattern.
///
/// Ref: <https://redis.io/docs/latest/commands/keys/>
pub fn keys(server: &Server, client: &mut Client) {
    let pattern = String::from_utf8_lossy(client.arg(1)).to_string();

    let mut matched = client.db.lock().unwrap().keys(server.now_ms());
    matched.retain(|key| glob_match(&pattern, &String::from_utf8_lossy(key)));
    // The dict iteration order is arbitrary; fix it for predictable replies.
    matched.sort();

    client.reply.multi_bulk_len(matched.len());
    for key in matched {
        client.reply.bulk(Some(&key[..]));
    }
}
