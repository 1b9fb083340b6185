use crate::client::Client;
use crate::server::Server;

/// Authenticates the session against the configured password. The
/// dispatcher lets AUTH through its authentication gate, so this is
/// reachable on locked-down servers.
///
/// Ref: <https://redis.io/docs/latest/commands/auth/>
pub fn auth(server: &Server, client: &mut Client) {
    match &server.config.requirepass {
        None => client
            .reply
            .error("Client sent AUTH, but no password is set"),
        Some(password) if client.arg(1).as_ref() == password.as_bytes() => {
            client.authenticated = true;
            client.reply.ok();
        }
        Some(_) => {
            client.authenticated = false;
            client.reply.error("invalid password");
        }
    }
}
