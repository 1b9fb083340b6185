pub mod append;
pub mod auth;
pub mod dbsize;
pub mod del;
pub mod echo;
pub mod exists;
pub mod expire;
pub mod flushdb;
pub mod get;
pub mod getset;
pub mod incr;
pub mod keys;
pub mod persist;
pub mod ping;
pub mod select;
pub mod set;
pub mod setnx;
pub mod strlen;
pub mod ttl;

use std::sync::atomic::Ordering;

use crate::client::Client;
use crate::server::Server;

pub type Handler = fn(&Server, &mut Client);

pub const CMD_WRITE: u32 = 1 << 0;
pub const CMD_DENYOOM: u32 = 1 << 1;
pub const CMD_LOADING: u32 = 1 << 2;
pub const CMD_MODULE: u32 = 1 << 3;

/// One entry of the command table. Positive arity means exactly that many
/// arguments (command name included); negative arity means at least that
/// many.
pub struct CommandSpec {
    pub name: &'static str,
    pub arity: i32,
    pub flags: u32,
    pub handler: Handler,
}

#[rustfmt::skip]
pub static COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec { name: "ping", arity: -1, flags: CMD_LOADING, handler: ping::ping },
    CommandSpec { name: "echo", arity: 2, flags: 0, handler: echo::echo },
    CommandSpec { name: "auth", arity: 2, flags: CMD_LOADING, handler: auth::auth },
    CommandSpec { name: "select", arity: 2, flags: CMD_LOADING, handler: select::select },
    CommandSpec { name: "set", arity: -3, flags: CMD_WRITE | CMD_DENYOOM, handler: set::set },
    CommandSpec { name: "get", arity: 2, flags: 0, handler: get::get },
    CommandSpec { name: "getset", arity: 3, flags: CMD_WRITE | CMD_DENYOOM, handler: getset::getset },
    CommandSpec { name: "setnx", arity: 3, flags: CMD_WRITE | CMD_DENYOOM, handler: setnx::setnx },
    CommandSpec { name: "del", arity: -2, flags: CMD_WRITE, handler: del::del },
    CommandSpec { name: "exists", arity: -2, flags: 0, handler: exists::exists },
    CommandSpec { name: "incr", arity: 2, flags: CMD_WRITE | CMD_DENYOOM, handler: incr::incr },
    CommandSpec { name: "decr", arity: 2, flags: CMD_WRITE | CMD_DENYOOM, handler: incr::decr },
    CommandSpec { name: "incrby", arity: 3, flags: CMD_WRITE | CMD_DENYOOM, handler: incr::incrby },
    CommandSpec { name: "decrby", arity: 3, flags: CMD_WRITE | CMD_DENYOOM, handler: incr::decrby },
    CommandSpec { name: "append", arity: 3, flags: CMD_WRITE | CMD_DENYOOM, handler: append::append },
    CommandSpec { name: "strlen", arity: 2, flags: 0, handler: strlen::strlen },
    CommandSpec { name: "keys", arity: 2, flags: 0, handler: keys::keys },
    CommandSpec { name: "dbsize", arity: 1, flags: 0, handler: dbsize::dbsize },
    CommandSpec { name: "flushdb", arity: -1, flags: CMD_WRITE, handler: flushdb::flushdb },
    CommandSpec { name: "flushall", arity: -1, flags: CMD_WRITE, handler: flushdb::flushall },
    CommandSpec { name: "expire", arity: 3, flags: CMD_WRITE, handler: expire::expire },
    CommandSpec { name: "ttl", arity: 2, flags: 0, handler: ttl::ttl },
    CommandSpec { name: "persist", arity: 2, flags: CMD_WRITE, handler: persist::persist },
];

pub(crate) const MSG_NOT_INTEGER: &str = "value is not an integer or out of range";
pub(crate) const MSG_OVERFLOW: &str = "increment or decrement would overflow";
pub(crate) const MSG_SYNTAX: &str = "syntax error";

/// Run the checks of the dispatch sequence and invoke the handler for the
/// request currently held in `client.argv`. Recoverable failures become
/// RESP error replies and never propagate past this function.
pub fn dispatch(server: &Server, client: &mut Client) {
    let name = String::from_utf8_lossy(client.arg(0)).to_lowercase();

    // QUIT does not go through the table: reply and close once the reply
    // is flushed.
    if name == "quit" {
        client.reply.ok();
        client.flags.close_after_reply = true;
        return;
    }

    let Some(spec) = server.lookup_command(&name) else {
        client.reply.error(&format!("unknown command '{name}'"));
        return;
    };

    let argc = client.argc() as i32;
    if (spec.arity > 0 && argc != spec.arity) || argc < -spec.arity {
        client
            .reply
            .error(&format!("wrong number of arguments for '{name}' command"));
        return;
    }

    if server.config.requirepass.is_some() && !client.authenticated && spec.name != "auth" {
        let err = server.shared.noauth_err.clone();
        client.reply.push_shared(&err);
        return;
    }

    if server.config.maxmemory > 0 {
        let freed = server.try_free_memory();
        if !freed && spec.flags & CMD_DENYOOM != 0 {
            let err = server.shared.oom_err.clone();
            client.reply.push_shared(&err);
            return;
        }
    }

    if server.is_loading() && spec.flags & CMD_LOADING == 0 {
        let err = server.shared.loading_err.clone();
        client.reply.push_shared(&err);
        return;
    }

    (spec.handler)(server, client);
    server.stats.num_commands.fetch_add(1, Ordering::Relaxed);
}

/// Strict decimal parse of an argument, for counts and increments.
pub(crate) fn parse_int_arg(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

#[cfg(test)]
pub(crate) mod test_util {
    use bytes::Bytes;

    use crate::client::Client;
    use crate::config::Config;
    use crate::server::Server;

    pub(crate) fn server() -> Server {
        Server::new(Config::default())
    }

    pub(crate) fn server_with(f: impl FnOnce(&mut Config)) -> Server {
        let mut config = Config::default();
        f(&mut config);
        Server::new(config)
    }

    pub(crate) fn client(server: &Server) -> Client {
        Client::new(server, 1, "127.0.0.1:49152".to_string())
    }

    /// Dispatch a command built from string parts and return the raw reply
    /// bytes it produced.
    pub(crate) fn exec(server: &Server, client: &mut Client, args: &[&str]) -> Bytes {
        client.argv = args.iter().map(|a| Bytes::from(a.to_string())).collect();
        super::dispatch(server, client);
        client.argv.clear();
        client.reply.take_chunk(usize::MAX)
    }
}
