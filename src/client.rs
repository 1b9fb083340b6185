use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};

use crate::commands;
use crate::db::Db;
use crate::protocol::Parser;
use crate::reply::ReplyBuffer;
use crate::server::Server;

/// Session flags. `close_after_reply` is the transverse edge of the state
/// machine: once set, the session flushes what is pending and closes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientFlags {
    pub unix_socket: bool,
    pub lua: bool,
    pub close_after_reply: bool,
}

/// Per-connection state: the inbound buffer plus parser, the outbound
/// reply buffer, the current argument vector and the selected database.
/// A session task owns its `Client` exclusively, so no locking happens at
/// this level.
#[derive(Debug)]
pub struct Client {
    pub id: u64,
    pub addr: String,
    pub db_index: usize,
    pub db: Arc<Mutex<Db>>,
    pub querybuf: BytesMut,
    pub reply: ReplyBuffer,
    pub argv: Vec<Bytes>,
    pub flags: ClientFlags,
    pub authenticated: bool,
    pub created_at_ms: u64,
    pub last_interaction_ms: u64,
    parser: Parser,
}

impl Client {
    pub fn new(server: &Server, id: u64, addr: String) -> Client {
        let now_ms = server.now_ms();
        Client {
            id,
            addr,
            db_index: 0,
            db: server.db(0).expect("database 0 exists"),
            querybuf: BytesMut::with_capacity(16 * 1024),
            reply: ReplyBuffer::new(server.shared.clone()),
            argv: Vec::new(),
            flags: ClientFlags::default(),
            authenticated: false,
            created_at_ms: now_ms,
            last_interaction_ms: now_ms,
            parser: Parser::new(server.config.proto_max_bulk_len as usize),
        }
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    pub fn arg(&self, index: usize) -> &Bytes {
        &self.argv[index]
    }

    /// Frame and dispatch every complete request sitting in the inbound
    /// buffer. A protocol error replies and marks the session for close;
    /// nothing is parsed for this client past that point.
    pub fn process_input(&mut self, server: &Server) {
        loop {
            if self.flags.close_after_reply {
                break;
            }
            match self.parser.parse(&mut self.querybuf) {
                Ok(Some(argv)) => {
                    if argv.is_empty() {
                        continue;
                    }
                    self.argv = argv;
                    commands::dispatch(server, self);
                    self.argv.clear();
                }
                Ok(None) => break,
                Err(err) => {
                    self.reply.error(&err.to_string());
                    self.flags.close_after_reply = true;
                    break;
                }
            }
        }
        self.last_interaction_ms = server.now_ms();
    }
}
