//! Pooled blocking TCP client implementing [`RemoteStore`] over RESP.
//!
//! Connections are created lazily, checked out per call, returned to the
//! pool on success, and dropped on any error so a broken socket is never
//! reused. Timeouts come from [`ClusterConfig`]; there is no cancellation
//! channel — an in-flight call can only be abandoned after it returns or
//! times out.

use std::io::{BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ClusterConfig;
use crate::error::{RemoraError, Result};
use crate::remote::resp::{self, Reply};
use crate::remote::store::{LexBound, RemoteStore};

type Connection = BufReader<TcpStream>;

/// A blocking RESP client with a small idle-connection pool.
pub struct RespStore {
    seed: String,
    pool_size: usize,
    connect_timeout: Duration,
    io_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl RespStore {
    pub fn new(config: &ClusterConfig) -> Self {
        RespStore {
            seed: config.seed.clone(),
            pool_size: config.pool_size,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            io_timeout: Duration::from_millis(config.io_timeout_ms),
            idle: Mutex::new(Vec::new()),
        }
    }

    fn connect(&self) -> Result<Connection> {
        let mut last_error = None;
        let addrs = self
            .seed
            .to_socket_addrs()
            .map_err(|e| RemoraError::remote(format!("cannot resolve {:?}: {e}", self.seed)))?;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.io_timeout))?;
                    stream.set_write_timeout(Some(self.io_timeout))?;
                    stream.set_nodelay(true)?;
                    return Ok(BufReader::new(stream));
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(match last_error {
            Some(e) => RemoraError::remote(format!("cannot connect to {:?}: {e}", self.seed)),
            None => RemoraError::remote(format!("no addresses behind {:?}", self.seed)),
        })
    }

    fn checkout(&self) -> Result<Connection> {
        if let Some(conn) = self.idle.lock().pop() {
            return Ok(conn);
        }
        self.connect()
    }

    fn check_in(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.pool_size {
            idle.push(conn);
        }
    }

    /// Run one command round trip. The connection goes back to the pool
    /// only when the whole exchange succeeded.
    fn command(&self, args: &[&[u8]]) -> Result<Reply> {
        let mut conn = self.checkout()?;
        let encoded = resp::encode_command(args);
        let outcome = conn
            .get_mut()
            .write_all(&encoded)
            .map_err(RemoraError::from)
            .and_then(|_| resp::read_reply(&mut conn));
        match outcome {
            Ok(reply) => {
                self.check_in(conn);
                Ok(reply)
            }
            Err(e) => Err(e),
        }
    }
}

impl RemoteStore for RespStore {
    fn z_add_docs(&self, key: &str, docs: &[u32]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let pairs: Vec<String> = docs.iter().map(|doc| doc.to_string()).collect();
        let mut args: Vec<&[u8]> = vec![b"ZADD", key.as_bytes()];
        for member in &pairs {
            // score == member for document ordinals
            args.push(member.as_bytes());
            args.push(member.as_bytes());
        }
        self.command(&args)?.expect_ack()
    }

    fn z_add_members(&self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&[u8]> = vec![b"ZADD", key.as_bytes()];
        for member in members {
            args.push(b"0");
            args.push(member.as_bytes());
        }
        self.command(&args)?.expect_ack()
    }

    fn s_add(&self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&[u8]> = vec![b"SADD", key.as_bytes()];
        for member in members {
            args.push(member.as_bytes());
        }
        self.command(&args)?.expect_ack()
    }

    fn z_card(&self, key: &str) -> Result<u64> {
        let count = self.command(&[b"ZCARD", key.as_bytes()])?.into_integer()?;
        Ok(count.max(0) as u64)
    }

    fn z_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let start = start.to_string();
        let stop = stop.to_string();
        self.command(&[b"ZRANGE", key.as_bytes(), start.as_bytes(), stop.as_bytes()])?
            .into_strings()
    }

    fn z_range_by_score(
        &self,
        key: &str,
        after: Option<u32>,
        count: usize,
    ) -> Result<Vec<String>> {
        let min = match after {
            Some(doc) => format!("({doc}"),
            None => "-inf".to_string(),
        };
        let count = count.to_string();
        self.command(&[
            b"ZRANGEBYSCORE",
            key.as_bytes(),
            min.as_bytes(),
            b"+inf",
            b"LIMIT",
            b"0",
            count.as_bytes(),
        ])?
        .into_strings()
    }

    fn z_range_by_lex(
        &self,
        key: &str,
        min: LexBound,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>> {
        let min = match min {
            LexBound::Unbounded => "-".to_string(),
            LexBound::Inclusive(term) => format!("[{term}"),
            LexBound::Exclusive(term) => format!("({term}"),
        };
        let offset = offset.to_string();
        let count = count.to_string();
        self.command(&[
            b"ZRANGEBYLEX",
            key.as_bytes(),
            min.as_bytes(),
            b"+",
            b"LIMIT",
            offset.as_bytes(),
            count.as_bytes(),
        ])?
        .into_strings()
    }

    fn s_members(&self, key: &str) -> Result<Vec<String>> {
        self.command(&[b"SMEMBERS", key.as_bytes()])?.into_strings()
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.command(&[b"GET", key.as_bytes()])?.into_optional_string()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.command(&[b"SET", key.as_bytes(), value.as_bytes()])?
            .expect_ack()
    }

    fn close(&self) -> Result<()> {
        self.idle.lock().clear();
        Ok(())
    }
}
