//! RESP2 wire codec.
//!
//! Encodes commands as arrays of bulk strings and decodes the five RESP
//! reply kinds. Only what the [`RemoteStore`](super::store::RemoteStore)
//! command surface needs; no pipelining, no pub/sub.

use std::io::BufRead;

use crate::error::{RemoraError, Result};

/// A decoded RESP reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    /// Bulk string; `None` is the nil bulk (`$-1`).
    Bulk(Option<Vec<u8>>),
    /// Array; `None` is the nil array (`*-1`).
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Interpret as a list of strings (for SMEMBERS/ZRANGE-style replies).
    /// Nil arrays decode as empty.
    pub fn into_strings(self) -> Result<Vec<String>> {
        match self {
            Reply::Array(None) => Ok(Vec::new()),
            Reply::Array(Some(items)) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Bulk(Some(bytes)) => String::from_utf8(bytes).map_err(|e| {
                        RemoraError::remote(format!("non-utf8 bulk string in reply: {e}"))
                    }),
                    other => Err(RemoraError::remote(format!(
                        "unexpected array element: {other:?}"
                    ))),
                })
                .collect(),
            Reply::Error(message) => Err(RemoraError::remote(message)),
            other => Err(RemoraError::remote(format!(
                "expected array reply, got {other:?}"
            ))),
        }
    }

    /// Interpret as an integer (for ZCARD-style replies).
    pub fn into_integer(self) -> Result<i64> {
        match self {
            Reply::Integer(value) => Ok(value),
            Reply::Error(message) => Err(RemoraError::remote(message)),
            other => Err(RemoraError::remote(format!(
                "expected integer reply, got {other:?}"
            ))),
        }
    }

    /// Interpret as an optional string (for GET-style replies).
    pub fn into_optional_string(self) -> Result<Option<String>> {
        match self {
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| RemoraError::remote(format!("non-utf8 bulk string in reply: {e}"))),
            Reply::Error(message) => Err(RemoraError::remote(message)),
            other => Err(RemoraError::remote(format!(
                "expected bulk reply, got {other:?}"
            ))),
        }
    }

    /// Require a success status or integer acknowledgement (SET/ZADD/SADD).
    pub fn expect_ack(self) -> Result<()> {
        match self {
            Reply::Simple(_) | Reply::Integer(_) => Ok(()),
            Reply::Error(message) => Err(RemoraError::remote(message)),
            other => Err(RemoraError::remote(format!(
                "expected acknowledgement, got {other:?}"
            ))),
        }
    }
}

/// Encode a command as a RESP array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Read one reply from the stream.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?;
    // A multi-byte first character means the line is not RESP at all.
    let Some((kind, rest)) = line.split_at_checked(1) else {
        return Err(RemoraError::remote(format!(
            "unknown reply type marker in line: {line:?}"
        )));
    };
    match kind {
        "+" => Ok(Reply::Simple(rest.to_string())),
        "-" => Ok(Reply::Error(rest.to_string())),
        ":" => Ok(Reply::Integer(parse_integer(rest)?)),
        "$" => {
            let len = parse_integer(rest)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let mut payload = vec![0u8; len as usize + 2];
            reader.read_exact(&mut payload)?;
            if &payload[len as usize..] != b"\r\n" {
                return Err(RemoraError::remote("bulk string missing terminator"));
            }
            payload.truncate(len as usize);
            Ok(Reply::Bulk(Some(payload)))
        }
        "*" => {
            let len = parse_integer(rest)?;
            if len < 0 {
                return Ok(Reply::Array(None));
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(read_reply(reader)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(RemoraError::remote(format!(
            "unknown reply type marker: {other:?}"
        ))),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if !line.ends_with("\r\n") {
        return Err(RemoraError::remote("truncated reply line"));
    }
    line.truncate(line.len() - 2);
    if line.is_empty() {
        return Err(RemoraError::remote("empty reply line"));
    }
    Ok(line)
}

fn parse_integer(text: &str) -> Result<i64> {
    text.parse::<i64>()
        .map_err(|_| RemoraError::remote(format!("malformed integer in reply: {text:?}")))
}
