//! Server-side SMTP session state machine.
//!
//! Drives one connection through the minimal command set the relay
//! speaks: HELO/EHLO, MAIL, RCPT, DATA, RSET, NOOP, QUIT. Recipients are
//! validated against the domain allowlist at RCPT time; a completed DATA
//! block is parsed and handed to the dispatcher before the 250 goes out,
//! so the client's acknowledgment reflects the relay's acceptance.

use std::sync::Arc;

use dewmail_core::{domain_accepted, Clock, RecipientRoute};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

use crate::{
    mime::parse_mail,
    server::{Dispatch, SmtpConfig},
};

/// Longest line accepted, command or data. RFC 5321 allows far less for
/// commands; the slack covers long folded headers.
const MAX_LINE_BYTES: u64 = 4096;

/// Envelope state accumulated across commands, cleared by RSET and after
/// every completed transaction.
#[derive(Debug, Default)]
struct Transaction {
    mail_from: String,
    rcpt_to: Vec<String>,
}

impl Transaction {
    fn reset(&mut self) {
        self.mail_from.clear();
        self.rcpt_to.clear();
    }

    fn has_sender(&self) -> bool {
        !self.mail_from.is_empty()
    }

    fn has_recipients(&self) -> bool {
        !self.rcpt_to.is_empty()
    }
}

/// One SMTP session over a connection.
pub struct Session<D> {
    config: Arc<SmtpConfig>,
    dispatcher: Arc<D>,
    clock: Arc<dyn Clock>,
    transaction: Transaction,
}

impl<D: Dispatch> Session<D> {
    /// Creates a session ready to serve one connection.
    pub fn new(config: Arc<SmtpConfig>, dispatcher: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self { config, dispatcher, clock, transaction: Transaction::default() }
    }

    /// Runs the session until QUIT or disconnect.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the connection breaks.
    pub async fn run<S>(mut self, stream: S) -> std::io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        reply(&mut writer, &format!("220 {} ESMTP Dewmail ready", self.config.hostname)).await?;

        let mut line = String::new();
        loop {
            line.clear();
            match read_capped_line(&mut reader, &mut line).await? {
                LineRead::Eof => {
                    debug!("client disconnected");
                    return Ok(());
                },
                LineRead::Overflow => {
                    warn!("command line exceeded limit, closing session");
                    return reply(&mut writer, "500 5.5.2 line too long").await;
                },
                LineRead::Line => {},
            }

            let input = line.trim_end_matches(['\r', '\n']);
            let (verb, rest) = split_command(input);

            match verb.as_str() {
                "HELO" | "EHLO" => {
                    self.transaction.reset();
                    reply(&mut writer, &format!("250 {}", self.config.hostname)).await?;
                },
                "MAIL" => self.handle_mail(&mut writer, rest).await?,
                "RCPT" => self.handle_rcpt(&mut writer, rest).await?,
                "DATA" => {
                    if !self.handle_data(&mut reader, &mut writer).await? {
                        return Ok(());
                    }
                },
                "RSET" => {
                    self.transaction.reset();
                    reply(&mut writer, "250 2.0.0 OK").await?;
                },
                "NOOP" => reply(&mut writer, "250 2.0.0 OK").await?,
                "QUIT" => {
                    reply(&mut writer, &format!("221 {} closing", self.config.hostname)).await?;
                    return Ok(());
                },
                _ => reply(&mut writer, "500 5.5.2 command not recognized").await?,
            }
        }
    }

    async fn handle_mail<W>(&mut self, writer: &mut W, rest: &str) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(address) = argument_address(rest, "FROM") else {
            return reply(writer, "501 5.5.4 syntax: MAIL FROM:<address>").await;
        };

        self.transaction.reset();
        self.transaction.mail_from = address;
        reply(writer, "250 2.1.0 OK").await
    }

    async fn handle_rcpt<W>(&mut self, writer: &mut W, rest: &str) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if !self.transaction.has_sender() {
            return reply(writer, "503 5.5.1 bad sequence of commands").await;
        }

        let Some(address) = argument_address(rest, "TO") else {
            return reply(writer, "501 5.5.4 syntax: RCPT TO:<address>").await;
        };

        let route = match RecipientRoute::parse(&address) {
            Ok(route) => route,
            Err(e) => {
                warn!(address = %address, "recipient rejected: {}", e);
                return reply(writer, &format!("{} {e}", e.reply_code())).await;
            },
        };

        if self.config.domain_checking {
            if let Err(e) = domain_accepted(&self.config.valid_domains, route.domain()) {
                warn!(domain = %route.domain(), "recipient rejected: {}", e);
                return reply(writer, &format!("{} {e}", e.reply_code())).await;
            }
        }

        self.transaction.rcpt_to.push(address.to_ascii_lowercase());
        reply(writer, "250 2.1.5 OK").await
    }

    /// Runs one DATA block. Returns `false` when the session must close
    /// because the stream can no longer be trusted (oversized input).
    async fn handle_data<R, W>(&mut self, reader: &mut R, writer: &mut W) -> std::io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if !self.transaction.has_sender() || !self.transaction.has_recipients() {
            reply(writer, "503 5.5.1 bad sequence of commands").await?;
            return Ok(true);
        }

        reply(writer, "354 end data with <CRLF>.<CRLF>").await?;

        let data = match read_data(reader, self.config.max_message_bytes).await? {
            DataRead::Complete(data) => data,
            DataRead::Disconnected => {
                debug!("client disconnected during DATA");
                return Ok(false);
            },
            DataRead::TooLarge => {
                warn!(
                    limit = self.config.max_message_bytes,
                    "message exceeded size limit, closing session"
                );
                reply(writer, "552 5.3.4 message too big").await?;
                return Ok(false);
            },
        };

        let from = self.transaction.mail_from.clone();
        let envelope_to = self.transaction.rcpt_to[0].clone();
        self.transaction.reset();

        let mail = match parse_mail(&from, &envelope_to, &data, self.clock.as_ref()) {
            Ok(mail) => mail,
            Err(e) => {
                warn!(from = %from, "message rejected: {}", e);
                reply(writer, &format!("{} {e}", e.reply_code())).await?;
                return Ok(true);
            },
        };

        info!(
            from = %mail.message.from,
            subject = %mail.message.subject,
            "received message"
        );

        match self.dispatcher.dispatch(mail).await {
            Ok(()) => reply(writer, "250 2.0.0 OK: queued").await?,
            Err(e) => {
                warn!("dispatch failed: {:#}", e);
                reply(writer, "554 5.3.0 transaction failed").await?;
            },
        }
        Ok(true)
    }
}

/// Outcome of one size-capped line read.
enum LineRead {
    /// A complete line within the limit.
    Line,
    /// Stream ended before any bytes arrived.
    Eof,
    /// Line exceeded [`MAX_LINE_BYTES`]; the stream cannot be resynced.
    Overflow,
}

async fn read_capped_line<R>(reader: &mut R, line: &mut String) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let n = reader.take(MAX_LINE_BYTES).read_line(line).await?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if n as u64 == MAX_LINE_BYTES && !line.ends_with('\n') {
        return Ok(LineRead::Overflow);
    }
    Ok(LineRead::Line)
}

/// Outcome of reading one DATA block.
enum DataRead {
    /// Block completed by the lone-dot terminator.
    Complete(String),
    /// Client disconnected mid-block.
    Disconnected,
    /// Block or a single line exceeded the size limit.
    TooLarge,
}

/// Reads the DATA block up to the lone-dot terminator, unstuffing leading
/// double dots and enforcing the configured size cap.
async fn read_data<R>(reader: &mut R, max_bytes: usize) -> std::io::Result<DataRead>
where
    R: AsyncBufRead + Unpin,
{
    let mut data = String::new();
    let mut line = String::new();

    loop {
        line.clear();
        match read_capped_line(reader, &mut line).await? {
            LineRead::Eof => return Ok(DataRead::Disconnected),
            LineRead::Overflow => return Ok(DataRead::TooLarge),
            LineRead::Line => {},
        }

        let content = line.trim_end_matches(['\r', '\n']);
        if content == "." {
            return Ok(DataRead::Complete(data));
        }

        // Dot-unstuffing: the client doubled any leading dot
        data.push_str(content.strip_prefix('.').unwrap_or(content));
        data.push_str("\r\n");

        if data.len() > max_bytes {
            return Ok(DataRead::TooLarge);
        }
    }
}

/// Splits a command line into its uppercased verb and remainder.
fn split_command(input: &str) -> (String, &str) {
    match input.split_once(' ') {
        Some((verb, rest)) => (verb.to_ascii_uppercase(), rest.trim()),
        None => (input.to_ascii_uppercase(), ""),
    }
}

/// Extracts the address from `FROM:<addr>` / `TO:<addr>` arguments.
/// Angle brackets are optional; the keyword match is case-insensitive.
fn argument_address(rest: &str, keyword: &str) -> Option<String> {
    let (key, value) = rest.split_once(':')?;
    if !key.trim().eq_ignore_ascii_case(keyword) {
        return None;
    }

    let value = value.trim();
    let address = value.strip_prefix('<').and_then(|v| v.strip_suffix('>')).unwrap_or(value);

    if address.is_empty() {
        None
    } else {
        Some(address.to_string())
    }
}

async fn reply<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}
