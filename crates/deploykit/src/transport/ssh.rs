//! SSH transport over libssh2.
//!
//! One TCP connection and one authenticated [`ssh2::Session`] per node,
//! opened lazily by the node that owns it and reused for every command.
//! Commands run over per-call exec channels; file transfer uses SFTP.

use crate::error::{Error, Result};
use crate::transport::{Auth, ExecutionResult, Session, Transport};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::net::TcpStream;
use std::path::Path;

const SSH_PORT: u16 = 22;

/// Production [`Transport`] over ssh2.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

impl SshTransport {
    /// Create the transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SshTransport {
    fn connect(&self, host: &str, auth: &Auth) -> Result<Box<dyn Session>> {
        let tcp = TcpStream::connect((host, SSH_PORT))
            .map_err(|err| Error::transport(host, err.to_string()))?;

        let mut session =
            ssh2::Session::new().map_err(|err| Error::transport(host, err.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| Error::transport(host, err.to_string()))?;

        // Authentication priority: key file, then password, then agent.
        let auth_result = if let Some(key) = &auth.key {
            session.userauth_pubkey_file(&auth.user, None, key, None)
        } else if let Some(password) = &auth.password {
            session.userauth_password(&auth.user, password)
        } else {
            session.userauth_agent(&auth.user)
        };
        auth_result.map_err(|err| Error::transport(host, err.to_string()))?;

        Ok(Box::new(SshSession {
            host: host.to_string(),
            session,
        }))
    }
}

struct SshSession {
    host: String,
    session: ssh2::Session,
}

impl SshSession {
    fn transport_err(&self, err: impl ToString) -> Error {
        Error::transport(&self.host, err.to_string())
    }
}

impl Session for SshSession {
    fn run(
        &mut self,
        command: &str,
        mut on_line: Option<&mut dyn FnMut(&str)>,
    ) -> Result<ExecutionResult> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|err| self.transport_err(err))?;
        channel
            .exec(command)
            .map_err(|err| self.transport_err(err))?;

        // Callers wrap commands with `2>&1`, so the main stream carries the
        // multiplexed output; anything left on stderr is drained afterwards.
        let mut output = String::new();
        let reader = BufReader::new(&mut channel);
        for line in reader.lines() {
            let line = line.map_err(|err| Error::transport(&self.host, err.to_string()))?;
            if let Some(hook) = on_line.as_deref_mut() {
                hook(&line);
            }
            output.push_str(&line);
            output.push('\n');
        }

        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|err| self.transport_err(err))?;
        output.push_str(&stderr);

        channel
            .wait_close()
            .map_err(|err| self.transport_err(err))?;
        let status = channel
            .exit_status()
            .map_err(|err| self.transport_err(err))?;

        Ok(ExecutionResult {
            output,
            success: status == 0,
        })
    }

    fn send_file(&mut self, local: &Path, remote: &str) -> Result<()> {
        let mut source = File::open(local).map_err(|err| Error::io(local, err))?;

        let sftp = self.session.sftp().map_err(|err| self.transport_err(err))?;
        let mut target = sftp
            .create(Path::new(remote))
            .map_err(|err| self.transport_err(err))?;
        io::copy(&mut source, &mut target).map_err(|err| self.transport_err(err))?;
        Ok(())
    }
}
