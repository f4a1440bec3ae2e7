//! SFTP-over-SSH store backed by libssh2.
//!
//! Host keys are not verified. Authentication uses the configured private key
//! (with optional passphrase) when present, the password otherwise.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ssh2::{Session, Sftp};

use sftpx_core::{Credentials, SftpConfig};

use crate::error::{sftp_err, RemoteError};
use crate::store::{create_dir_all_with, RemoteConnection, RemoteStore, RemoteWriter};

/// Permission bits for directories created on the server.
const DIR_MODE: i32 = 0o755;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct SftpStore {
    config: SftpConfig,
}

impl SftpStore {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }

    fn open_tcp(&self) -> Result<TcpStream, RemoteError> {
        let addr = self.config.address();
        let candidates = addr
            .to_socket_addrs()
            .map_err(|source| RemoteError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing");
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.config.timeout()) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = err,
            }
        }
        Err(RemoteError::Connect {
            addr,
            source: last_err,
        })
    }

    fn authenticate(&self, session: &Session) -> Result<(), RemoteError> {
        let user = &self.config.user;
        let credentials = self
            .config
            .credentials()
            .ok_or_else(|| RemoteError::NoCredentials { user: user.clone() })?;

        let result = match &credentials {
            Credentials::PrivateKey { path, passphrase } => {
                session.userauth_pubkey_file(user, None, path, passphrase.as_deref())
            }
            Credentials::Password(password) => session.userauth_password(user, password),
        };
        result.map_err(|source| RemoteError::Auth {
            user: user.clone(),
            source,
        })?;

        if !session.authenticated() {
            return Err(RemoteError::AuthRejected { user: user.clone() });
        }
        tracing::debug!(user = %user, method = credentials.kind(), "ssh authentication succeeded");
        Ok(())
    }
}

impl RemoteStore for SftpStore {
    type Connection = SftpConnection;

    fn connect(&self) -> Result<SftpConnection, RemoteError> {
        let addr = self.config.address();
        let tcp = self.open_tcp()?;

        let mut session = Session::new().map_err(|source| RemoteError::Handshake {
            addr: addr.clone(),
            source,
        })?;
        let timeout_ms = u32::try_from(self.config.timeout().as_millis()).unwrap_or(u32::MAX);
        session.set_timeout(timeout_ms);
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|source| RemoteError::Handshake {
            addr: addr.clone(),
            source,
        })?;

        self.authenticate(&session)?;

        let sftp = session
            .sftp()
            .map_err(|source| sftp_err("open subsystem", addr.clone(), source))?;

        Ok(SftpConnection {
            addr,
            session: Mutex::new(session),
            sftp: Mutex::new(Some(sftp)),
            closed: AtomicBool::new(false),
        })
    }

    fn describe(&self) -> String {
        format!("sftp://{}@{}", self.config.user, self.config.address())
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

pub struct SftpConnection {
    addr: String,
    session: Mutex<Session>,
    /// `None` once the connection is closed.
    sftp: Mutex<Option<Sftp>>,
    closed: AtomicBool,
}

impl SftpConnection {
    fn sftp(&self) -> MutexGuard<'_, Option<Sftp>> {
        self.sftp.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteConnection for SftpConnection {
    fn make_directories(&self, path: &str) -> Result<(), RemoteError> {
        let guard = self.sftp();
        let sftp = guard.as_ref().ok_or(RemoteError::Closed)?;

        create_dir_all_with(
            path,
            |dir| sftp.mkdir(Path::new(dir), DIR_MODE),
            |dir| {
                sftp.stat(Path::new(dir))
                    .map(|stat| stat.is_dir())
                    .unwrap_or(false)
            },
        )
        .map_err(|(dir, source)| sftp_err("mkdir", dir, source))
    }

    fn create_file(&self, path: &str) -> Result<RemoteWriter, RemoteError> {
        let guard = self.sftp();
        let sftp = guard.as_ref().ok_or(RemoteError::Closed)?;
        let file = sftp
            .create(Path::new(path))
            .map_err(|source| sftp_err("create", path, source))?;
        Ok(Box::new(file))
    }

    fn close(&self) -> Result<(), RemoteError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Shut the subsystem channel before the transport goes away.
        drop(self.sftp().take());
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session
            .disconnect(None, "sftpx session complete", None)
            .map_err(|source| sftp_err("disconnect", self.addr.clone(), source))
    }
}

impl Drop for SftpConnection {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::debug!(addr = %self.addr, error = %err, "disconnect on drop failed");
        }
    }
}
