// SSH transport built on russh.
//
// Opens one interactive shell per connection with a PTY, answers the
// ProCurve "Press any key" banner, and turns paging off before handing
// the shell to the session manager.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::transport::{Connector, Shell, TransportConfig};

/// How long the banner may stay silent before we consider it drained.
const BANNER_QUIET: Duration = Duration::from_millis(500);
/// Upper bound on banner draining, independent of the connect timeout.
const BANNER_MAX: Duration = Duration::from_secs(5);

/// Client handler. Switches on a management VLAN rarely have stable,
/// distributable host keys, so every key is accepted and logged.
struct AcceptingHandler {
    endpoint: String,
}

#[async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!(
            endpoint = %self.endpoint,
            key_type = server_public_key.name(),
            "accepting switch host key"
        );
        Ok(true)
    }
}

/// Production [`Connector`] that opens SSH shells.
pub struct SshConnector {
    config: TransportConfig,
    ssh: Arc<client::Config>,
}

impl SshConnector {
    pub fn new(config: TransportConfig) -> Self {
        let ssh = client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            ..client::Config::default()
        };
        Self {
            config,
            ssh: Arc::new(ssh),
        }
    }

    async fn open(&self) -> Result<SshShell, Error> {
        let endpoint = self.config.endpoint();
        let handler = AcceptingHandler {
            endpoint: endpoint.clone(),
        };

        let mut handle = client::connect(
            Arc::clone(&self.ssh),
            (self.config.host.as_str(), self.config.port),
            handler,
        )
        .await
        .map_err(|e| Error::Connect {
            host: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let accepted = handle
            .authenticate_password(
                self.config.username.clone(),
                self.config.password.expose_secret().to_owned(),
            )
            .await?;
        if !accepted {
            return Err(Error::Authentication {
                message: format!("password rejected for user '{}'", self.config.username),
            });
        }

        let mut channel = handle.channel_open_session().await?;
        channel
            .request_pty(false, "vt100", self.config.terminal_width, 1000, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;

        let mut shell = SshShell {
            handle,
            channel,
            endpoint,
        };
        shell.prepare().await?;
        Ok(shell)
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self) -> Result<Box<dyn Shell>, Error> {
        let endpoint = self.config.endpoint();
        debug!(%endpoint, "opening SSH shell");

        let shell = timeout(self.config.connect_timeout, self.open())
            .await
            .map_err(|_| Error::Connect {
                host: endpoint.clone(),
                reason: format!(
                    "no answer within {}s",
                    self.config.connect_timeout.as_secs()
                ),
            })??;

        debug!(%endpoint, "SSH shell ready");
        Ok(Box::new(shell))
    }

    fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

/// A live interactive shell on the switch.
pub struct SshShell {
    handle: Handle<AcceptingHandler>,
    channel: Channel<Msg>,
    endpoint: String,
}

impl SshShell {
    /// Dismiss the login banner and turn paging off.
    async fn prepare(&mut self) -> Result<(), Error> {
        self.send("\n").await?;
        self.drain().await?;
        self.send("no page\n").await?;
        self.drain().await?;
        Ok(())
    }

    /// Read and discard output until the shell stays quiet for a moment.
    async fn drain(&mut self) -> Result<(), Error> {
        let deadline = Instant::now() + BANNER_MAX;
        while Instant::now() < deadline {
            match timeout(BANNER_QUIET, self.recv()).await {
                Ok(Ok(Some(chunk))) => trace!(endpoint = %self.endpoint, len = chunk.len(), "drained"),
                Ok(Ok(None)) => {
                    return Err(Error::SessionClosed {
                        reason: "channel closed during login".into(),
                    });
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => break,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Shell for SshShell {
    async fn send(&mut self, data: &str) -> Result<(), Error> {
        self.channel.data(data.as_bytes()).await.map_err(|e| Error::SessionClosed {
            reason: format!("write failed: {e}"),
        })
    }

    async fn recv(&mut self) -> Result<Option<String>, Error> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) | Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    return Ok(Some(String::from_utf8_lossy(data).into_owned()));
                }
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => return Ok(None),
                Some(other) => trace!(endpoint = %self.endpoint, msg = ?other, "ignoring channel message"),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.channel.eof().await {
            trace!(endpoint = %self.endpoint, error = %e, "eof on close failed");
        }
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            warn!(endpoint = %self.endpoint, error = %e, "SSH disconnect failed (non-fatal)");
        }
    }
}
