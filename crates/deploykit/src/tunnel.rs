//! SSH tunnel lifecycle.
//!
//! The tunnel is the one deliberately backgrounded subprocess: it must
//! outlive the spawning call and stay up for the rest of the run. It binds
//! a control socket so teardown can address it later; teardown runs on
//! every exit path because dropping the handle closes the tunnel.

use anyhow::{Context as _, Result, anyhow, bail};
use log::{debug, warn};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

/// Control socket the single per-run tunnel binds.
pub const CONTROL_SOCKET: &str = "/tmp/stevedore-ctrl-socket";

/// Fixed delay given to the tunnel to settle when readiness polling is off.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How a tunnel should be established.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// SSH destination, e.g. `user@bastion`
    pub target: String,
    /// Extra options passed verbatim to ssh
    pub options: Option<String>,
    /// Poll the forwarded port instead of sleeping the settle delay
    pub wait_ready: bool,
}

/// A live tunnel bound to the control socket.
///
/// Dropping the handle tears the tunnel down.
pub struct TunnelHandle {
    target: String,
    socket: PathBuf,
    child: Child,
    closed: bool,
}

impl TunnelHandle {
    /// Spawn a background ssh forward of local `port` to `host:port` on the
    /// far side of `target`.
    pub fn open(config: &TunnelConfig, host: &str, port: u16) -> Result<Self> {
        let socket = PathBuf::from(CONTROL_SOCKET);
        let mut args: Vec<String> = Vec::new();
        if let Some(options) = &config.options {
            args.extend(options.split_whitespace().map(ToString::to_string));
        }
        args.extend([
            "-M".into(),
            "-S".into(),
            socket.display().to_string(),
            "-fnNT".into(),
            config.target.clone(),
            "-L".into(),
            format!("{port}:{host}:{port}"),
        ]);
        debug!("running `ssh {}`", args.join(" "));
        let child = Command::new("ssh")
            .args(&args)
            .stdin(Stdio::null())
            .spawn()
            .context("spawning ssh tunnel")?;
        Ok(Self {
            target: config.target.clone(),
            socket,
            child,
            closed: false,
        })
    }

    /// Give the tunnel time to come up: the fixed settle delay by default,
    /// or an opt-in TCP poll of the forwarded local port.
    pub fn settle(&self, wait_ready: bool, port: u16) -> Result<()> {
        if !wait_ready {
            thread::sleep(SETTLE_DELAY);
            return Ok(());
        }
        let deadline = Instant::now() + READY_TIMEOUT;
        while Instant::now() < deadline {
            if TcpStream::connect(("localhost", port)).is_ok() {
                return Ok(());
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
        bail!("tunnel port {port} did not come up within {READY_TIMEOUT:?}")
    }

    /// Tear the tunnel down via its control socket.
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let socket = self.socket.display().to_string();
        debug!("closing tunnel to {}", self.target);
        let status = Command::new("ssh")
            .args(["-S", &socket, "-O", "exit", &self.target])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(err) = status {
            warn!("tunnel teardown failed: {err}");
        }
        // Reap the spawner; with -f it exits as soon as the forward is up
        let _ = self.child.wait();
    }
}

impl Drop for TunnelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// The endpoint units should use once the tunnel forwards the server's port
/// locally.
pub fn local_endpoint(server: &Url) -> Result<Url> {
    let mut local = server.clone();
    local
        .set_host(Some("localhost"))
        .map_err(|err| anyhow!("rewriting endpoint host: {err}"))?;
    Ok(local)
}
