use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pve_client::{ClientConfig, HttpClient};
use pve_provider::Provider;
use pve_provider::protocol::{self, InFlight, Request, Response};
use pve_provider::resource::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pve-provider")]
#[command(about = "Proxmox VE resource pool and storage class provider")]
struct Args {
    /// Proxmox VE API endpoint, e.g. https://pve1:8006
    #[arg(long, env = "PROXMOX_VE_ENDPOINT")]
    endpoint: String,

    /// API token id, e.g. root@pam!provider
    #[arg(long, env = "PROXMOX_VE_API_TOKEN_ID")]
    token_id: String,

    /// API token secret
    #[arg(long, env = "PROXMOX_VE_API_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,

    /// Accept invalid TLS certificates
    #[arg(long, env = "PROXMOX_VE_INSECURE")]
    insecure: bool,

    /// Per-request timeout in seconds (none by default)
    #[arg(long, env = "PROXMOX_VE_TIMEOUT")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pve_provider=info,pve_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let client = HttpClient::new(&ClientConfig {
        endpoint: args.endpoint.clone(),
        token_id: args.token_id,
        token_secret: args.token_secret,
        insecure: args.insecure,
        timeout: args.timeout.map(Duration::from_secs),
    })?;
    let provider = Arc::new(Provider::configure(Arc::new(client)));
    let inflight = Arc::new(InFlight::new());
    let root = CancellationToken::new();

    info!(endpoint = %args.endpoint, "Provider ready");

    // Single writer so response lines never interleave.
    let (tx, mut rx) = mpsc::channel::<Response>(64);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let mut line = match serde_json::to_vec(&response) {
                Ok(line) => line,
                Err(e) => {
                    error!(id = %response.id, error = %e, "Failed to encode response");
                    continue;
                }
            };
            line.push(b'\n');
            if let Err(e) = stdout.write_all(&line).await {
                error!(error = %e, "Failed to write response");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    {
        let root = root.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight requests");
                root.cancel();
            }
        });
    }

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "Malformed request");
                let _ = tx.send(Response::malformed(&e)).await;
                continue;
            }
        };

        let provider = Arc::clone(&provider);
        let inflight = Arc::clone(&inflight);
        let tx = tx.clone();
        let token = inflight.register(&req.id, &root);
        tasks.spawn(async move {
            let id = req.id.clone();
            let response = protocol::handle(&provider, &inflight, &Context::new(token), req).await;
            inflight.finish(&id);
            let _ = tx.send(response).await;
        });

        // Reap finished tasks so the set does not grow unbounded.
        while tasks.try_join_next().is_some() {}
    }

    info!("Input closed, waiting for in-flight requests");
    while tasks.join_next().await.is_some() {}

    drop(tx);
    writer.await?;
    Ok(())
}
