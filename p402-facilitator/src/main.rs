//! x402 facilitator HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config (config.toml in the current directory)
//! p402-facilitator
//!
//! # Run with a custom config path and port
//! p402-facilitator --config /etc/p402/facilitator.toml --port 8080
//!
//! # Configure logging
//! RUST_LOG=p402=debug p402-facilitator
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use clap::Parser;
use p402::chain::ChainId;
use p402::networks::NetworkRegistry;
use p402::replay::MemoryReplayStore;
use p402::scheme::{EXACT_SCHEME, SchemeRegistry};
use p402_hedera::HEDERA_NETWORKS;
use p402_hedera::account::AccountId;
use p402_hedera::exact::HederaExactFacilitator;
use p402_ton::TON_NETWORKS;
use p402_ton::exact::TonExactFacilitator;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use p402_facilitator::config::FacilitatorConfig;
use p402_facilitator::handlers::facilitator_router;
use p402_facilitator::rpc::{HederaMirrorProvider, TonIndexerRpc};

/// Facilitator server command line.
#[derive(Debug, Parser)]
#[command(name = "p402-facilitator", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured bind address.
    #[arg(long, env = "HOST")]
    host: Option<IpAddr>,

    /// Override the configured port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("facilitator failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = FacilitatorConfig::load_from(&cli.config)?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    tracing::info!(
        host = %config.host,
        port = config.port,
        hedera = config.hedera.len(),
        ton = config.ton.len(),
        "loaded configuration"
    );

    let registry = build_registry(&config)?;
    if registry.values().next().is_none() {
        tracing::warn!("no chains configured, facilitator will report no supported kinds");
    }

    let app = Router::new()
        .merge(facilitator_router(Arc::new(registry)))
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("facilitator listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("facilitator shut down");
    Ok(())
}

/// Known networks the shipped chain backends understand.
fn known_networks() -> NetworkRegistry {
    NetworkRegistry::new()
        .with_networks(HEDERA_NETWORKS)
        .with_networks(TON_NETWORKS)
}

/// Resolves a configured network key, which may be a `namespace:reference`
/// chain identifier or a well-known network name like `hedera-testnet`.
fn resolve_network(known: &NetworkRegistry, network: &str) -> Option<ChainId> {
    ChainId::from_str(network)
        .ok()
        .or_else(|| known.chain_id_by_name(network).cloned())
}

/// Logs the registration, naming the network when it is a known one.
fn log_registration(known: &NetworkRegistry, chain_id: &ChainId, scheme: &str) {
    match known.name_by_chain_id(chain_id) {
        Some(name) => tracing::info!(network = %chain_id, name, "registered {scheme} scheme"),
        None => tracing::warn!(
            network = %chain_id,
            "network is not in the known-network table, registering anyway"
        ),
    }
}

/// Builds the scheme registry from the configured chain backends.
fn build_registry(config: &FacilitatorConfig) -> Result<SchemeRegistry, Box<dyn std::error::Error>> {
    let known = known_networks();
    let mut registry = SchemeRegistry::new();

    for (network, chain) in &config.hedera {
        let Some(chain_id) = resolve_network(&known, network) else {
            tracing::warn!(
                network = %network,
                "skipping chain: neither a chain identifier nor a known network name"
            );
            continue;
        };
        if FacilitatorConfig::is_unresolved(&chain.submit_url) {
            tracing::warn!(
                network = %network,
                "skipping chain: submit_url not resolved (missing env var?)"
            );
            continue;
        }
        let operators = chain
            .operators
            .iter()
            .map(|s| AccountId::from_str(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid operator account for {network}: {e}"))?;

        let provider = HederaMirrorProvider::try_new(
            chain_id.clone(),
            &chain.mirror_url,
            &chain.submit_url,
            operators,
        )
        .map_err(|e| format!("invalid URL for {network}: {e}"))?;
        log_registration(&known, &chain_id, "hedera exact");
        registry.register(
            chain_id,
            EXACT_SCHEME,
            Box::new(HederaExactFacilitator::new(
                provider,
                MemoryReplayStore::new(),
                chain.scheme_config(),
            )),
        );
    }

    for (network, chain) in &config.ton {
        let Some(chain_id) = resolve_network(&known, network) else {
            tracing::warn!(
                network = %network,
                "skipping chain: neither a chain identifier nor a known network name"
            );
            continue;
        };
        let api_key = chain
            .api_key
            .clone()
            .filter(|key| !FacilitatorConfig::is_unresolved(key));
        let rpc = TonIndexerRpc::try_new(chain_id.clone(), &chain.api_url, api_key)
            .map_err(|e| format!("invalid URL for {network}: {e}"))?;
        log_registration(&known, &chain_id, "ton exact");
        registry.register(
            chain_id,
            EXACT_SCHEME,
            Box::new(TonExactFacilitator::new(
                rpc,
                MemoryReplayStore::new(),
                chain.scheme_config(),
            )),
        );
    }

    Ok(registry)
}

/// Waits for Ctrl-C or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl-c");
        tracing::info!("received ctrl-c, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p402::facilitator::Facilitator;

    #[test]
    fn known_networks_cover_the_shipped_backends() {
        let known = known_networks();
        assert_eq!(
            known.name_by_chain_id(&ChainId::new("hedera", "testnet")),
            Some("hedera-testnet")
        );
        assert_eq!(
            known.name_by_chain_id(&ChainId::new("ton", "mainnet")),
            Some("ton")
        );
        assert!(known.name_by_chain_id(&ChainId::new("eip155", "8453")).is_none());
    }

    #[test]
    fn network_keys_resolve_by_name_or_chain_id() {
        let known = known_networks();
        assert_eq!(
            resolve_network(&known, "hedera-testnet"),
            Some(ChainId::new("hedera", "testnet"))
        );
        assert_eq!(
            resolve_network(&known, "hedera:previewnet"),
            Some(ChainId::new("hedera", "previewnet"))
        );
        assert_eq!(resolve_network(&known, "nonsense"), None);
    }

    #[tokio::test]
    async fn registry_serves_chains_configured_by_well_known_name() {
        let config: FacilitatorConfig = toml::from_str(
            r#"
            [hedera."hedera-testnet"]
            mirror_url = "https://testnet.mirrornode.hedera.com"
            submit_url = "https://relay.internal/submit"
            operators = ["0.0.5001"]

            [ton."ton"]
            api_url = "https://toncenter.com/api/v3"

            [ton."nonsense"]
            api_url = "https://example.com"
            "#,
        )
        .unwrap();

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.values().count(), 2);

        let supported = registry.supported().await.unwrap();
        let networks: Vec<_> = supported.kinds.iter().map(|k| k.network.as_str()).collect();
        assert_eq!(networks, ["hedera:testnet", "ton:mainnet"]);
    }

    #[test]
    fn unlisted_chain_id_still_registers() {
        let config: FacilitatorConfig = toml::from_str(
            r#"
            [ton."ton:sandbox"]
            api_url = "https://sandbox.example.com/api/v3"
            "#,
        )
        .unwrap();

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.values().count(), 1);
    }
}
