//! Process wiring: load configuration, build the shared server context,
//! start the UDP/TCP listener pair, and wait for a shutdown signal
//! (spec §4.7, §5, §6). Grounded in `pkg/server/{config,init,server}.go`.

pub mod handler;
pub mod listener;

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::registry::AdapterRegistry;
use crate::adapters::Adapter;
use crate::cli::ServeArgs;
use crate::config;
use crate::dns::tsig::Keyring;
use crate::dns::zone::ZoneRegistry;

/// Immutable, process-lifetime state handed to every request handler
/// invocation (spec §5: "written once during server initialization;
/// read-only during serving").
pub struct ServerContext {
    pub keyring: Keyring,
    pub zones: ZoneRegistry,
    pub handlers: HashMap<String, Arc<dyn Adapter>>,
}

pub async fn run(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let adapters = AdapterRegistry::new();
    let raw = config::load(&args.config, args.config_format)?;

    let mut handlers: HashMap<String, Arc<dyn Adapter>> = HashMap::new();
    for handler_cfg in &raw.handlers {
        let adapter = adapters.build(&handler_cfg.adapter, handler_cfg.adapter_config.clone())?;
        handlers.insert(handler_cfg.name.clone(), adapter);
    }

    let configuration = raw.validate(&adapters)?;
    let context = Arc::new(ServerContext { keyring: configuration.keyring, zones: configuration.zones, handlers });

    log::info!("starting tsigoatd: udp={} tcp={}", args.udp_addr, args.tcp_addr);

    let udp = listener::serve_udp(args.udp_addr, context.clone());
    let tcp = listener::serve_tcp(args.tcp_addr, context.clone());

    tokio::select! {
        result = udp => result?,
        result = tcp => result?,
        () = shutdown_signal() => {
            log::info!("shutdown signal received, stopping listeners");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
