use catnap::config::Config;
use catnap::handler::DocRoot;
use catnap::server;

fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.log_level()?)
        .init();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(serve(cfg))
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let doc_root = DocRoot::new(&cfg.doc_root);
    tracing::info!("Serving files from {}", doc_root.as_str());

    let mut running = 0;
    for endpoint in &cfg.listen {
        match server::listen(endpoint, doc_root.clone()) {
            Ok(_) => running += 1,
            Err(e) => tracing::error!(
                op = e.op().unwrap_or("setup"),
                "Failed to start listener on {}: {}",
                endpoint,
                e
            ),
        }
    }

    if running == 0 {
        anyhow::bail!("no listener could be started");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
