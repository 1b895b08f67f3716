use anyhow::Context;
use rhythm_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, no_open: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let port = port.unwrap_or(config.server.port);
    let name = config.project.name;

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!("rhythm API for '{name}' → http://localhost:{actual_port}/api");

        tokio::select! {
            res = rhythm_server::serve_on(root_buf, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
