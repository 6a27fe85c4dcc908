//! `sidebar-demo`: drives the sidebar engine against the in-memory recording
//! transport and logs what each simulated client would receive.
//!
//! # What happens at startup
//!
//! 1. CLI arguments are parsed with `clap`; every flag can also come from a
//!    `SIDEBAR_*` environment variable.
//! 2. The TOML config is loaded (defaults when the file is absent).
//! 3. `tracing_subscriber` is initialised.  `RUST_LOG` wins over the config's
//!    `log_level`.
//! 4. A "Stats" board is built with an animated title, static, dynamic and
//!    conditional lines, and periodic refreshes.  With a pager switch
//!    interval configured, a second page is added and rotated.
//! 5. Simulated viewers on different protocol versions are shown the board
//!    until the duration elapses or Ctrl+C is pressed.
//! 6. A per-viewer packet summary is logged and every board is destroyed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sidebar_core::{ProtocolVersion, Text, ViewerId};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use sidebar_server::application::board::Board;
use sidebar_server::application::content::{ScoreFormat, ViewerContext};
use sidebar_server::application::pager::SidebarPager;
use sidebar_server::application::registry::{BoardRegistry, BoardSettings};
use sidebar_server::application::title::TitleSource;
use sidebar_server::infrastructure::recording::RecordingTransport;
use sidebar_server::infrastructure::storage::config::{load_config, SidebarConfig};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "sidebar-demo",
    about = "Renders a demo sidebar to simulated clients and logs the packets",
    version
)]
struct Cli {
    /// Path of the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = "sidebar.toml", env = "SIDEBAR_CONFIG")]
    config: PathBuf,

    /// Number of simulated viewers.
    #[arg(long, default_value_t = 3, env = "SIDEBAR_VIEWERS")]
    viewers: usize,

    /// Protocol version of the first viewer; overrides the config file.
    /// Further viewers alternate with 1.8 and 1.13 clients.
    #[arg(long, env = "SIDEBAR_PROTOCOL_VERSION")]
    protocol_version: Option<i32>,

    /// How long to run before tearing everything down, in seconds.
    #[arg(long, default_value_t = 3, env = "SIDEBAR_DURATION")]
    duration_secs: u64,
}

#[derive(Debug)]
struct DemoConfig {
    file: SidebarConfig,
    viewers: Vec<ProtocolVersion>,
    duration: Duration,
}

impl Cli {
    /// Loads the config file and resolves the viewer versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the chosen protocol version is older than 1.8.
    fn into_demo_config(self) -> anyhow::Result<DemoConfig> {
        let file = load_config(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;

        let first = self
            .protocol_version
            .map(ProtocolVersion)
            .unwrap_or_else(|| file.protocol.version());
        if first.packet_ids().is_none() {
            anyhow::bail!("{first} is older than the oldest supported client");
        }

        let rotation = [first, ProtocolVersion::MINECRAFT_1_8, ProtocolVersion::MINECRAFT_1_13];
        let viewers = rotation.iter().copied().cycle().take(self.viewers).collect();

        Ok(DemoConfig {
            file,
            viewers,
            duration: Duration::from_secs(self.duration_secs),
        })
    }
}

// ── Demo boards ───────────────────────────────────────────────────────────────

async fn build_stats_board(registry: &BoardRegistry, ticks: Arc<AtomicU64>) -> anyhow::Result<Arc<Board>> {
    let frames = vec![
        Text::legacy("§6§lStats"),
        Text::legacy("§e§lStats"),
        Text::legacy("§f§lStats"),
    ];
    let board = registry.create_board(TitleSource::animated(frames.into_iter().cycle())).await?;

    board.add_text_line("§7Kills: §f5").await?;
    board.add_blank_line().await?;
    board
        .add_updatable_line(|ctx: &ViewerContext| Ok(Text::plain(format!("Client: {}", ctx.protocol_version))))
        .await?;
    board
        .add_conditional_line(
            |_: &ViewerContext| Ok(Text::json(r#"{"text":"Modern client","color":"green"}"#)),
            |ctx: &ViewerContext| Ok(ctx.protocol_version >= ProtocolVersion::MINECRAFT_1_20_3),
        )
        .await?;
    let uptime = board
        .add_updatable_line(move |_: &ViewerContext| {
            Ok(Text::legacy(format!("§bTicks: §f{}", ticks.load(Ordering::Relaxed))))
        })
        .await?;
    board
        .set_line_score_format(uptime, Some(ScoreFormat::fixed(|_: &ViewerContext| Ok(Text::plain("live")))))
        .await?;
    board.update_line_periodically(uptime, Duration::from_millis(250)).await?;
    Ok(board)
}

async fn build_pager(
    registry: &BoardRegistry,
    stats: Arc<Board>,
    interval: Duration,
) -> anyhow::Result<SidebarPager> {
    let top = registry.create_board("§a§lTop players").await?;
    for (rank, name) in ["Alex", "Steve", "Notch"].iter().enumerate() {
        top.add_text_line(format!("§7#{} §f{name}", rank + 1)).await?;
    }
    let pager = SidebarPager::new(vec![stats, top], Some(interval))?;
    pager
        .add_page_line(|page, pages| Text::legacy(format!("§8Page {page}/{pages}")))
        .await?;
    Ok(pager)
}

fn summarize(transport: &RecordingTransport, viewer: ViewerId) -> BTreeMap<&'static str, usize> {
    let mut kinds = BTreeMap::new();
    for packet in transport.packets_for(viewer) {
        *kinds.entry(packet.kind()).or_insert(0) += 1;
    }
    kinds
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_demo_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.file.logging.log_level)),
        )
        .init();

    info!(viewers = config.viewers.len(), duration = ?config.duration, "sidebar demo starting");

    let transport = Arc::new(RecordingTransport::new());
    let registry = BoardRegistry::with_options(
        transport.clone(),
        transport.clone(),
        Arc::new(sidebar_core::DefaultTextRenderer),
        BoardSettings::from(&config.file.refresh),
    );

    let ticks = Arc::new(AtomicU64::new(0));
    let stats = build_stats_board(&registry, Arc::clone(&ticks)).await?;
    if let Some(period) = config.file.refresh.board_refresh_interval() {
        stats.update_lines_periodically(period).await?;
    }

    let pager = match config.file.refresh.pager_switch_interval() {
        Some(interval) => Some(build_pager(&registry, Arc::clone(&stats), interval).await?),
        None => None,
    };

    let mut viewers = Vec::with_capacity(config.viewers.len());
    for version in &config.viewers {
        let viewer = Uuid::new_v4();
        transport.connect(viewer, *version);
        match &pager {
            Some(pager) => pager.show(viewer).await?,
            None => {
                stats.add_viewer(viewer).await?;
            }
        }
        info!(%viewer, %version, "viewer joined");
        viewers.push(viewer);
    }

    let ticker = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(50));
            loop {
                interval.tick().await;
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    tokio::select! {
        _ = tokio::time::sleep(config.duration) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            info!("received Ctrl+C, shutting down");
        }
    }
    ticker.abort();

    for viewer in &viewers {
        info!(%viewer, packets = ?summarize(&transport, *viewer), "packets received");
    }

    if let Some(pager) = pager {
        pager.destroy().await;
    }
    registry.shutdown().await;
    info!("sidebar demo stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn absent_config() -> String {
        std::env::temp_dir()
            .join(format!("sidebar-demo-{}.toml", Uuid::new_v4()))
            .display()
            .to_string()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sidebar-demo"]);
        assert_eq!(cli.viewers, 3);
        assert_eq!(cli.duration_secs, 3);
        assert_eq!(cli.config, PathBuf::from("sidebar.toml"));
    }

    #[test]
    fn test_viewer_versions_rotate_from_config_default() {
        // Arrange
        let path = absent_config();
        let cli = Cli::parse_from(["sidebar-demo", "--config", path.as_str(), "--viewers", "4"]);

        // Act
        let config = cli.into_demo_config().unwrap();

        // Assert
        assert_eq!(
            config.viewers,
            vec![
                ProtocolVersion::MINECRAFT_1_20_3,
                ProtocolVersion::MINECRAFT_1_8,
                ProtocolVersion::MINECRAFT_1_13,
                ProtocolVersion::MINECRAFT_1_20_3,
            ]
        );
    }

    #[test]
    fn test_protocol_version_flag_overrides_config() {
        let path = absent_config();
        let cli = Cli::parse_from([
            "sidebar-demo",
            "--config",
            path.as_str(),
            "--protocol-version",
            "766",
        ]);
        let config = cli.into_demo_config().unwrap();
        assert_eq!(config.viewers[0], ProtocolVersion::MINECRAFT_1_20_5);
    }

    #[test]
    fn test_unsupported_protocol_version_is_rejected() {
        let path = absent_config();
        let cli = Cli::parse_from([
            "sidebar-demo",
            "--config",
            path.as_str(),
            "--protocol-version",
            "5",
        ]);
        assert!(cli.into_demo_config().is_err());
    }
}
