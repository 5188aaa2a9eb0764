use clap::Parser;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use system::{AccumulatorConfig, DEFAULT_POLYGON_THRESHOLD};

/// Relays collaborative drawing points and groups them into polygons.
#[derive(Debug, Parser)]
#[command(name = "collab-paint-server", version)]
pub struct Opts {
    /// Address the HTTP/WebSocket listener binds to.
    #[arg(long, env = "COLLAB_PAINT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Points per session that complete a polygon.
    #[arg(
        long,
        env = "COLLAB_PAINT_POLYGON_THRESHOLD",
        default_value_t = NonZeroUsize::new(DEFAULT_POLYGON_THRESHOLD).unwrap_or(NonZeroUsize::MIN)
    )]
    pub polygon_threshold: NonZeroUsize,
}

impl Opts {
    pub fn accumulator_config(&self) -> AccumulatorConfig {
        AccumulatorConfig {
            threshold: self.polygon_threshold,
        }
    }
}
