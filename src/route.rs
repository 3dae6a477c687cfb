use log::{debug, info};
use serde::Deserialize;

use crate::{board::Layout, error::BoardError, geometry::Segment};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub track_width: f64,
    pub layer: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            track_width: 0.25,
            layer: "F.Cu".to_owned(),
        }
    }
}

/// Connects the pads of every net with straight tracks, pad to pad in
/// attachment order. Returns the number of tracks added.
pub fn route_daisy_chain<L: Layout>(
    board: &mut L,
    config: &RoutingConfig,
) -> Result<usize, BoardError> {
    let mut count = 0;
    for (net, pads) in board.net_pads() {
        if net.is_empty() || pads.len() < 2 {
            continue;
        }
        debug!("Routing {} ({} pads)", net, pads.len());
        for pair in pads.windows(2) {
            board.add_track(
                &net,
                Segment {
                    start: pair[0],
                    end: pair[1],
                    width: config.track_width,
                    layer: config.layer.clone(),
                },
            )?;
            count += 1;
        }
    }
    info!("Routed {} tracks", count);
    Ok(count)
}
