//! Grid placement of components by reference family.
//!
//! Every family gets its own row, counted down from the top of the usable
//! area. Components fill their row left to right at a fixed pitch; a row
//! that runs past the right edge continues one pitch lower from the left.

use std::collections::HashMap;

use log::debug;
use serde::Deserialize;

use crate::{board::Layout, error::BoardError, geometry::Point};

/// Board frame the grid is laid out in
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardFrame {
    pub width: f64,
    pub height: f64,
    /// Keep-out distance from every board edge
    pub margin: f64,
}

impl Default for BoardFrame {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            margin: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Pin to the left edge of the usable area
    Left,
    /// Pin to the bottom edge of the usable area
    Bottom,
}

/// Assigns references to a row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FamilyRule {
    pub name: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub contains: Vec<String>,
    pub row: u32,
    #[serde(default)]
    pub anchor: Option<Anchor>,
}

impl FamilyRule {
    fn matches(&self, reference: &str) -> bool {
        self.prefixes.iter().any(|p| reference.starts_with(p.as_str()))
            || self.contains.iter().any(|c| reference.contains(c.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub pitch_x: f64,
    pub pitch_y: f64,
    /// Row for references no family matches
    pub default_row: u32,
    /// Checked in order, the first match wins
    pub families: Vec<FamilyRule>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            pitch_x: 8.0,
            pitch_y: 8.0,
            default_row: 0,
            families: vec![],
        }
    }
}

impl PlacementConfig {
    pub fn family(&self, reference: &str) -> Option<&FamilyRule> {
        self.families.iter().find(|f| f.matches(reference))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub reference: String,
    pub position: Point,
    pub rotation: f64,
}

/// Computes grid positions for `references`, in order
pub fn place(references: &[String], frame: &BoardFrame, config: &PlacementConfig) -> Vec<Placement> {
    let left = frame.margin;
    let right = frame.width - frame.margin;
    let bottom = frame.margin;
    let top = frame.height - frame.margin;

    let per_line = if config.pitch_x > 0.0 {
        (((right - left) / config.pitch_x).floor() as usize + 1).max(1)
    } else {
        usize::MAX
    };

    let mut slots: HashMap<u32, usize> = HashMap::new();
    references
        .iter()
        .map(|reference| {
            let family = config.family(reference);
            let row = family.map_or(config.default_row, |f| f.row);
            let slot = slots.entry(row).or_default();
            let (line, col) = (*slot / per_line, *slot % per_line);
            *slot += 1;

            let mut x = left + col as f64 * config.pitch_x;
            let mut y = top - (row as f64 + line as f64) * config.pitch_y;
            match family.and_then(|f| f.anchor) {
                Some(Anchor::Left) => x = left,
                Some(Anchor::Bottom) => y = bottom,
                None => {}
            }

            let position = Point::new(x.clamp(left, right.max(left)), y.clamp(bottom.min(top), top));
            debug!(
                "{} ({}) -> row {} col {} at {:?}",
                reference,
                family.map_or("default", |f| f.name.as_str()),
                row,
                col,
                position
            );
            Placement {
                reference: reference.clone(),
                position,
                rotation: 0.0,
            }
        })
        .collect()
}

/// Places every component on `board` and returns how many were moved
pub fn place_board<L: Layout>(
    board: &mut L,
    frame: &BoardFrame,
    config: &PlacementConfig,
) -> Result<usize, BoardError> {
    let placements = place(&board.references(), frame, config);
    for p in &placements {
        board.move_component(&p.reference, p.position, p.rotation)?;
    }
    Ok(placements.len())
}
