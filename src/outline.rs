use log::info;
use serde::Deserialize;

use crate::{
    board::Layout,
    error::BoardError,
    geometry::{Point, Rect, Segment},
    memory::EDGE_CUTS,
    placement::BoardFrame,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Edge.Cuts line width
    pub line_width: f64,
    /// Clearance between the pads and a fitted outline
    pub fit_margin: f64,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            line_width: 0.1,
            fit_margin: 3.0,
        }
    }
}

/// Closed rectangle as four Edge.Cuts segments
pub fn rectangle(rect: Rect, line_width: f64) -> Vec<Segment> {
    let corners = [
        rect.min,
        Point::new(rect.max.x, rect.min.y),
        rect.max,
        Point::new(rect.min.x, rect.max.y),
    ];
    (0..corners.len())
        .map(|i| Segment {
            start: corners[i],
            end: corners[(i + 1) % corners.len()],
            width: line_width,
            layer: EDGE_CUTS.to_owned(),
        })
        .collect()
}

/// Redraws the outline as the full board frame
pub fn draw_frame<L: Layout>(board: &mut L, frame: &BoardFrame, config: &OutlineConfig) -> Rect {
    let rect = Rect {
        min: Point::default(),
        max: Point::new(frame.width, frame.height),
    };
    board.replace_outline(rectangle(rect, config.line_width));
    info!("Outline {} x {} mm", frame.width, frame.height);
    rect
}

/// Redraws the outline around all pads, grown by the fit margin
pub fn fit_outline<L: Layout>(board: &mut L, config: &OutlineConfig) -> Result<Rect, BoardError> {
    let rect = board
        .pad_bounds()
        .ok_or(BoardError::EmptyBoard)?
        .grow(config.fit_margin);
    board.replace_outline(rectangle(rect, config.line_width));
    info!(
        "Fitted outline {:.1} x {:.1} mm ({} mm margin)",
        rect.width(),
        rect.height(),
        config.fit_margin
    );
    Ok(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::Board,
        footprint::{Footprint, FootprintLibrary, PadDef},
        memory::MemoryBoard,
    };

    fn board_with_pad() -> MemoryBoard {
        let mut library = FootprintLibrary::default();
        library.add(Footprint {
            id: "Test:Pad".parse().unwrap(),
            pads: vec![PadDef {
                number: "1".to_owned(),
                at: Point::default(),
                size: Point::new(2.0, 2.0),
            }],
        });
        let mut board = MemoryBoard::new(library);
        board
            .create_component_instance(&"Test:Pad".parse().unwrap(), "TP1")
            .unwrap();
        board
            .create_component_instance(&"Test:Pad".parse().unwrap(), "TP2")
            .unwrap();
        board
            .move_component("TP2", Point::new(10.0, 4.0), 0.0)
            .unwrap();
        board
    }

    #[test]
    fn rectangle_is_closed() {
        let rect = Rect {
            min: Point::new(0.0, 0.0),
            max: Point::new(300.0, 100.0),
        };
        let segments = rectangle(rect, 0.1);
        assert_eq!(segments.len(), 4);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(segments[3].end, segments[0].start);
        assert!(segments.iter().all(|s| s.layer == EDGE_CUTS));
    }

    #[test]
    fn redrawing_replaces_old_outline() {
        let mut board = board_with_pad();
        draw_frame(&mut board, &BoardFrame::default(), &OutlineConfig::default());
        draw_frame(&mut board, &BoardFrame::default(), &OutlineConfig::default());
        assert_eq!(board.outline().len(), 4);
    }

    #[test]
    fn fitted_outline_surrounds_pads() {
        let mut board = board_with_pad();
        let rect = fit_outline(&mut board, &OutlineConfig::default()).unwrap();
        assert_eq!(rect.min, Point::new(-4.0, -4.0));
        assert_eq!(rect.max, Point::new(14.0, 8.0));
        assert_eq!(board.outline().len(), 4);
    }

    #[test]
    fn fitting_an_empty_board_fails() {
        let mut board = MemoryBoard::new(FootprintLibrary::default());
        assert!(matches!(
            fit_outline(&mut board, &OutlineConfig::default()),
            Err(BoardError::EmptyBoard)
        ));
    }
}
