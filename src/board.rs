use std::path::Path;

use crate::{
    error::BoardError,
    footprint::FootprintId,
    geometry::{Point, Rect, Segment},
};

/// The board construction operations the connectivity builder needs.
///
/// Handles are opaque to the builder and only need to be passed back to
/// the board that produced them.
pub trait Board {
    type Net;
    type Component;
    type Pad;

    fn create_net(&mut self, name: &str) -> Result<Self::Net, BoardError>;

    /// Fails with [`BoardError::FootprintNotFound`] when the footprint cannot
    /// be loaded; the builder treats that as a skippable record.
    fn create_component_instance(
        &mut self,
        footprint: &FootprintId,
        reference: &str,
    ) -> Result<Self::Component, BoardError>;

    fn find_component_instance(&self, reference: &str) -> Option<Self::Component>;

    fn find_pad(&self, component: &Self::Component, pin: &str) -> Option<Self::Pad>;

    fn attach_pad_to_net(&mut self, pad: &Self::Pad, net: &Self::Net) -> Result<(), BoardError>;

    /// Recomputes connectivity from the current pad assignments
    fn rebuild_connectivity(&mut self) -> Result<(), BoardError>;

    fn save_board(&self, path: &Path) -> Result<(), BoardError>;
}

/// Geometry operations used by placement, outline and routing
pub trait Layout {
    /// References of all component instances, in creation order
    fn references(&self) -> Vec<String>;

    fn move_component(
        &mut self,
        reference: &str,
        position: Point,
        rotation: f64,
    ) -> Result<(), BoardError>;

    /// Bounding box of all pads of all components
    fn pad_bounds(&self) -> Option<Rect>;

    /// Removes all Edge.Cuts drawings and adds `segments`
    fn replace_outline(&mut self, segments: Vec<Segment>);

    /// Absolute pad positions of every net, in attachment order
    fn net_pads(&self) -> Vec<(String, Vec<Point>)>;

    fn add_track(&mut self, net: &str, track: Segment) -> Result<(), BoardError>;
}
