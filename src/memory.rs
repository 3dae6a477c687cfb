use std::{collections::HashMap, path::Path};

use log::{debug, info};

use crate::{
    board::{Board, Layout},
    document::Endpoint,
    error::BoardError,
    footprint::{Footprint, FootprintId, FootprintLibrary},
    geometry::{Point, Rect, Segment},
    sexpr::SExpr,
};

pub const EDGE_CUTS: &str = "Edge.Cuts";

/// Net handle: the net code, 0 being the unconnected net
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetCode(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentIndex(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadRef {
    component: usize,
    pad: usize,
}

#[derive(Debug, Clone)]
pub struct PlacedFootprint {
    pub reference: String,
    pub footprint: Footprint,
    pub position: Point,
    pub rotation: f64,
    /// Net code per pad, parallel to `footprint.pads`
    pad_nets: Vec<u32>,
}

impl PlacedFootprint {
    pub fn pad_position(&self, pad: usize) -> Point {
        self.position + self.footprint.pads[pad].at.rotated(self.rotation)
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub net: u32,
    pub segment: Segment,
}

/// A board held entirely in memory.
///
/// Footprints are loaded from a [`FootprintLibrary`]. Connectivity read
/// back through [`MemoryBoard::connectivity`] reflects the state at the
/// last [`Board::rebuild_connectivity`] call.
#[derive(Debug, Clone)]
pub struct MemoryBoard {
    library: FootprintLibrary,
    nets: Vec<String>,
    /// Pads per net code, in attachment order
    net_members: Vec<Vec<PadRef>>,
    components: Vec<PlacedFootprint>,
    outline: Vec<Segment>,
    tracks: Vec<Track>,
    connectivity: HashMap<Endpoint, String>,
}

impl MemoryBoard {
    pub fn new(library: FootprintLibrary) -> Self {
        Self {
            library,
            nets: vec![String::new()],
            net_members: vec![vec![]],
            components: vec![],
            outline: vec![],
            tracks: vec![],
            connectivity: HashMap::new(),
        }
    }

    /// (reference, pin) → net name as of the last connectivity rebuild
    pub fn connectivity(&self) -> &HashMap<Endpoint, String> {
        &self.connectivity
    }

    pub fn net_names(&self) -> impl Iterator<Item = &str> {
        self.nets.iter().skip(1).map(String::as_str)
    }

    pub fn components(&self) -> &[PlacedFootprint] {
        &self.components
    }

    pub fn component(&self, reference: &str) -> Option<&PlacedFootprint> {
        self.components.iter().find(|c| c.reference == reference)
    }

    pub fn outline(&self) -> &[Segment] {
        &self.outline
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn net_code(&self, name: &str) -> Option<u32> {
        self.nets.iter().position(|n| n == name).map(|i| i as u32)
    }

    fn to_sexpr(&self) -> SExpr<'static> {
        let mut items = vec![
            SExpr::list("version", [SExpr::atom("20240108")]),
            SExpr::list("generator", [SExpr::string("netlist-board")]),
            SExpr::list(
                "general",
                [SExpr::list("thickness", [SExpr::atom("1.6")])],
            ),
            SExpr::list(
                "layers",
                [
                    SExpr::list(
                        "0",
                        [SExpr::string("F.Cu"), SExpr::atom("signal")],
                    ),
                    SExpr::list(
                        "31",
                        [SExpr::string("B.Cu"), SExpr::atom("signal")],
                    ),
                    SExpr::list("44", [SExpr::string(EDGE_CUTS), SExpr::atom("user")]),
                ],
            ),
        ];

        for (code, name) in self.nets.iter().enumerate() {
            items.push(SExpr::list(
                "net",
                [SExpr::atom(code.to_string()), SExpr::string(name.clone())],
            ));
        }

        for comp in &self.components {
            let mut fp = vec![
                SExpr::string(comp.footprint.id.to_string()),
                SExpr::list("layer", [SExpr::string("F.Cu")]),
                at(comp.position, Some(comp.rotation)),
                SExpr::list(
                    "property",
                    [
                        SExpr::string("Reference"),
                        SExpr::string(comp.reference.clone()),
                    ],
                ),
            ];
            for (pad, &code) in comp.footprint.pads.iter().zip(&comp.pad_nets) {
                let mut p = vec![
                    SExpr::string(pad.number.clone()),
                    SExpr::atom("smd"),
                    SExpr::atom("rect"),
                    at(pad.at, None),
                    SExpr::list("size", [mm(pad.size.x), mm(pad.size.y)]),
                ];
                if code != 0 {
                    p.push(SExpr::list(
                        "net",
                        [
                            SExpr::atom(code.to_string()),
                            SExpr::string(self.nets[code as usize].clone()),
                        ],
                    ));
                }
                fp.push(SExpr::list("pad", p));
            }
            items.push(SExpr::list("footprint", fp));
        }

        for seg in &self.outline {
            items.push(SExpr::list(
                "gr_line",
                [
                    point("start", seg.start),
                    point("end", seg.end),
                    SExpr::list(
                        "stroke",
                        [
                            SExpr::list("width", [mm(seg.width)]),
                            SExpr::list("type", [SExpr::atom("solid")]),
                        ],
                    ),
                    SExpr::list("layer", [SExpr::string(seg.layer.clone())]),
                ],
            ));
        }

        for track in &self.tracks {
            items.push(SExpr::list(
                "segment",
                [
                    point("start", track.segment.start),
                    point("end", track.segment.end),
                    SExpr::list("width", [mm(track.segment.width)]),
                    SExpr::list("layer", [SExpr::string(track.segment.layer.clone())]),
                    SExpr::list("net", [SExpr::atom(track.net.to_string())]),
                ],
            ));
        }

        SExpr::list("kicad_pcb", items)
    }
}

/// Formats millimetres with at most four decimals
fn format_mm(v: f64) -> String {
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_owned(),
        s => s.to_owned(),
    }
}

fn mm(v: f64) -> SExpr<'static> {
    SExpr::atom(format_mm(v))
}

fn point(label: &'static str, p: Point) -> SExpr<'static> {
    SExpr::list(label, [mm(p.x), mm(p.y)])
}

fn at(p: Point, rotation: Option<f64>) -> SExpr<'static> {
    let mut args = vec![mm(p.x), mm(p.y)];
    if let Some(r) = rotation.filter(|r| *r != 0.0) {
        args.push(mm(r));
    }
    SExpr::list("at", args)
}

impl Board for MemoryBoard {
    type Net = NetCode;
    type Component = ComponentIndex;
    type Pad = PadRef;

    fn create_net(&mut self, name: &str) -> Result<NetCode, BoardError> {
        // "" is the unconnected net and cannot be created
        if name.is_empty() {
            return Err(BoardError::EmptyNetName);
        }
        if let Some(code) = self.net_code(name) {
            return Ok(NetCode(code));
        }
        self.nets.push(name.to_owned());
        self.net_members.push(vec![]);
        let code = (self.nets.len() - 1) as u32;
        debug!("Net {} = {}", code, name);
        Ok(NetCode(code))
    }

    fn create_component_instance(
        &mut self,
        footprint: &FootprintId,
        reference: &str,
    ) -> Result<ComponentIndex, BoardError> {
        if self.component(reference).is_some() {
            return Err(BoardError::DuplicateReference(reference.to_owned()));
        }
        let footprint = self.library.load(footprint)?;
        let pad_nets = vec![0; footprint.pads.len()];
        self.components.push(PlacedFootprint {
            reference: reference.to_owned(),
            footprint,
            position: Point::default(),
            rotation: 0.0,
            pad_nets,
        });
        Ok(ComponentIndex(self.components.len() - 1))
    }

    fn find_component_instance(&self, reference: &str) -> Option<ComponentIndex> {
        self.components
            .iter()
            .position(|c| c.reference == reference)
            .map(ComponentIndex)
    }

    fn find_pad(&self, component: &ComponentIndex, pin: &str) -> Option<PadRef> {
        let comp = self.components.get(component.0)?;
        let pad = comp.footprint.pads.iter().position(|p| p.number == pin)?;
        Some(PadRef {
            component: component.0,
            pad,
        })
    }

    /// Attaches every pad of the component that shares the number of `pad`
    fn attach_pad_to_net(&mut self, pad: &PadRef, net: &NetCode) -> Result<(), BoardError> {
        if net.0 as usize >= self.nets.len() {
            return Err(BoardError::InvalidHandle);
        }
        let comp = self
            .components
            .get_mut(pad.component)
            .ok_or(BoardError::InvalidHandle)?;
        let number = &comp
            .footprint
            .pads
            .get(pad.pad)
            .ok_or(BoardError::InvalidHandle)?
            .number;
        let same: Vec<usize> = comp
            .footprint
            .pads
            .iter()
            .enumerate()
            .filter(|(_, p)| &p.number == number)
            .map(|(i, _)| i)
            .collect();

        for index in same {
            let member = PadRef {
                component: pad.component,
                pad: index,
            };
            let previous = std::mem::replace(&mut comp.pad_nets[index], net.0);
            self.net_members[previous as usize].retain(|p| *p != member);
            if net.0 != 0 {
                self.net_members[net.0 as usize].push(member);
            }
        }
        Ok(())
    }

    fn rebuild_connectivity(&mut self) -> Result<(), BoardError> {
        self.connectivity.clear();
        for comp in &self.components {
            for (pad, &code) in comp.footprint.pads.iter().zip(&comp.pad_nets) {
                if code == 0 {
                    continue;
                }
                self.connectivity.insert(
                    Endpoint::new(comp.reference.clone(), pad.number.clone()),
                    self.nets[code as usize].clone(),
                );
            }
        }
        debug!("Connectivity: {} connected pads", self.connectivity.len());
        Ok(())
    }

    fn save_board(&self, path: &Path) -> Result<(), BoardError> {
        info!("Writing board to {}", path.display());
        std::fs::write(path, self.to_sexpr().pretty()).map_err(|source| BoardError::Save {
            path: path.to_owned(),
            source,
        })
    }
}

impl Layout for MemoryBoard {
    fn references(&self) -> Vec<String> {
        self.components.iter().map(|c| c.reference.clone()).collect()
    }

    fn move_component(
        &mut self,
        reference: &str,
        position: Point,
        rotation: f64,
    ) -> Result<(), BoardError> {
        let comp = self
            .components
            .iter_mut()
            .find(|c| c.reference == reference)
            .ok_or_else(|| BoardError::UnknownComponent(reference.to_owned()))?;
        comp.position = position;
        comp.rotation = rotation;
        Ok(())
    }

    fn pad_bounds(&self) -> Option<Rect> {
        self.components
            .iter()
            .flat_map(|c| {
                c.footprint
                    .pads
                    .iter()
                    .map(|p| p.bounds(c.position, c.rotation))
            })
            .reduce(Rect::union)
    }

    fn replace_outline(&mut self, segments: Vec<Segment>) {
        self.outline.retain(|s| s.layer != EDGE_CUTS);
        self.outline.extend(segments);
    }

    fn net_pads(&self) -> Vec<(String, Vec<Point>)> {
        self.nets
            .iter()
            .zip(&self.net_members)
            .skip(1)
            .map(|(name, pads)| {
                let points = pads
                    .iter()
                    .map(|p| self.components[p.component].pad_position(p.pad))
                    .collect();
                (name.clone(), points)
            })
            .collect()
    }

    fn add_track(&mut self, net: &str, track: Segment) -> Result<(), BoardError> {
        let code = self
            .net_code(net)
            .ok_or_else(|| BoardError::UnknownNet(net.to_owned()))?;
        self.tracks.push(Track {
            net: code,
            segment: track,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::build, document::Document, footprint::PadDef, sexpr::parse_document};
    use rstest::*;

    macro_rules! test_data {
        ($fname:expr) => {
            std::fs::read_to_string(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/resources/test/",
                $fname
            ))
            .unwrap()
        };
    }

    fn test_board() -> MemoryBoard {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/test/footprints");
        MemoryBoard::new(FootprintLibrary::new(vec![path.into()]))
    }

    #[test]
    fn connectivity_round_trips() {
        let i = &test_data!("blinky.net");
        let document = Document::parse(i).unwrap();
        let mut board = test_board();

        let report = build(&document, &mut board).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.components_created, 4);
        assert_eq!(report.nets_created, 3);

        let expected: HashMap<Endpoint, String> = document
            .assignments()
            .map(|(e, net)| (e.clone(), net.to_owned()))
            .collect();
        assert_eq!(board.connectivity(), &expected);
    }

    #[test]
    fn round_trip_skips_failed_endpoints() {
        let document = Document::parse(
            r#"(comp (ref "R1") (footprint "Resistor_SMD:R_0603_1608Metric"))
               (net (name "A") (node (ref "R1") (pin "1")) (node (ref "R9") (pin "1")))
               (net (name "B") (node (ref "R1") (pin "2")) (node (ref "R1") (pin "7")))"#,
        )
        .unwrap();
        let mut board = test_board();

        let report = build(&document, &mut board).unwrap();
        assert_eq!(report.failures.len(), 2);

        let mut got: Vec<_> = board
            .connectivity()
            .iter()
            .map(|(e, n)| (e.reference.as_str(), e.pin.as_str(), n.as_str()))
            .collect();
        got.sort();
        assert_eq!(got, [("R1", "1", "A"), ("R1", "2", "B")]);
    }

    #[test]
    fn connectivity_is_empty_until_rebuilt() {
        let mut board = test_board();
        let net = board.create_net("GND").unwrap();
        let comp = board
            .create_component_instance(&"Resistor_SMD:R_0603_1608Metric".parse().unwrap(), "R1")
            .unwrap();
        let pad = board.find_pad(&comp, "1").unwrap();
        board.attach_pad_to_net(&pad, &net).unwrap();
        assert!(board.connectivity().is_empty());
        board.rebuild_connectivity().unwrap();
        assert_eq!(board.connectivity().len(), 1);
    }

    #[test]
    fn nets_are_numbered_from_one_and_deduplicated() {
        let mut board = test_board();
        assert_eq!(board.create_net("GND").unwrap(), NetCode(1));
        assert_eq!(board.create_net("VCC").unwrap(), NetCode(2));
        assert_eq!(board.create_net("GND").unwrap(), NetCode(1));
        assert_eq!(board.net_names().collect::<Vec<_>>(), ["GND", "VCC"]);
    }

    #[test]
    fn empty_net_name_is_rejected() {
        let mut board = test_board();
        assert!(matches!(board.create_net(""), Err(BoardError::EmptyNetName)));
        assert_eq!(board.net_names().count(), 0);
    }

    #[test]
    fn repeated_pad_numbers_share_a_net() {
        let pad = |number: &str, x: f64| PadDef {
            number: number.to_owned(),
            at: Point::new(x, 0.0),
            size: Point::new(1.0, 1.0),
        };
        let mut library = FootprintLibrary::default();
        library.add(Footprint {
            id: "Package_SO:SOIC-8-1EP".parse().unwrap(),
            pads: vec![pad("1", -2.0), pad("2", 2.0), pad("9", -0.5), pad("9", 0.5)],
        });
        let mut board = MemoryBoard::new(library);

        let gnd = board.create_net("GND").unwrap();
        let comp = board
            .create_component_instance(&"Package_SO:SOIC-8-1EP".parse().unwrap(), "U1")
            .unwrap();
        let ep = board.find_pad(&comp, "9").unwrap();
        board.attach_pad_to_net(&ep, &gnd).unwrap();
        board.rebuild_connectivity().unwrap();

        assert_eq!(board.net_pads()[0].1, [Point::new(-0.5, 0.0), Point::new(0.5, 0.0)]);
        assert_eq!(board.connectivity().len(), 1);
        assert_eq!(board.connectivity()[&Endpoint::new("U1", "9")], "GND");

        let vcc = board.create_net("VCC").unwrap();
        board.attach_pad_to_net(&ep, &vcc).unwrap();
        let pads = board.net_pads();
        assert!(pads[0].1.is_empty());
        assert_eq!(pads[1].1.len(), 2);
    }

    #[test]
    fn duplicate_reference_is_fatal() {
        let mut board = test_board();
        let id: FootprintId = "Resistor_SMD:R_0603_1608Metric".parse().unwrap();
        board.create_component_instance(&id, "R1").unwrap();
        assert!(matches!(
            board.create_component_instance(&id, "R1"),
            Err(BoardError::DuplicateReference(r)) if r == "R1"
        ));
    }

    #[test]
    fn missing_footprint_is_reported_as_not_found() {
        let mut board = test_board();
        assert!(matches!(
            board.create_component_instance(&"Nope:X".parse().unwrap(), "U1"),
            Err(BoardError::FootprintNotFound(_))
        ));
    }

    #[test]
    fn reattaching_moves_pad_between_nets() {
        let mut board = test_board();
        let a = board.create_net("A").unwrap();
        let b = board.create_net("B").unwrap();
        let comp = board
            .create_component_instance(&"Resistor_SMD:R_0603_1608Metric".parse().unwrap(), "R1")
            .unwrap();
        let pad = board.find_pad(&comp, "1").unwrap();
        board.attach_pad_to_net(&pad, &a).unwrap();
        board.attach_pad_to_net(&pad, &b).unwrap();

        let pads = board.net_pads();
        assert_eq!(pads[0].1.len(), 0);
        assert_eq!(pads[1].1.len(), 1);
    }

    #[test]
    fn saved_board_reparses() {
        let i = &test_data!("blinky.net");
        let document = Document::parse(i).unwrap();
        let mut board = test_board();
        build(&document, &mut board).unwrap();
        board
            .move_component("R1", Point::new(10.0, 5.0), 90.0)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blinky.kicad_pcb");
        board.save_board(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let roots = parse_document(&text).unwrap();
        assert_eq!(roots.len(), 1);
        let root = &roots[0];
        assert_eq!(root.label(), Some("kicad_pcb"));
        assert_eq!(root.children("net").count(), 4);
        assert_eq!(root.children("footprint").count(), 4);

        let r1 = root
            .children("footprint")
            .find(|fp| fp.args().next() == Some("Resistor_SMD:R_0603_1608Metric"))
            .unwrap();
        assert_eq!(r1.child("at").unwrap().args().collect::<Vec<_>>(), ["10", "5", "90"]);
        let pad2 = r1.children("pad").nth(1).unwrap();
        assert_eq!(
            pad2.child("net").unwrap().args().collect::<Vec<_>>(),
            ["3", "Net-(D1-A)"]
        );
    }

    #[rstest]
    #[case(1.0, "1")]
    #[case(0.825, "0.825")]
    #[case(-0.0, "0")]
    #[case(-0.00001, "0")]
    #[case(2.54, "2.54")]
    #[case(100.0, "100")]
    fn formats_millimetres(#[case] v: f64, #[case] expected: &str) {
        assert_eq!(format_mm(v), expected);
    }

    #[test]
    fn pad_bounds_cover_all_pads() {
        let mut board = test_board();
        board
            .create_component_instance(&"Resistor_SMD:R_0603_1608Metric".parse().unwrap(), "R1")
            .unwrap();
        let r = board.pad_bounds().unwrap();
        assert!((r.min.x - -1.225).abs() < 1e-9);
        assert!((r.max.x - 1.225).abs() < 1e-9);
        assert!((r.height() - 0.95).abs() < 1e-9);
    }
}
