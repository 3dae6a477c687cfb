use std::{collections::HashMap, fmt::Display, path::PathBuf, str::FromStr};

use log::debug;
use serde::Deserialize;

use crate::{
    error::{LibraryError, MalformedFootprint, ParseError},
    geometry::{Point, Rect},
    sexpr::SExpr,
};

/// A footprint name split into library and cell, e.g. `Device:R`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FootprintId {
    pub library: String,
    pub cell: String,
}

impl FromStr for FootprintId {
    type Err = MalformedFootprint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(library), Some(cell), None) if !library.is_empty() && !cell.is_empty() => {
                Ok(FootprintId {
                    library: library.to_owned(),
                    cell: cell.to_owned(),
                })
            }
            _ => Err(MalformedFootprint(s.to_owned())),
        }
    }
}

impl Display for FootprintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.library, self.cell)
    }
}

/// A pad as defined by a footprint, relative to the footprint origin
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PadDef {
    pub number: String,
    #[serde(default)]
    pub at: Point,
    #[serde(default = "default_pad_size")]
    pub size: Point,
}

fn default_pad_size() -> Point {
    Point::new(1.0, 1.0)
}

impl PadDef {
    pub fn bounds(&self, origin: Point, rotation: f64) -> Rect {
        let center = origin + self.at.rotated(rotation);
        let (w, h) = if (rotation / 90.0).round() as i64 % 2 != 0 {
            (self.size.y, self.size.x)
        } else {
            (self.size.x, self.size.y)
        };
        Rect::around(center, w, h)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub id: FootprintId,
    pub pads: Vec<PadDef>,
}

impl Footprint {
    /// Reads the pads of a `.kicad_mod` footprint.
    ///
    /// Pads without a number (mechanical or paste-only) are dropped.
    pub fn from_kicad_mod(id: FootprintId, input: &str) -> Result<Self, ParseError> {
        let root = SExpr::try_from(input)?;
        match root.label() {
            Some("footprint") | Some("module") => {}
            Some(other) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "footprint".to_owned(),
                    found: other.to_owned(),
                    at: 0..input.len(),
                })
            }
            None => return Err(ParseError::MissingChild("footprint".to_owned())),
        }

        let pads = root
            .children("pad")
            .filter_map(|pad| {
                let number = pad.args().next()?;
                if number.is_empty() {
                    return None;
                }
                let at = coords(pad, "at").unwrap_or_default();
                let size = coords(pad, "size").unwrap_or_else(default_pad_size);
                Some(PadDef {
                    number: number.to_owned(),
                    at,
                    size,
                })
            })
            .collect();

        Ok(Footprint { id, pads })
    }

    pub fn pad(&self, number: &str) -> Option<&PadDef> {
        self.pads.iter().find(|p| p.number == number)
    }
}

fn coords(sexpr: &SExpr, label: &str) -> Option<Point> {
    let child = sexpr.children(label).next()?;
    let mut args = child.args().map(|a| a.parse::<f64>().ok());
    Some(Point::new(args.next()??, args.next()??))
}

/// Footprints declared in configuration rather than on disk
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InlineFootprint {
    pub id: String,
    pub pads: Vec<PadDef>,
}

/// Resolves footprint ids to footprints.
///
/// Inline footprints win over disk. On disk, `lib:cell` is looked up as
/// `<path>/<lib>.pretty/<cell>.kicad_mod` in each search path in order.
#[derive(Debug, Clone, Default)]
pub struct FootprintLibrary {
    paths: Vec<PathBuf>,
    inline: HashMap<FootprintId, Footprint>,
}

impl FootprintLibrary {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            inline: HashMap::new(),
        }
    }

    pub fn add(&mut self, footprint: Footprint) {
        self.inline.insert(footprint.id.clone(), footprint);
    }

    pub fn with_inline(
        mut self,
        footprints: &[InlineFootprint],
    ) -> Result<Self, MalformedFootprint> {
        for fp in footprints {
            let id: FootprintId = fp.id.parse()?;
            self.add(Footprint {
                id,
                pads: fp.pads.clone(),
            });
        }
        Ok(self)
    }

    pub fn load(&self, id: &FootprintId) -> Result<Footprint, LibraryError> {
        if let Some(fp) = self.inline.get(id) {
            return Ok(fp.clone());
        }

        for dir in &self.paths {
            let path = dir
                .join(format!("{}.pretty", id.library))
                .join(format!("{}.kicad_mod", id.cell));
            if !path.is_file() {
                continue;
            }
            debug!("Loading footprint {} from {}", id, path.display());
            let content = std::fs::read_to_string(&path).map_err(|source| LibraryError::Io {
                path: path.clone(),
                source,
            })?;
            return Footprint::from_kicad_mod(id.clone(), &content)
                .map_err(|source| LibraryError::Parse { path, source });
        }

        Err(LibraryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn test_lib() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/test/footprints"))
    }

    #[rstest]
    #[case("Device:R", "Device", "R")]
    #[case(
        "Resistor_SMD:R_0603_1608Metric",
        "Resistor_SMD",
        "R_0603_1608Metric"
    )]
    fn splits_library_and_cell(#[case] input: &str, #[case] library: &str, #[case] cell: &str) {
        let id: FootprintId = input.parse().unwrap();
        assert_eq!(id.library, library);
        assert_eq!(id.cell, cell);
        assert_eq!(id.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("R_0603")]
    #[case("a:b:c")]
    #[case(":R")]
    #[case("Device:")]
    fn rejects_malformed_ids(#[case] input: &str) {
        assert_eq!(
            input.parse::<FootprintId>(),
            Err(MalformedFootprint(input.to_owned()))
        );
    }

    #[test]
    fn reads_pads_from_kicad_mod() {
        let lib = FootprintLibrary::new(vec![test_lib()]);
        let fp = lib
            .load(&"Resistor_SMD:R_0603_1608Metric".parse().unwrap())
            .unwrap();

        let numbers: Vec<_> = fp.pads.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, ["1", "2"]);
        assert_eq!(fp.pad("1").unwrap().at, Point::new(-0.825, 0.0));
        assert_eq!(fp.pad("2").unwrap().size, Point::new(0.8, 0.95));
    }

    #[test]
    fn unnamed_pads_are_dropped() {
        let fp = Footprint::from_kicad_mod(
            "Test:T".parse().unwrap(),
            r#"(footprint "T" (pad "1" smd rect (at 0 0) (size 1 1)) (pad "" np_thru_hole circle (at 2 0) (size 1 1)))"#,
        )
        .unwrap();
        assert_eq!(fp.pads.len(), 1);
    }

    #[test]
    fn inline_footprints_take_precedence() {
        let inline = [InlineFootprint {
            id: "Resistor_SMD:R_0603_1608Metric".to_owned(),
            pads: vec![PadDef {
                number: "A".to_owned(),
                at: Point::default(),
                size: default_pad_size(),
            }],
        }];
        let lib = FootprintLibrary::new(vec![test_lib()])
            .with_inline(&inline)
            .unwrap();
        let fp = lib
            .load(&"Resistor_SMD:R_0603_1608Metric".parse().unwrap())
            .unwrap();
        assert!(fp.pad("A").is_some());
        assert!(fp.pad("1").is_none());
    }

    #[test]
    fn missing_footprint() {
        let lib = FootprintLibrary::new(vec![test_lib()]);
        let err = lib.load(&"Nope:Nothing".parse().unwrap()).unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(id) if id == "Nope:Nothing"));
    }

    #[test]
    fn rotated_pad_bounds_swap_size() {
        let pad = PadDef {
            number: "1".to_owned(),
            at: Point::new(1.0, 0.0),
            size: Point::new(2.0, 1.0),
        };
        let r = pad.bounds(Point::new(10.0, 10.0), 90.0);
        assert!((r.width() - 1.0).abs() < 1e-9);
        assert!((r.height() - 2.0).abs() < 1e-9);
    }
}
