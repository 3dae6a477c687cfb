use indexmap::{map::Entry, IndexMap};

use crate::{error::ParseError, sexpr::SExpr};

/// A component in the netlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub reference: String,
    /// Footprint as written in the netlist, normally `library:cell`
    pub footprint: String,
    pub value: String,
}

/// A node connects a net to a pin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub reference: String,
    pub pin: String,
}

impl Endpoint {
    pub fn new(reference: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            pin: pin.into(),
        }
    }
}

/// A net
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetRecord {
    pub name: String,
    /// Net code from the netlist, if it had one
    pub code: Option<String>,
    pub endpoints: Vec<Endpoint>,
}

/// The extracted netlist.
///
/// Components are keyed by reference and nets by name, both in the order
/// they appear in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub components: IndexMap<String, ComponentRecord>,
    pub nets: IndexMap<String, NetRecord>,
}

impl Document {
    /// Extracts components and nets from netlist text.
    ///
    /// `comp` and `net` lists are collected wherever they appear, so both a
    /// full `(export ...)` file and a bare sequence of records are accepted.
    /// References used by net nodes are not checked against the components.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let roots = crate::sexpr::parse_document(input)?;
        Document::try_from(roots.as_slice())
    }

    pub fn component(&self, reference: &str) -> Option<&ComponentRecord> {
        self.components.get(reference)
    }

    pub fn net(&self, name: &str) -> Option<&NetRecord> {
        self.nets.get(name)
    }

    /// All (endpoint, net name) assignments in document order
    pub fn assignments(&self) -> impl Iterator<Item = (&Endpoint, &str)> {
        self.nets.values().flat_map(|net| {
            net.endpoints
                .iter()
                .map(move |endpoint| (endpoint, net.name.as_str()))
        })
    }
}

fn non_empty(sexpr: &SExpr, label: &str) -> Result<String, ParseError> {
    match sexpr.value(label)? {
        "" => Err(ParseError::EmptyValue(label.to_owned())),
        v => Ok(v.to_owned()),
    }
}

impl<'a> TryFrom<&SExpr<'a>> for ComponentRecord {
    type Error = ParseError;

    fn try_from(value: &SExpr<'a>) -> Result<Self, Self::Error> {
        let reference = non_empty(value, "ref")?;
        let footprint = value.opt_value("footprint")?.unwrap_or_default().to_owned();
        let value = value.opt_value("value")?.unwrap_or_default().to_owned();
        Ok(ComponentRecord {
            reference,
            footprint,
            value,
        })
    }
}

impl<'a> TryFrom<&SExpr<'a>> for Endpoint {
    type Error = ParseError;

    fn try_from(value: &SExpr<'a>) -> Result<Self, Self::Error> {
        Ok(Endpoint::new(value.value("ref")?, value.value("pin")?))
    }
}

impl<'a> TryFrom<&SExpr<'a>> for NetRecord {
    type Error = ParseError;

    fn try_from(value: &SExpr<'a>) -> Result<Self, Self::Error> {
        let name = non_empty(value, "name")?;
        let code = value.opt_value("code")?.map(str::to_owned);
        let endpoints = value
            .children("node")
            .map(Endpoint::try_from)
            .collect::<Result<_, _>>()?;
        Ok(NetRecord {
            name,
            code,
            endpoints,
        })
    }
}

impl<'a> TryFrom<&[SExpr<'a>]> for Document {
    type Error = ParseError;

    fn try_from(roots: &[SExpr<'a>]) -> Result<Self, Self::Error> {
        let mut comps = vec![];
        let mut nets = vec![];
        for root in roots {
            root.find_all("comp", &mut comps);
            root.find_all("net", &mut nets);
        }

        let mut document = Document::default();

        for comp in comps {
            let comp = ComponentRecord::try_from(comp)?;
            match document.components.entry(comp.reference.clone()) {
                Entry::Occupied(_) => return Err(ParseError::DuplicateComponent(comp.reference)),
                Entry::Vacant(slot) => {
                    slot.insert(comp);
                }
            }
        }

        for net in nets {
            let net = NetRecord::try_from(net)?;
            match document.nets.entry(net.name.clone()) {
                Entry::Occupied(_) => return Err(ParseError::DuplicateNet(net.name)),
                Entry::Vacant(slot) => {
                    slot.insert(net);
                }
            }
        }

        Ok(document)
    }
}
