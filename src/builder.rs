use std::fmt::Display;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::{
    board::Board,
    document::Document,
    error::{BoardError, BuildError, RecordError},
    footprint::FootprintId,
};

/// Outcome of replaying a document onto a board
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub components_created: usize,
    pub nets_created: usize,
    pub attachments: usize,
    pub failures: Vec<RecordError>,
}

impl Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} components, {} nets, {} pads connected, {} skipped",
            self.components_created,
            self.nets_created,
            self.attachments,
            self.failures.len()
        )?;
        for failure in &self.failures {
            writeln!(f, "  skipped: {}", failure)?;
        }
        Ok(())
    }
}

/// Replays `document` onto `board`.
///
/// Nets are created first, then component instances, then pads are
/// attached; connectivity is rebuilt once at the end. Bad records are
/// collected in the report and do not stop the build. Any other board
/// error aborts it.
pub fn build<B: Board>(document: &Document, board: &mut B) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::default();

    info!("Creating {} nets", document.nets.len());
    let mut nets = IndexMap::with_capacity(document.nets.len());
    for name in document.nets.keys() {
        let net = board.create_net(name)?;
        nets.insert(name.as_str(), net);
        report.nets_created += 1;
    }

    info!("Creating {} components", document.components.len());
    for comp in document.components.values() {
        let id: FootprintId = match comp.footprint.parse() {
            Ok(id) => id,
            Err(_) => {
                report.skip(RecordError::MalformedFootprint {
                    reference: comp.reference.clone(),
                    footprint: comp.footprint.clone(),
                });
                continue;
            }
        };
        match board.create_component_instance(&id, &comp.reference) {
            Ok(_) => {
                debug!("Created {} ({})", comp.reference, id);
                report.components_created += 1;
            }
            Err(BoardError::FootprintNotFound(_)) => report.skip(RecordError::FootprintNotFound {
                reference: comp.reference.clone(),
                footprint: comp.footprint.clone(),
            }),
            Err(e) => return Err(e.into()),
        }
    }

    info!("Attaching pads");
    for (name, net_record) in &document.nets {
        let net = &nets[name.as_str()];
        for endpoint in &net_record.endpoints {
            let Some(component) = board.find_component_instance(&endpoint.reference) else {
                report.skip(RecordError::UnknownComponent {
                    net: name.clone(),
                    reference: endpoint.reference.clone(),
                    pin: endpoint.pin.clone(),
                });
                continue;
            };
            let Some(pad) = board.find_pad(&component, &endpoint.pin) else {
                report.skip(RecordError::UnknownPad {
                    net: name.clone(),
                    reference: endpoint.reference.clone(),
                    pin: endpoint.pin.clone(),
                });
                continue;
            };
            board.attach_pad_to_net(&pad, net)?;
            report.attachments += 1;
        }
    }

    board.rebuild_connectivity()?;
    info!(
        "Built {} components and {} nets",
        report.components_created, report.nets_created
    );

    Ok(report)
}

impl BuildReport {
    fn skip(&mut self, failure: RecordError) {
        warn!("Skipping {}", failure);
        self.failures.push(failure);
    }
}
