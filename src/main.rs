use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use kicad_netlist_board::{
    build, extract, outline, placement, route, Board, Config, Document, MemoryBoard,
};

#[derive(Parser)]
#[command(name = "netlist-board")]
#[command(about = "Build a KiCad board from a netlist", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a board from a netlist and save it
    #[command(alias = "b")]
    Build(BuildArgs),

    /// Print the components and nets found in a netlist
    #[command(alias = "i")]
    Inspect(InspectArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Netlist file (.net)
    netlist: PathBuf,

    /// Output board file
    #[arg(short, long, default_value = "board.kicad_pcb")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Additional footprint library directory, searched after the configured ones
    #[arg(short = 'L', long = "library")]
    libraries: Vec<PathBuf>,

    /// Place components on a grid
    #[arg(long)]
    place: bool,

    /// Redraw the board outline
    #[arg(long, value_enum)]
    outline: Option<OutlineMode>,

    /// Connect the pads of each net with straight tracks
    #[arg(long)]
    route: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutlineMode {
    /// The configured board frame
    Frame,
    /// Tight around the placed footprints
    Fit,
}

#[derive(Args)]
struct InspectArgs {
    /// Netlist file (.net)
    netlist: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => execute_build(args),
        Commands::Inspect(args) => execute_inspect(args),
    }
}

fn read_netlist(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read netlist: {}", path.display()))?;
    extract(&content).with_context(|| format!("Failed to parse netlist: {}", path.display()))
}

fn execute_build(args: BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.library.paths.extend(args.libraries);

    let document = read_netlist(&args.netlist)?;
    info!(
        "Read {} components and {} nets from {}",
        document.components.len(),
        document.nets.len(),
        args.netlist.display()
    );

    let library = config
        .footprint_library()
        .context("Invalid inline footprint")?;
    let mut board = MemoryBoard::new(library);

    let report = build(&document, &mut board)?;

    if args.place {
        let moved = placement::place_board(&mut board, &config.board, &config.placement)?;
        info!("Placed {} footprints", moved);
    }

    match args.outline {
        Some(OutlineMode::Frame) => {
            outline::draw_frame(&mut board, &config.board, &config.outline);
        }
        Some(OutlineMode::Fit) => {
            outline::fit_outline(&mut board, &config.outline)?;
        }
        None => {}
    }

    if args.route {
        route::route_daisy_chain(&mut board, &config.routing)?;
    }

    board.save_board(&args.output)?;

    print!("{report}");
    println!("Saved {}", args.output.display());
    Ok(())
}

fn execute_inspect(args: InspectArgs) -> Result<()> {
    let document = read_netlist(&args.netlist)?;

    println!("Components ({}):", document.components.len());
    for comp in document.components.values() {
        println!("  {:<8} {:<12} {}", comp.reference, comp.value, comp.footprint);
    }

    println!("Nets ({}):", document.nets.len());
    for net in document.nets.values() {
        let nodes: Vec<_> = net
            .endpoints
            .iter()
            .map(|e| format!("{}.{}", e.reference, e.pin))
            .collect();
        println!("  {:<16} {}", net.name, nodes.join(" "));
    }

    Ok(())
}
