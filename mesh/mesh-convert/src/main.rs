//! Mesh conversion tool.
//!
//! Converts GLB, STL and 3MF meshes to binary STL or 3MF, optionally
//! simplifying and cleaning them up for 3D printing on the way.
//!
//! # Usage
//!
//! - `mesh-convert duck_3d.glb` - write `duck_3d.stl` next to the input
//! - `mesh-convert duck_3d.glb -o my_model.stl` - explicit output
//! - `mesh-convert duck_3d.glb --ratio 0.5` - write `duck_3d.stl` and
//!   `duck_3d_simplified.stl`
//! - `mesh-convert astronaut.glb --palette WHITE=#FFFFFF,RED=#D21E2D -f 3mf` -
//!   one 3MF object per palette colour
//! - `mesh-convert a.glb b.glb c.glb --format 3mf --jobs 4` - batch
//! - `mesh-convert scan.stl --stats-only` - print statistics only
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | invalid or unreadable input |
//! | 2 | unsupported or unrecognized format |
//! | 3 | an output could not be written |

mod convert;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mesh_io::MeshFormat;
use owo_colors::OwoColorize;

/// Convert and simplify triangle meshes for 3D printing.
#[derive(Parser, Debug)]
#[command(name = "mesh-convert")]
#[command(about = "Convert GLB/STL/3MF meshes to STL or 3MF", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Input meshes (.glb, .stl, .3mf). Several inputs run as a batch.
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Output file (single input only). Defaults to `<stem>.<ext>` next to
    /// the input. When decimating, the simplified mesh goes to
    /// `<stem>_simplified.<ext>` beside it.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format; repeat for several outputs per input
    #[arg(short, long = "format", value_enum)]
    pub formats: Vec<OutputFormat>,

    /// Keep this fraction of the faces, in (0, 1]
    #[arg(long, conflicts_with = "target_faces")]
    pub ratio: Option<f64>,

    /// Decimate to this many faces
    #[arg(long)]
    pub target_faces: Option<usize>,

    /// When decimating, write only the simplified output
    #[arg(long)]
    pub simplified_only: bool,

    /// Split outputs by vertex colour: `NAME=#RRGGBB,...`
    #[arg(long, value_name = "PALETTE")]
    pub palette: Option<String>,

    /// Colour distance (0-200) within which a face matches a palette colour
    #[arg(long, requires = "palette")]
    pub tolerance: Option<f64>,

    /// Skip floater and degenerate-face cleanup
    #[arg(long)]
    pub no_repair: bool,

    /// Only load and print statistics
    #[arg(long, conflicts_with_all = ["output", "formats", "ratio", "target_faces"])]
    pub stats_only: bool,

    /// Pipeline configuration (JSON); flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the run report(s) as JSON
    #[arg(long, value_name = "FILE")]
    pub report_json: Option<PathBuf>,

    /// Worker threads for batches (0 = all cores)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Write ASCII instead of binary STL
    #[arg(long)]
    pub ascii: bool,

    /// Object colour for 3MF output, e.g. `#C87828`
    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    /// Do not print the report
    #[arg(short, long)]
    pub quiet: bool,
}

/// Formats the tool can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Binary (or ASCII) STL
    Stl,
    /// 3MF package
    #[value(name = "3mf")]
    ThreeMf,
}

impl From<OutputFormat> for MeshFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Stl => Self::Stl,
            OutputFormat::ThreeMf => Self::ThreeMf,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match convert::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            convert::exit_code(&err)
        }
    };
    std::process::exit(code);
}
