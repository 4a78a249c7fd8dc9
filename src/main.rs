use clap::Parser;
use opticut::grouping;
use opticut::solver::Solver;
use opticut::types::{
    DEFAULT_KERF_MM, EdgeBanding, GrainPreference, OptimizeOptions, Piece, SheetType,
};

#[derive(Parser)]
#[command(name = "opticut", about = "2D panel cutting stock optimizer")]
struct Cli {
    /// Stock sheet dimensions (LxW, e.g. 2800x2070)
    #[arg(long)]
    stock: String,

    /// Sheet display name; wood-species names enable grain enforcement
    #[arg(long, default_value = "")]
    sheet_name: String,

    /// Treat the sheet as having a visible grain along its length
    #[arg(long)]
    grain: bool,

    /// Cut pieces as LxW:qty with an optional grain axis,
    /// e.g. 800x600:3 400x300:5:length
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Blade kerf margin in mm
    #[arg(long, default_value_t = DEFAULT_KERF_MM)]
    kerf: u32,
}

fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected LxW", s));
    }
    let length = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let width = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    if length == 0 || width == 0 {
        return Err(format!("dimensions must be non-zero in '{}'", s));
    }
    Ok((length, width))
}

fn parse_cut(s: &str) -> Result<(u32, u32, u32, Option<GrainPreference>), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(format!("invalid cut '{}', expected LxW:qty[:grain]", s));
    }
    let (length, width) = parse_dimensions(parts[0])?;
    let qty = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    let grain = match parts.get(2) {
        None => None,
        Some(&"length") => Some(GrainPreference::AlongLength),
        Some(&"width") => Some(GrainPreference::AlongWidth),
        Some(other) => {
            return Err(format!(
                "invalid grain axis '{}' in '{}', expected: length or width",
                other, s
            ));
        }
    };
    Ok((length, width, qty, grain))
}

fn main() {
    let cli = Cli::parse();

    let (stock_length, stock_width) = parse_dimensions(&cli.stock).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let mut pieces = Vec::new();
    for cut in &cli.cuts {
        let (length, width, qty, grain) = parse_cut(cut).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
        for n in 1..=qty {
            pieces.push(Piece {
                id: format!("{}x{}#{}", length, width, n),
                label: String::new(),
                length,
                width,
                banding: EdgeBanding::default(),
                grain,
            });
        }
    }

    let sheet = SheetType {
        id: "stock".to_string(),
        name: cli.sheet_name.clone(),
        length: stock_length,
        width: stock_width,
        thickness: 0,
        visible_grain: cli.grain || grouping::has_wood_decor(&cli.sheet_name),
    };

    let options = OptimizeOptions {
        kerf_mm: cli.kerf,
        ..OptimizeOptions::default()
    };

    let result = Solver::new(sheet, pieces, options)
        .solve()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    for sheet in &result.sheets {
        println!("Sheet {} (fill {:.1}%):", sheet.index, sheet.fill_ratio);
        for p in &sheet.pieces {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!("  {} @ ({}, {}){}", p.piece, p.x, p.y, rot);
        }
        println!();
    }

    for u in &result.unplaced {
        println!("Unplaced {}: {}", u.piece.id, u.reason);
    }

    println!(
        "Summary: {} sheet{} used, mean fill {:.1}%, {} unplaced",
        result.sheet_count(),
        if result.sheet_count() == 1 { "" } else { "s" },
        result.stats.mean_fill_ratio,
        result.unplaced.len(),
    );
}
