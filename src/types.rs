use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Kerf margin added to each piece dimension, in millimeters.
pub const DEFAULT_KERF_MM: u32 = 4;

/// Desired fiber direction of a piece, relative to its own nominal axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrainPreference {
    AlongLength,
    AlongWidth,
}

/// Edge-banding flags, one per side: side1-long, side1-short,
/// side2-long, side2-short. Carried through placement unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeBanding {
    #[serde(default)]
    pub length1: bool,
    #[serde(default)]
    pub width1: bool,
    #[serde(default)]
    pub length2: bool,
    #[serde(default)]
    pub width2: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(default)]
    pub banding: EdgeBanding,
    #[serde(default)]
    pub grain: Option<GrainPreference>,
}

impl Piece {
    pub fn area(&self) -> u64 {
        self.length as u64 * self.width as u64
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.length, self.width)
    }
}

/// A stock sheet type from the catalog. When `visible_grain` is set the
/// grain axis runs along the sheet's length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetType {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub thickness: u32,
    #[serde(default)]
    pub visible_grain: bool,
}

impl SheetType {
    pub fn area(&self) -> u64 {
        self.length as u64 * self.width as u64
    }
}

/// A piece with its resolved placement on a sheet of its group.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedPiece {
    pub piece: Piece,
    /// 1-based sheet index within the sheet-type group.
    pub sheet_index: usize,
    pub x: u32,
    pub y: u32,
    /// Rotated 90° relative to the piece's nominal orientation.
    pub rotated: bool,
}

impl PlacedPiece {
    /// Nominal dimensions as laid on the sheet: (extent along sheet
    /// length, extent along sheet width).
    pub fn oriented_dims(&self) -> (u32, u32) {
        if self.rotated {
            (self.piece.width, self.piece.length)
        } else {
            (self.piece.length, self.piece.width)
        }
    }
}

/// A leftover rectangular region of stock material on a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffcutZone {
    pub x: u32,
    pub y: u32,
    pub length: u32,
    pub width: u32,
}

impl OffcutZone {
    pub fn area(&self) -> u64 {
        self.length as u64 * self.width as u64
    }
}

/// One stock sheet instance with everything placed on it.
#[derive(Debug, Clone, Serialize)]
pub struct SheetResult {
    pub index: usize,
    pub sheet_type_id: String,
    pub length: u32,
    pub width: u32,
    pub pieces: Vec<PlacedPiece>,
    pub offcuts: Vec<OffcutZone>,
    pub used_area: u64,
    pub total_area: u64,
    /// Used surface over total surface, in percent.
    pub fill_ratio: f64,
    pub waste_area: u64,
}

/// Why a piece was left out of the placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UnplacedReason {
    #[error(
        "piece {piece_length}x{piece_width} exceeds stock {stock_length}x{stock_width} in every allowed orientation"
    )]
    Oversize {
        piece_length: u32,
        piece_width: u32,
        stock_length: u32,
        stock_width: u32,
    },
    #[error("invalid piece dimensions {length}x{width}")]
    InvalidDimensions { length: u32, width: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnplacedPiece {
    pub piece: Piece,
    pub reason: UnplacedReason,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OptimizeStats {
    pub sheet_count: usize,
    pub used_area: u64,
    pub total_area: u64,
    pub mean_fill_ratio: f64,
}

/// Result of one `optimize` call (one sheet-type group).
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub sheets: Vec<SheetResult>,
    pub unplaced: Vec<UnplacedPiece>,
    pub stats: OptimizeStats,
}

impl OptimizationResult {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }
}

/// A raw cutting request: a piece targeting a sheet type from the catalog.
/// Requests without a sheet type are excluded from optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutRequest {
    pub piece: Piece,
    #[serde(default)]
    pub sheet_type_id: Option<String>,
}

/// Why a request never entered a placement group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SkipReason {
    #[error("no sheet type assigned")]
    NoSheetType,
    #[error("sheet type '{id}' not found in catalog")]
    UnknownSheetType { id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRequest {
    pub piece_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedGroup {
    pub sheet_type_id: String,
    pub error: String,
}

/// Aggregate of `optimize_grouped`: one independent result per sheet type.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedResult {
    pub groups: BTreeMap<String, OptimizationResult>,
    pub skipped: Vec<SkippedRequest>,
    pub failed: Vec<FailedGroup>,
}

/// Placement strategy selector. Richer engines may honor more of these;
/// the local shelf heuristic ignores the selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementStrategy {
    #[default]
    Shelf,
    Guillotine,
    MaximalRects,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOptions {
    #[serde(default = "default_kerf", deserialize_with = "deserialize_u32_from_number")]
    pub kerf_mm: u32,
    /// Overrides grain enforcement for the whole call. None derives it
    /// from the sheet type.
    #[serde(default)]
    pub enforce_grain: Option<bool>,
    #[serde(default)]
    pub strategy: PlacementStrategy,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            kerf_mm: DEFAULT_KERF_MM,
            enforce_grain: None,
            strategy: PlacementStrategy::default(),
        }
    }
}

fn default_kerf() -> u32 {
    DEFAULT_KERF_MM
}

/// Fatal errors for a single `optimize` call. Piece-level failures are
/// reported in the result instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptimizeError {
    #[error("sheet type has invalid stock dimensions {length}x{width}")]
    InvalidSheet { length: u32, width: u32 },
    #[error("optimization cancelled")]
    Cancelled,
}

/// Accepts JSON numbers that arrive as floats (e.g. `800.0`) for u32 fields.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value > u32::MAX as f64 || value.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {value}"
        )));
    }
    Ok(value as u32)
}
