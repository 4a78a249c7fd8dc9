use crate::orient;
use crate::shelf::{self, CancelFlag, ShelfSheet};
use crate::types::{
    OffcutZone, OptimizationResult, OptimizeError, OptimizeOptions, OptimizeStats, Piece,
    PlacedPiece, SheetResult, SheetType, UnplacedPiece, UnplacedReason,
};

/// Runs one optimization for one sheet type: normalize, pre-orient, pack,
/// assemble. All state lives for the duration of a single `solve` call.
pub struct Solver {
    sheet: SheetType,
    options: OptimizeOptions,
    pieces: Vec<Piece>,
}

/// Convenience wrapper around [`Solver`] for a single call.
pub fn optimize(
    sheet: &SheetType,
    pieces: &[Piece],
    options: &OptimizeOptions,
) -> Result<OptimizationResult, OptimizeError> {
    Solver::new(sheet.clone(), pieces.to_vec(), options.clone()).solve()
}

impl Solver {
    pub fn new(sheet: SheetType, pieces: Vec<Piece>, options: OptimizeOptions) -> Self {
        Self {
            sheet,
            options,
            pieces,
        }
    }

    pub fn solve(&self) -> Result<OptimizationResult, OptimizeError> {
        self.solve_with_cancel(&CancelFlag::new())
    }

    pub fn solve_with_cancel(
        &self,
        cancel: &CancelFlag,
    ) -> Result<OptimizationResult, OptimizeError> {
        // Zero stock dimensions are an upstream configuration error, the
        // one fatal case for a call.
        if self.sheet.length == 0 || self.sheet.width == 0 {
            return Err(OptimizeError::InvalidSheet {
                length: self.sheet.length,
                width: self.sheet.width,
            });
        }

        let grain_enforced = self
            .options
            .enforce_grain
            .unwrap_or(self.sheet.visible_grain);

        let (footprints, mut unplaced) =
            orient::prepare(&self.pieces, self.options.kerf_mm, grain_enforced);

        let outcome = shelf::pack(self.sheet.length, self.sheet.width, &footprints, cancel)?;

        for &idx in &outcome.unplaced {
            let piece = &self.pieces[idx];
            unplaced.push(UnplacedPiece {
                piece: piece.clone(),
                reason: UnplacedReason::Oversize {
                    piece_length: piece.length,
                    piece_width: piece.width,
                    stock_length: self.sheet.length,
                    stock_width: self.sheet.width,
                },
            });
        }

        Ok(self.assemble(&outcome.sheets, unplaced, None))
    }

    /// Turns packed sheets into user-facing results. When a richer engine
    /// supplies explicit offcut lists they pass through unchanged;
    /// otherwise leftover zones are extracted from the shelf layout.
    fn assemble(
        &self,
        sheets: &[ShelfSheet],
        unplaced: Vec<UnplacedPiece>,
        supplied_offcuts: Option<Vec<Vec<OffcutZone>>>,
    ) -> OptimizationResult {
        let total_area = self.sheet.area();
        let mut results = Vec::with_capacity(sheets.len());

        for (i, sheet) in sheets.iter().enumerate() {
            let index = i + 1;
            let mut placed = Vec::new();
            for shelf in &sheet.shelves {
                for p in &shelf.placements {
                    let piece = self.pieces[p.piece_idx].clone();
                    let rotated = self.final_rotation(&piece, p.width, p.height);
                    placed.push(PlacedPiece {
                        piece,
                        sheet_index: index,
                        x: p.x,
                        y: p.y,
                        rotated,
                    });
                }
            }

            let used_area: u64 = placed.iter().map(|p| p.piece.area()).sum();
            let fill_ratio = if total_area == 0 {
                0.0
            } else {
                used_area as f64 / total_area as f64 * 100.0
            };
            let offcuts = match &supplied_offcuts {
                Some(lists) => lists.get(i).cloned().unwrap_or_default(),
                None => offcut_zones(sheet),
            };

            results.push(SheetResult {
                index,
                sheet_type_id: self.sheet.id.clone(),
                length: self.sheet.length,
                width: self.sheet.width,
                pieces: placed,
                offcuts,
                used_area,
                total_area,
                fill_ratio,
                waste_area: total_area - used_area,
            });
        }

        let stats = aggregate(&results);
        OptimizationResult {
            sheets: results,
            unplaced,
            stats,
        }
    }

    /// Recomputes the user-facing rotation flag from the footprint the
    /// engine actually consumed versus the inflated nominal dimensions.
    /// This folds pre-orientation and engine rotation into one answer
    /// without special-casing the grain lock.
    fn final_rotation(&self, piece: &Piece, consumed_w: u32, consumed_h: u32) -> bool {
        if piece.length == piece.width {
            return false;
        }
        let kerf = self.options.kerf_mm;
        consumed_w == piece.width + kerf && consumed_h == piece.length + kerf
    }
}

/// Extracts the rectangular leftover zones of one packed sheet: the strip
/// above each piece shorter than its shelf, the tail of each shelf, and
/// the band below the last shelf. All zones are disjoint.
fn offcut_zones(sheet: &ShelfSheet) -> Vec<OffcutZone> {
    let mut zones = Vec::new();
    for shelf in &sheet.shelves {
        for p in &shelf.placements {
            if p.height < shelf.height {
                zones.push(OffcutZone {
                    x: p.x,
                    y: shelf.y + p.height,
                    length: p.width,
                    width: shelf.height - p.height,
                });
            }
        }
        if shelf.used_width < sheet.length {
            zones.push(OffcutZone {
                x: shelf.used_width,
                y: shelf.y,
                length: sheet.length - shelf.used_width,
                width: shelf.height,
            });
        }
    }
    if let Some(last) = sheet.shelves.last() {
        let top = last.y + last.height;
        if top < sheet.width {
            zones.push(OffcutZone {
                x: 0,
                y: top,
                length: sheet.length,
                width: sheet.width - top,
            });
        }
    }
    zones
}

fn aggregate(sheets: &[SheetResult]) -> OptimizeStats {
    if sheets.is_empty() {
        return OptimizeStats::default();
    }
    let used_area = sheets.iter().map(|s| s.used_area).sum();
    let total_area = sheets.iter().map(|s| s.total_area).sum();
    let mean_fill_ratio =
        sheets.iter().map(|s| s.fill_ratio).sum::<f64>() / sheets.len() as f64;
    OptimizeStats {
        sheet_count: sheets.len(),
        used_area,
        total_area,
        mean_fill_ratio,
    }
}
