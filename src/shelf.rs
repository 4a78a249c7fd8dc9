use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::orient::OrientedFootprint;
use crate::types::OptimizeError;

/// Cooperative cancellation handle, checked between footprint placements.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A footprint consumed by a shelf, in sheet coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ShelfPlacement {
    /// Index into the original piece list.
    pub piece_idx: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// The engine rotated the footprint relative to its pre-orientation.
    pub rotated: bool,
}

/// A horizontal row of fixed height. The first piece placed into a shelf
/// sets its height; later pieces must be no taller.
#[derive(Debug, Clone)]
pub struct Shelf {
    pub y: u32,
    pub height: u32,
    pub used_width: u32,
    pub placements: Vec<ShelfPlacement>,
}

/// One virtual stock sheet being filled, owning its shelves.
#[derive(Debug, Clone)]
pub struct ShelfSheet {
    pub length: u32,
    pub width: u32,
    pub shelves: Vec<Shelf>,
}

impl ShelfSheet {
    /// Opens a sheet with its first shelf holding the given footprint.
    fn open(length: u32, width: u32, piece_idx: usize, w: u32, h: u32, rotated: bool) -> Self {
        Self {
            length,
            width,
            shelves: vec![Shelf {
                y: 0,
                height: h,
                used_width: w,
                placements: vec![ShelfPlacement {
                    piece_idx,
                    x: 0,
                    y: 0,
                    width: w,
                    height: h,
                    rotated,
                }],
            }],
        }
    }

    /// Appends the footprint to an existing shelf if one has room.
    fn place_on_shelf(&mut self, piece_idx: usize, w: u32, h: u32, rotated: bool) -> bool {
        for shelf in &mut self.shelves {
            if h <= shelf.height && shelf.used_width + w <= self.length {
                shelf.placements.push(ShelfPlacement {
                    piece_idx,
                    x: shelf.used_width,
                    y: shelf.y,
                    width: w,
                    height: h,
                    rotated,
                });
                shelf.used_width += w;
                return true;
            }
        }
        false
    }

    /// Opens a new shelf below the last one if the footprint fits there.
    fn open_shelf(&mut self, piece_idx: usize, w: u32, h: u32, rotated: bool) -> bool {
        // Sheets are created with their first shelf, so last() always exists.
        let Some(last) = self.shelves.last() else {
            return false;
        };
        let y = last.y + last.height;
        if y + h > self.width || w > self.length {
            return false;
        }
        self.shelves.push(Shelf {
            y,
            height: h,
            used_width: w,
            placements: vec![ShelfPlacement {
                piece_idx,
                x: 0,
                y,
                width: w,
                height: h,
                rotated,
            }],
        });
        true
    }
}

#[derive(Debug, Clone)]
pub struct PackOutcome {
    pub sheets: Vec<ShelfSheet>,
    /// Piece indices that fit on no sheet in any allowed orientation.
    pub unplaced: Vec<usize>,
}

/// Orientations the engine may try for a footprint, preferred first.
/// Locked footprints get exactly one.
fn orientations(fp: &OrientedFootprint) -> &'static [bool] {
    if fp.locked || fp.width == fp.height {
        &[false]
    } else {
        &[false, true]
    }
}

fn dims(fp: &OrientedFootprint, rotated: bool) -> (u32, u32) {
    if rotated {
        (fp.height, fp.width)
    } else {
        (fp.width, fp.height)
    }
}

/// Shelf variant of First-Fit-Decreasing-Height.
///
/// Footprints are sorted by descending height then descending width, and
/// each one goes to the first spot found in priority order: an existing
/// shelf on any sheet, then a new shelf on any sheet, then a fresh sheet.
/// No backtracking: a shelf's height never changes once set, and the
/// height slack under shorter pieces is accepted waste.
pub fn pack(
    stock_length: u32,
    stock_width: u32,
    footprints: &[OrientedFootprint],
    cancel: &CancelFlag,
) -> Result<PackOutcome, OptimizeError> {
    let mut order: Vec<usize> = (0..footprints.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = &footprints[a];
        let fb = &footprints[b];
        fb.height
            .cmp(&fa.height)
            .then(fb.width.cmp(&fa.width))
            .then(a.cmp(&b))
    });

    let mut sheets: Vec<ShelfSheet> = Vec::new();
    let mut unplaced: Vec<usize> = Vec::new();

    'next: for &i in &order {
        if cancel.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }
        let fp = &footprints[i];
        let tries = orientations(fp);

        // Existing shelves first, across all open sheets.
        for sheet in &mut sheets {
            for &rotated in tries {
                let (w, h) = dims(fp, rotated);
                if sheet.place_on_shelf(fp.piece_idx, w, h, rotated) {
                    continue 'next;
                }
            }
        }

        // Then a new shelf below the last one of any sheet.
        for sheet in &mut sheets {
            for &rotated in tries {
                let (w, h) = dims(fp, rotated);
                if sheet.open_shelf(fp.piece_idx, w, h, rotated) {
                    continue 'next;
                }
            }
        }

        // Then a brand-new sheet, if the footprint fits the stock at all.
        for &rotated in tries {
            let (w, h) = dims(fp, rotated);
            if w <= stock_length && h <= stock_width {
                sheets.push(ShelfSheet::open(
                    stock_length,
                    stock_width,
                    fp.piece_idx,
                    w,
                    h,
                    rotated,
                ));
                continue 'next;
            }
        }

        unplaced.push(fp.piece_idx);
    }

    Ok(PackOutcome { sheets, unplaced })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(piece_idx: usize, width: u32, height: u32, locked: bool) -> OrientedFootprint {
        OrientedFootprint {
            piece_idx,
            width,
            height,
            locked,
            pre_rotated: false,
        }
    }

    fn all_placements(outcome: &PackOutcome) -> Vec<ShelfPlacement> {
        outcome
            .sheets
            .iter()
            .flat_map(|s| s.shelves.iter())
            .flat_map(|sh| sh.placements.iter().copied())
            .collect()
    }

    #[test]
    fn test_single_footprint_opens_sheet_and_shelf() {
        let outcome = pack(2800, 2070, &[fp(0, 904, 604, false)], &CancelFlag::new()).unwrap();
        assert_eq!(outcome.sheets.len(), 1);
        assert_eq!(outcome.sheets[0].shelves.len(), 1);
        let p = outcome.sheets[0].shelves[0].placements[0];
        assert_eq!((p.x, p.y), (0, 0));
        assert!(outcome.unplaced.is_empty());
    }

    #[test]
    fn test_same_height_pieces_share_a_shelf() {
        let fps = vec![fp(0, 904, 604, false), fp(1, 904, 604, false)];
        let outcome = pack(2800, 2070, &fps, &CancelFlag::new()).unwrap();
        assert_eq!(outcome.sheets.len(), 1);
        assert_eq!(outcome.sheets[0].shelves.len(), 1);
        let shelf = &outcome.sheets[0].shelves[0];
        assert_eq!(shelf.placements.len(), 2);
        assert_eq!(shelf.placements[1].x, 904);
        assert_eq!(shelf.used_width, 1808);
    }

    #[test]
    fn test_full_shelf_opens_next_row_below() {
        // Stock 1000 long: two 600-wide footprints cannot share a shelf.
        let fps = vec![fp(0, 600, 300, false), fp(1, 600, 300, true)];
        let outcome = pack(1000, 1000, &fps, &CancelFlag::new()).unwrap();
        assert_eq!(outcome.sheets.len(), 1);
        assert_eq!(outcome.sheets[0].shelves.len(), 2);
        assert_eq!(outcome.sheets[0].shelves[1].y, 300);
        assert_eq!(outcome.sheets[0].shelves[1].placements[0].x, 0);
    }

    #[test]
    fn test_tallest_first_ordering() {
        let fps = vec![fp(0, 300, 200, false), fp(1, 300, 800, true)];
        let outcome = pack(1000, 1000, &fps, &CancelFlag::new()).unwrap();
        let placements = all_placements(&outcome);
        // The tall footprint sets the first shelf; the short one joins it.
        assert_eq!(outcome.sheets[0].shelves[0].height, 800);
        assert_eq!(placements.len(), 2);
    }

    #[test]
    fn test_overflow_opens_second_sheet() {
        // Each footprint fills a whole sheet.
        let fps = vec![fp(0, 1000, 1000, false), fp(1, 1000, 1000, false)];
        let outcome = pack(1000, 1000, &fps, &CancelFlag::new()).unwrap();
        assert_eq!(outcome.sheets.len(), 2);
        assert!(outcome.unplaced.is_empty());
    }

    #[test]
    fn test_free_footprint_rotates_to_fit() {
        // 500x1200 does not fit 1300x600 stock upright, but does rotated.
        let outcome = pack(1300, 600, &[fp(0, 500, 1200, false)], &CancelFlag::new()).unwrap();
        assert_eq!(outcome.sheets.len(), 1);
        let p = outcome.sheets[0].shelves[0].placements[0];
        assert!(p.rotated);
        assert_eq!((p.width, p.height), (1200, 500));
    }

    #[test]
    fn test_locked_footprint_never_rotated() {
        let outcome = pack(1300, 600, &[fp(0, 500, 1200, true)], &CancelFlag::new()).unwrap();
        assert!(outcome.sheets.is_empty());
        assert_eq!(outcome.unplaced, vec![0]);
    }

    #[test]
    fn test_oversize_in_both_orientations_unplaced() {
        let outcome = pack(1000, 1000, &[fp(7, 1200, 500, false)], &CancelFlag::new()).unwrap();
        assert_eq!(outcome.unplaced, vec![7]);
    }

    #[test]
    fn test_unplaced_is_not_fatal_for_the_rest() {
        let fps = vec![
            fp(0, 2000, 500, false),
            fp(1, 400, 400, false),
            fp(2, 400, 400, false),
        ];
        let outcome = pack(1000, 1000, &fps, &CancelFlag::new()).unwrap();
        assert_eq!(outcome.unplaced, vec![0]);
        assert_eq!(all_placements(&outcome).len(), 2);
    }

    #[test]
    fn test_cancelled_before_first_placement() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = pack(1000, 1000, &[fp(0, 100, 100, false)], &cancel).unwrap_err();
        assert_eq!(err, OptimizeError::Cancelled);
    }
}
