use crate::types::{GrainPreference, Piece, UnplacedPiece, UnplacedReason};

/// A piece footprint ready for the placement engine: kerf-inflated and
/// pre-oriented. `width` is the extent along the sheet's length axis,
/// `height` the extent along the sheet's width axis.
#[derive(Debug, Clone, Copy)]
pub struct OrientedFootprint {
    /// Index into the original piece list.
    pub piece_idx: usize,
    pub width: u32,
    pub height: u32,
    /// The engine must not rotate this footprint.
    pub locked: bool,
    /// The two dimensions were swapped before packing to honor grain.
    pub pre_rotated: bool,
}

/// Inflates nominal dimensions by the kerf margin, once per dimension.
/// True kerf is per saw cut, not per piece; the once-per-piece margin is
/// a known approximation. Returns None for zero dimensions.
pub fn inflate(piece: &Piece, kerf_mm: u32) -> Option<(u32, u32)> {
    if piece.length == 0 || piece.width == 0 {
        return None;
    }
    Some((piece.length + kerf_mm, piece.width + kerf_mm))
}

/// Decides the pre-orientation of one inflated footprint.
///
/// With grain enforcement on, a piece wanting its fiber along its own
/// width gets its dimensions swapped up front and is locked against any
/// further rotation; a piece wanting fiber along its length already
/// matches the sheet's grain axis (sheet grain runs along the sheet
/// length) and is locked as-is. Everything else packs freely.
pub fn orient(
    piece_idx: usize,
    inflated: (u32, u32),
    grain: Option<GrainPreference>,
    grain_enforced: bool,
) -> OrientedFootprint {
    let (length, width) = inflated;
    match grain {
        Some(GrainPreference::AlongWidth) if grain_enforced => OrientedFootprint {
            piece_idx,
            width,
            height: length,
            locked: true,
            pre_rotated: true,
        },
        Some(GrainPreference::AlongLength) if grain_enforced => OrientedFootprint {
            piece_idx,
            width: length,
            height: width,
            locked: true,
            pre_rotated: false,
        },
        _ => OrientedFootprint {
            piece_idx,
            width: length,
            height: width,
            locked: false,
            pre_rotated: false,
        },
    }
}

/// Normalizes and pre-orients a whole batch. Pieces with invalid
/// dimensions are excluded with a diagnostic; the batch continues.
pub fn prepare(
    pieces: &[Piece],
    kerf_mm: u32,
    grain_enforced: bool,
) -> (Vec<OrientedFootprint>, Vec<UnplacedPiece>) {
    let mut footprints = Vec::with_capacity(pieces.len());
    let mut excluded = Vec::new();

    for (idx, piece) in pieces.iter().enumerate() {
        match inflate(piece, kerf_mm) {
            Some(inflated) => {
                footprints.push(orient(idx, inflated, piece.grain, grain_enforced));
            }
            None => excluded.push(UnplacedPiece {
                piece: piece.clone(),
                reason: UnplacedReason::InvalidDimensions {
                    length: piece.length,
                    width: piece.width,
                },
            }),
        }
    }

    (footprints, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeBanding;

    fn piece(length: u32, width: u32, grain: Option<GrainPreference>) -> Piece {
        Piece {
            id: "p1".to_string(),
            label: String::new(),
            length,
            width,
            banding: EdgeBanding::default(),
            grain,
        }
    }

    #[test]
    fn test_inflate_adds_kerf_once_per_dimension() {
        let p = piece(900, 600, None);
        assert_eq!(inflate(&p, 4), Some((904, 604)));
        assert_eq!(inflate(&p, 0), Some((900, 600)));
    }

    #[test]
    fn test_inflate_rejects_zero_dimension() {
        assert!(inflate(&piece(0, 600, None), 4).is_none());
        assert!(inflate(&piece(900, 0, None), 4).is_none());
    }

    #[test]
    fn test_orient_free_when_not_enforced() {
        let fp = orient(0, (904, 604), Some(GrainPreference::AlongWidth), false);
        assert_eq!((fp.width, fp.height), (904, 604));
        assert!(!fp.locked);
        assert!(!fp.pre_rotated);
    }

    #[test]
    fn test_orient_along_length_locks_without_swap() {
        let fp = orient(0, (904, 604), Some(GrainPreference::AlongLength), true);
        assert_eq!((fp.width, fp.height), (904, 604));
        assert!(fp.locked);
        assert!(!fp.pre_rotated);
    }

    #[test]
    fn test_orient_along_width_swaps_and_locks() {
        let fp = orient(0, (504, 1504), Some(GrainPreference::AlongWidth), true);
        assert_eq!((fp.width, fp.height), (1504, 504));
        assert!(fp.locked);
        assert!(fp.pre_rotated);
    }

    #[test]
    fn test_orient_unconstrained_piece_is_free_even_on_grain_sheet() {
        let fp = orient(0, (904, 604), None, true);
        assert!(!fp.locked);
    }

    #[test]
    fn test_prepare_excludes_invalid_and_keeps_rest() {
        let pieces = vec![
            piece(900, 600, None),
            piece(0, 600, None),
            piece(400, 300, None),
        ];
        let (footprints, excluded) = prepare(&pieces, 4, false);
        assert_eq!(footprints.len(), 2);
        assert_eq!(excluded.len(), 1);
        assert_eq!(
            excluded[0].reason,
            UnplacedReason::InvalidDimensions { length: 0, width: 600 }
        );
        assert_eq!(footprints[1].piece_idx, 2);
    }
}
