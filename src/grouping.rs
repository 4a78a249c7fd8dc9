use std::collections::{BTreeMap, HashMap};

use crate::solver;
use crate::types::{
    CutRequest, FailedGroup, GroupedResult, OptimizeOptions, Piece, SheetType, SkipReason,
    SkippedRequest,
};

/// Wood-species names whose presence in a sheet-type display name marks
/// the decor as grain-bearing. Normalized: lower-case, diacritics folded.
/// Covers the usual catalog spellings in English and French.
const WOOD_SPECIES: &[&str] = &[
    "oak", "chene", "walnut", "noyer", "beech", "hetre", "ash", "frene", "maple", "erable",
    "birch", "bouleau", "poplar", "peuplier", "larch", "meleze", "pine", "pin", "fir", "sapin",
    "cherry", "merisier", "elm", "orme", "chestnut", "chataignier", "teak", "teck", "wenge",
    "acacia", "olive", "olivier", "rosewood", "palissandre",
];

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' | 'ì' => 'i',
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => 'o',
        'û' | 'ü' | 'ú' | 'ù' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Case- and accent-insensitive substring match against the species list.
pub fn has_wood_decor(name: &str) -> bool {
    let normalized: String = name.to_lowercase().chars().map(fold_diacritic).collect();
    WOOD_SPECIES.iter().any(|species| normalized.contains(species))
}

/// Whether a group packs with grain enforcement: caller override first,
/// then the explicit sheet tag, then the decor-name match. Evaluated once
/// per sheet-type group.
pub fn grain_enforced(sheet: &SheetType, options: &OptimizeOptions) -> bool {
    options
        .enforce_grain
        .unwrap_or_else(|| sheet.visible_grain || has_wood_decor(&sheet.name))
}

/// Partitions requests by target sheet type and optimizes each group
/// independently. Requests without a sheet type, or naming one absent
/// from the catalog, are skipped with a diagnostic; a group that fails
/// outright (bad stock dimensions) never aborts its siblings.
pub fn optimize_grouped(
    requests: &[CutRequest],
    catalog: &[SheetType],
    options: &OptimizeOptions,
) -> GroupedResult {
    let by_id: HashMap<&str, &SheetType> =
        catalog.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut grouped: BTreeMap<String, Vec<Piece>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for request in requests {
        match &request.sheet_type_id {
            None => skipped.push(SkippedRequest {
                piece_id: request.piece.id.clone(),
                reason: SkipReason::NoSheetType,
            }),
            Some(id) if !by_id.contains_key(id.as_str()) => skipped.push(SkippedRequest {
                piece_id: request.piece.id.clone(),
                reason: SkipReason::UnknownSheetType { id: id.clone() },
            }),
            Some(id) => grouped
                .entry(id.clone())
                .or_default()
                .push(request.piece.clone()),
        }
    }

    let mut groups = BTreeMap::new();
    let mut failed = Vec::new();

    for (id, pieces) in grouped {
        let sheet = by_id[id.as_str()];
        let group_options = OptimizeOptions {
            enforce_grain: Some(grain_enforced(sheet, options)),
            ..options.clone()
        };
        match solver::optimize(sheet, &pieces, &group_options) {
            Ok(result) => {
                groups.insert(id, result);
            }
            Err(error) => failed.push(FailedGroup {
                sheet_type_id: id,
                error: error.to_string(),
            }),
        }
    }

    GroupedResult {
        groups,
        skipped,
        failed,
    }
}
