// Contest payout structures.
//
// A contest is a field size, an entry fee, and payout tiers over finishing
// places. Structures come from a contest CSV or are synthesized from the
// field size and fee.

use std::io::Read;
use std::path::Path;

use gridiron_core::DataError;
use tracing::info;

/// Share of total entry fees paid back out.
const RAKE_RETAINED: f64 = 0.85;

/// Share of entrants who cash in a synthetic contest.
const PAID_FRACTION: f64 = 0.2;

/// Minimum cash as a multiple of the entry fee.
const MIN_CASH_MULTIPLE: f64 = 1.2;

/// Ratio between consecutive places' share of the top-heavy remainder.
const DECAY: f64 = 0.8;

/// Places `place_lo..=place_hi` (1-based) each pay `payout`.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutTier {
    pub place_lo: usize,
    pub place_hi: usize,
    pub payout: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contest {
    pub field_size: usize,
    pub entry_fee: f64,
    /// Sorted by place, non-overlapping.
    pub tiers: Vec<PayoutTier>,
}

impl Contest {
    /// A top-heavy structure: 85% of fees paid to the top 20% of entrants.
    /// Every paid place gets a minimum cash; the rest of the pool decays
    /// geometrically from first place.
    pub fn synthetic(field_size: usize, entry_fee: f64) -> Self {
        let field_size = field_size.max(1);
        let paid = ((field_size as f64 * PAID_FRACTION).floor() as usize).max(1);
        let pool = RAKE_RETAINED * entry_fee * field_size as f64;
        let min_cash = (MIN_CASH_MULTIPLE * entry_fee).min(pool / paid as f64);
        let remainder = (pool - min_cash * paid as f64).max(0.0);
        let norm = 1.0 - DECAY.powi(paid as i32);

        let tiers = (1..=paid)
            .map(|place| {
                let share = (1.0 - DECAY) * DECAY.powi(place as i32 - 1) / norm;
                PayoutTier {
                    place_lo: place,
                    place_hi: place,
                    payout: min_cash + remainder * share,
                }
            })
            .collect();
        Contest {
            field_size,
            entry_fee,
            tiers,
        }
    }

    /// Payout for a 1-based finishing place.
    pub fn payout(&self, place: usize) -> f64 {
        self.tiers
            .iter()
            .find(|t| (t.place_lo..=t.place_hi).contains(&place))
            .map_or(0.0, |t| t.payout)
    }

    /// Payouts indexed by 0-based rank for the first `entrants` places.
    pub fn payout_table(&self, entrants: usize) -> Vec<f64> {
        (1..=entrants).map(|place| self.payout(place)).collect()
    }

    pub fn prize_pool(&self) -> f64 {
        self.tiers
            .iter()
            .map(|t| t.payout * (t.place_hi - t.place_lo + 1) as f64)
            .sum()
    }

    pub fn paid_places(&self) -> usize {
        self.tiers.iter().map(|t| t.place_hi).max().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Contest CSV
// ---------------------------------------------------------------------------

fn field<'a>(record: &'a csv::StringRecord, i: usize, row: usize, name: &'static str) -> Result<&'a str, DataError> {
    record
        .get(i)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DataError::MissingField { row, field: name })
}

fn parse<T: std::str::FromStr>(raw: &str, row: usize, name: &'static str) -> Result<T, DataError> {
    raw.replace(['$', ','], "")
        .parse::<T>()
        .map_err(|_| DataError::InvalidField {
            row,
            field: name,
            value: raw.to_string(),
        })
}

/// Parse a contest file:
///
/// ```text
/// field_size,entry_fee
/// 1000,20
/// place_lo,place_hi,payout
/// 1,1,5000
/// 2,5,750
/// ```
///
/// Payout amounts may carry `$` and thousands separators.
pub fn load_contest_from_reader<R: Read>(rdr: R, source: &Path) -> Result<Contest, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let records: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(|e| DataError::Csv {
            path: source.to_path_buf(),
            source: e,
        })?;
    if records.len() < 2 {
        return Err(DataError::Empty(format!(
            "{} has no field_size,entry_fee line",
            source.display()
        )));
    }

    // Line 1 is the field_size,entry_fee header; line 2 holds the values.
    let field_size: usize = parse(field(&records[1], 0, 2, "field_size")?, 2, "field_size")?;
    let entry_fee: f64 = parse(field(&records[1], 1, 2, "entry_fee")?, 2, "entry_fee")?;
    if field_size == 0 {
        return Err(DataError::InvalidField {
            row: 2,
            field: "field_size",
            value: "0".into(),
        });
    }

    let mut tiers: Vec<PayoutTier> = Vec::new();
    for (i, record) in records.iter().enumerate().skip(2) {
        let row = i + 1;
        let first = record.get(0).map(str::trim).unwrap_or("");
        if first.is_empty() || first.eq_ignore_ascii_case("place_lo") {
            continue;
        }
        let place_lo: usize = parse(field(record, 0, row, "place_lo")?, row, "place_lo")?;
        let place_hi: usize = parse(field(record, 1, row, "place_hi")?, row, "place_hi")?;
        let payout: f64 = parse(field(record, 2, row, "payout")?, row, "payout")?;

        let overlaps = tiers.last().is_some_and(|t| place_lo <= t.place_hi);
        if place_lo == 0 || place_hi < place_lo || place_hi > field_size || overlaps {
            return Err(DataError::InvalidField {
                row,
                field: "place_lo",
                value: format!("{place_lo}-{place_hi}"),
            });
        }
        if !payout.is_finite() || payout < 0.0 {
            return Err(DataError::InvalidField {
                row,
                field: "payout",
                value: payout.to_string(),
            });
        }
        tiers.push(PayoutTier {
            place_lo,
            place_hi,
            payout,
        });
    }

    let contest = Contest {
        field_size,
        entry_fee,
        tiers,
    };
    info!(
        "Loaded contest from {}: {} entries, ${} fee, {} paid, ${:.2} pool",
        source.display(),
        contest.field_size,
        contest.entry_fee,
        contest.paid_places(),
        contest.prize_pool()
    );
    Ok(contest)
}

pub fn load_contest(path: &Path) -> Result<Contest, DataError> {
    let file = std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_contest_from_reader(file, path)
}
