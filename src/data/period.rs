use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

// ---------------------------------------------------------------------------
// Period labels
// ---------------------------------------------------------------------------
//
// Published periods come in three encodings:
//   YYYY     annual     (canonical month: January)
//   YYYYMmm  monthly    (mm in 1..=12, one or two digits)
//   YYYYTq   quarterly  (q in 1..=4, canonical month: first of the quarter)
//
// `order_key` and `calendar_date` read the labels independently. They agree
// on every well-formed label but slice the quarterly case differently, and
// that difference is kept on purpose for malformed input.

static ANNUAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}$").unwrap());
static MONTHLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}M[0-9]{1,2}$").unwrap());
static QUARTERLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}T[1-4]$").unwrap());
static QUARTERLY_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}T.$").unwrap());

/// Comparable encoding of a period: `year * 100 + month`.
/// Only meaningful for ordering; it is not a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey(pub i64);

impl PeriodKey {
    /// Key of every unrecognised or missing label. Sorts below all valid keys.
    pub const INVALID: PeriodKey = PeriodKey(-1);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// First month of quarter `q`. Out-of-range quarters give months outside 1..=12.
fn quarter_start_month(quarter: i64) -> i64 {
    (quarter - 1) * 3 + 1
}

/// Order key of a period label. Never fails: missing or unrecognised labels
/// map to [`PeriodKey::INVALID`].
///
/// Monthly labels are not bounds-checked, so `2020M13` still gets a stable key.
pub fn order_key(label: Option<&str>) -> PeriodKey {
    let Some(s) = label else {
        return PeriodKey::INVALID;
    };

    let key = if ANNUAL.is_match(s) {
        s.parse::<i64>().ok().map(|year| year * 100)
    } else if MONTHLY.is_match(s) {
        s.split_once('M').and_then(|(year, month)| {
            Some(year.parse::<i64>().ok()? * 100 + month.parse::<i64>().ok()?)
        })
    } else if QUARTERLY.is_match(s) {
        s.split_once('T').and_then(|(year, quarter)| {
            Some(year.parse::<i64>().ok()? * 100 + quarter_start_month(quarter.parse().ok()?))
        })
    } else {
        None
    };

    key.map(PeriodKey).unwrap_or(PeriodKey::INVALID)
}

/// First day of the period's canonical month, or `None` when the label
/// cannot be placed on a calendar.
///
/// The quarter is read from the single character at byte offset 5.
pub fn calendar_date(label: Option<&str>) -> Option<NaiveDate> {
    let s = label?;

    if ANNUAL.is_match(s) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    if MONTHLY.is_match(s) {
        let (year, month) = s.split_once('M')?;
        return NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1);
    }
    if QUARTERLY_SHAPE.is_match(s) {
        let year: i32 = s[..4].parse().ok()?;
        let quarter: i64 = s[5..].parse().ok()?;
        let month = u32::try_from(quarter_start_month(quarter)).ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    None
}

/// Position of a key on a continuous year axis (`2020M7` → 2020.5).
pub fn period_axis_value(key: PeriodKey) -> Option<f64> {
    if !key.is_valid() {
        return None;
    }
    let year = key.0 / 100;
    let month = (key.0 % 100).max(1);
    Some(year as f64 + (month - 1) as f64 / 12.0)
}

// ---------------------------------------------------------------------------
// PeriodDomain – the ordered set of periods offered to a range selector
// ---------------------------------------------------------------------------

/// Distinct period labels in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodDomain {
    labels: Vec<String>,
    keys: Vec<PeriodKey>,
}

impl PeriodDomain {
    /// Sort distinct labels by order key. The sort is stable, so labels with
    /// equal keys (including unrecognised ones) keep their encounter order.
    pub fn from_distinct_labels(labels: Vec<String>) -> Self {
        let mut keyed: Vec<(PeriodKey, String)> = labels
            .into_iter()
            .map(|l| (order_key(Some(&l)), l))
            .collect();
        keyed.sort_by_key(|(k, _)| *k);
        let (keys, labels) = keyed.into_iter().unzip();
        PeriodDomain { labels, keys }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Order-key bounds for an index range of the domain. Indices are clamped
    /// and swapped if given in reverse.
    pub fn key_bounds(&self, start: usize, end: usize) -> Option<(PeriodKey, PeriodKey)> {
        if self.is_empty() {
            return None;
        }
        let last = self.len() - 1;
        let (a, b) = (start.min(last), end.min(last));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Some((self.keys[lo], self.keys[hi]))
    }

    /// Earliest date of any dated period.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.labels.iter().filter_map(|l| calendar_date(Some(l))).min()
    }

    /// Last day covered by the latest dated period's canonical month.
    pub fn last_date(&self) -> Option<NaiveDate> {
        let start = self.labels.iter().filter_map(|l| calendar_date(Some(l))).max()?;
        let next = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?
        };
        next.pred_opt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn order_key_annual() {
        assert_eq!(order_key(Some("2020")), PeriodKey(202000));
        assert_eq!(order_key(Some("1999")), PeriodKey(199900));
    }

    #[test]
    fn order_key_monthly() {
        assert_eq!(order_key(Some("2020M3")), PeriodKey(202003));
        assert_eq!(order_key(Some("2020M03")), PeriodKey(202003));
        assert_eq!(order_key(Some("2020M12")), PeriodKey(202012));
    }

    #[test]
    fn order_key_monthly_is_not_bounds_checked() {
        assert_eq!(order_key(Some("2020M13")), PeriodKey(202013));
        assert_eq!(order_key(Some("2020M0")), PeriodKey(202000));
    }

    #[test]
    fn order_key_quarterly() {
        assert_eq!(order_key(Some("2020T1")), PeriodKey(202001));
        assert_eq!(order_key(Some("2020T2")), PeriodKey(202004));
        assert_eq!(order_key(Some("2020T3")), PeriodKey(202007));
        assert_eq!(order_key(Some("2020T4")), PeriodKey(202010));
    }

    #[test]
    fn order_key_rejects_unknown_labels() {
        assert_eq!(order_key(None), PeriodKey::INVALID);
        for bad in ["garbage", "", "20201", "2020M", "2020M123", "2020T5", "2020T12", " 2020"] {
            assert_eq!(order_key(Some(bad)), PeriodKey::INVALID, "{bad}");
        }
    }

    #[test]
    fn invalid_key_sorts_below_valid_keys() {
        assert!(PeriodKey::INVALID < order_key(Some("0000")));
    }

    #[test]
    fn calendar_date_per_encoding() {
        assert_eq!(calendar_date(Some("2020")), Some(date(2020, 1, 1)));
        assert_eq!(calendar_date(Some("2020M3")), Some(date(2020, 3, 1)));
        assert_eq!(calendar_date(Some("2020M11")), Some(date(2020, 11, 1)));
        assert_eq!(calendar_date(Some("2020T2")), Some(date(2020, 4, 1)));
        assert_eq!(calendar_date(Some("2020T4")), Some(date(2020, 10, 1)));
    }

    #[test]
    fn calendar_date_undefined_cases() {
        assert_eq!(calendar_date(None), None);
        assert_eq!(calendar_date(Some("garbage")), None);
        assert_eq!(calendar_date(Some("2020M13")), None);
        assert_eq!(calendar_date(Some("2020T5")), None);
        assert_eq!(calendar_date(Some("2020T0")), None);
        assert_eq!(calendar_date(Some("2020Tx")), None);
        assert_eq!(calendar_date(Some("2020T10")), None);
    }

    #[test]
    fn domain_sorts_mixed_encodings_chronologically() {
        let domain = PeriodDomain::from_distinct_labels(
            ["2020T4", "2020", "2020M3"].map(String::from).to_vec(),
        );
        assert_eq!(domain.labels(), ["2020", "2020M3", "2020T4"]);
    }

    #[test]
    fn domain_keeps_encounter_order_for_equal_keys() {
        let domain = PeriodDomain::from_distinct_labels(
            ["zz", "2021", "aa", "2020T1", "2020M1"].map(String::from).to_vec(),
        );
        assert_eq!(domain.labels(), ["zz", "aa", "2020T1", "2020M1", "2021"]);
    }

    #[test]
    fn domain_bounds_and_dates() {
        let domain = PeriodDomain::from_distinct_labels(
            ["2019", "2020M1", "2020M6", "2021T4"].map(String::from).to_vec(),
        );
        assert_eq!(domain.key_bounds(3, 1), Some((PeriodKey(202001), PeriodKey(202110))));
        assert_eq!(domain.key_bounds(0, 99), Some((PeriodKey(201900), PeriodKey(202110))));
        assert_eq!(domain.first_date(), Some(date(2019, 1, 1)));
        assert_eq!(domain.last_date(), Some(date(2021, 10, 31)));
        assert_eq!(PeriodDomain::default().key_bounds(0, 0), None);
    }

    #[test]
    fn axis_value_spreads_months_over_the_year() {
        assert_eq!(period_axis_value(PeriodKey(202007)), Some(2020.5));
        assert_eq!(period_axis_value(PeriodKey(202000)), Some(2020.0));
        assert_eq!(period_axis_value(PeriodKey::INVALID), None);
    }
}
