use chrono::NaiveDate;

use wdk_numeric::{Price, Ratio, Shares};
use wdk_schemas::{EventKind, LedgerEvent};

/// The stock-split history of one stock, extracted from its event list.
///
/// Open lots are adjusted permanently when a split is recorded, so this
/// table is only consulted *transiently*: when a historical sell's profit
/// or cost basis must be re-derived at the price level that was current
/// on the sale date.
#[derive(Debug, Clone, Default)]
pub struct SplitTable {
    /// `(effective date, multiplier)`, chronological.
    entries: Vec<(NaiveDate, Ratio)>,
}

impl SplitTable {
    pub fn from_events(events: &[LedgerEvent]) -> Self {
        let mut entries: Vec<(NaiveDate, Ratio)> = events
            .iter()
            .filter_map(|ev| match ev.kind {
                EventKind::StockSplit { multiplier } => Some((ev.date, multiplier)),
                _ => None,
            })
            .collect();
        entries.sort_by_key(|(date, _)| *date);
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adjust a historical per-share price and quantity across every
    /// split effective in `[from, as_of]`: price divides, shares
    /// multiply, applied in chronological order.
    pub fn adjust(
        &self,
        price: Price,
        shares: Shares,
        from: NaiveDate,
        as_of: NaiveDate,
    ) -> (Price, Shares) {
        let mut price = price;
        let mut shares = shares;
        for (date, multiplier) in &self.entries {
            if *date >= from && *date <= as_of {
                price = price.div_ratio(*multiplier);
                shares = shares.mul_ratio(*multiplier);
            }
        }
        (price, shares)
    }

    /// Re-derive the per-share value a fully-adjusted price had on
    /// `date`, by unwinding every split recorded after it (most recent
    /// first).
    pub fn price_as_of(&self, current: Price, date: NaiveDate) -> Price {
        let mut price = current;
        for (split_date, multiplier) in self.entries.iter().rev() {
            if *split_date > date {
                price = price.mul_ratio(*multiplier);
            }
        }
        price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdk_schemas::{EventId, StockId};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn split_event(stock: StockId, date: NaiveDate, mult: f64) -> LedgerEvent {
        LedgerEvent {
            id: EventId::generate(),
            stock_id: stock,
            date,
            kind: EventKind::StockSplit {
                multiplier: Ratio::from_f64(mult).unwrap(),
            },
        }
    }

    fn table(mults: &[(NaiveDate, f64)]) -> SplitTable {
        let stock = StockId::generate();
        let events: Vec<LedgerEvent> = mults
            .iter()
            .map(|(date, m)| split_event(stock, *date, *m))
            .collect();
        SplitTable::from_events(&events)
    }

    #[test]
    fn ignores_non_split_events() {
        let t = SplitTable::from_events(&[]);
        assert!(t.is_empty());
        let (p, s) = t.adjust(
            Price::from_units(100),
            Shares::from_units(10),
            d(2024, 1, 1),
            d(2024, 12, 31),
        );
        assert_eq!(p, Price::from_units(100));
        assert_eq!(s, Shares::from_units(10));
    }

    #[test]
    fn adjust_applies_splits_in_window() {
        let t = table(&[(d(2024, 6, 1), 2.0), (d(2024, 9, 1), 3.0)]);
        // lot opened in January, valued in December: both splits apply
        let (p, s) = t.adjust(
            Price::from_units(120),
            Shares::from_units(10),
            d(2024, 1, 15),
            d(2024, 12, 1),
        );
        assert_eq!(p, Price::from_units(20)); // 120 / 2 / 3
        assert_eq!(s, Shares::from_units(60)); // 10 * 2 * 3
    }

    #[test]
    fn adjust_excludes_splits_outside_window() {
        let t = table(&[(d(2024, 6, 1), 2.0), (d(2024, 9, 1), 3.0)]);
        // valued in July: only the June split applies
        let (p, s) = t.adjust(
            Price::from_units(120),
            Shares::from_units(10),
            d(2024, 1, 15),
            d(2024, 7, 1),
        );
        assert_eq!(p, Price::from_units(60));
        assert_eq!(s, Shares::from_units(20));
        // lot opened after both splits: nothing applies
        let (p, _) = t.adjust(
            Price::from_units(120),
            Shares::from_units(10),
            d(2024, 10, 1),
            d(2024, 12, 1),
        );
        assert_eq!(p, Price::from_units(120));
    }

    #[test]
    fn price_as_of_unwinds_later_splits() {
        let t = table(&[(d(2024, 6, 1), 2.0), (d(2024, 9, 1), 3.0)]);
        // today's fully adjusted buy price is $20; on a sale date between
        // the splits the lot carried $60; before both, $120
        let current = Price::from_units(20);
        assert_eq!(t.price_as_of(current, d(2024, 7, 1)), Price::from_units(60));
        assert_eq!(t.price_as_of(current, d(2024, 1, 1)), Price::from_units(120));
        assert_eq!(t.price_as_of(current, d(2024, 10, 1)), Price::from_units(20));
    }
}
