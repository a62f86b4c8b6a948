use crate::{error::AccountError, trade::Side};
use quantback_data::DataStore;
use quantback_instrument::symbol::{CalcMode, SymbolInfo};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Converts `amount` (denominated in `from_currency`) into `account_currency`
/// using the latest tick of the relevant cross pair, per §4.5.2. Returns the
/// amount unchanged if the currencies already match.
pub fn convert_to_account_currency(
    data: &DataStore,
    now: i64,
    amount: Decimal,
    from_currency: &str,
    account_currency: &str,
) -> Result<Decimal, AccountError> {
    if from_currency == account_currency {
        return Ok(amount);
    }

    let direct = format!("{from_currency}{account_currency}");
    if let Ok(tick) = data.price_at(&direct, now) {
        return Ok(amount * tick.bid);
    }

    let inverse = format!("{account_currency}{from_currency}");
    if let Ok(tick) = data.price_at(&inverse, now) {
        if tick.ask.is_zero() {
            return Err(AccountError::CurrencyCrossUnavailable {
                from: SmolStr::new(from_currency),
                to: SmolStr::new(account_currency),
            });
        }
        return Ok(amount / tick.ask);
    }

    Err(AccountError::CurrencyCrossUnavailable {
        from: SmolStr::new(from_currency),
        to: SmolStr::new(account_currency),
    })
}

/// Local-mode margin calculation, keyed by `trade_calc_mode` (§4.5.2).
pub fn calc_margin_local(
    data: &DataStore,
    now: i64,
    info: &SymbolInfo,
    account_currency: &str,
    volume: Decimal,
    price: Decimal,
) -> Result<Decimal, AccountError> {
    let notional = volume * info.contract_size * price;

    let raw_margin = match info.calc_mode {
        CalcMode::Forex => notional / info.leverage,
        CalcMode::ForexNoLeverage => notional,
        CalcMode::Cfd | CalcMode::CfdIndex => notional / info.leverage,
        CalcMode::CfdLeverage => notional / info.leverage.max(Decimal::ONE),
        CalcMode::Futures => {
            volume * info.contract_size * info.tick_value / non_zero(info.tick_size)
        }
    };

    convert_to_account_currency(data, now, raw_margin, &info.margin_currency, account_currency)
}

/// Local-mode profit calculation (§4.5.2), keyed by `trade_calc_mode`:
/// forex instruments use the plain `diff * volume * contract_size` formula
/// (the worked example in §8 matches this exactly); CFD/futures instruments
/// use the tick-based `diff / tick_size * tick_value` formula instead, since
/// their `tick_value` already prices one `tick_size` move for one unit of
/// volume (see DESIGN.md for this Open Question's resolution). The raw
/// result is converted from the symbol's quote currency into the account's
/// currency via the latest cross-pair tick.
pub fn order_calc_profit(
    data: &DataStore,
    now: i64,
    info: &SymbolInfo,
    account_currency: &str,
    side: Side,
    volume: Decimal,
    price_open: Decimal,
    price_close: Decimal,
) -> Result<Decimal, AccountError> {
    let diff = match side {
        Side::Buy => price_close - price_open,
        Side::Sell => price_open - price_close,
    };

    let raw_profit = match info.calc_mode {
        CalcMode::Forex | CalcMode::ForexNoLeverage => diff * volume * info.contract_size,
        CalcMode::Cfd | CalcMode::CfdIndex | CalcMode::CfdLeverage | CalcMode::Futures => {
            diff / non_zero(info.tick_size) * info.tick_value * volume
        }
    };

    convert_to_account_currency(data, now, raw_profit, &info.quote_currency, account_currency)
}

fn non_zero(value: Decimal) -> Decimal {
    if value.is_zero() {
        Decimal::new(1, 10)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantback_instrument::symbol::TradeMode;
    use rust_decimal_macros::dec;

    fn eurusd() -> SymbolInfo {
        SymbolInfo {
            name: "EURUSD".into(),
            base_currency: "EUR".into(),
            quote_currency: "USD".into(),
            margin_currency: "USD".into(),
            digits: 5,
            tick_size: dec!(0.00001),
            tick_value: dec!(1),
            contract_size: dec!(100000),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
            volume_step: dec!(0.01),
            trade_mode: TradeMode::Full,
            calc_mode: CalcMode::Forex,
            leverage: dec!(100),
            trade_stops_level: dec!(0.0010),
        }
    }

    fn empty_store() -> DataStore {
        DataStore::new(quantback_instrument::SymbolCatalog::new())
    }

    #[test]
    fn same_currency_conversion_is_identity() {
        let store = empty_store();
        let converted = convert_to_account_currency(&store, 0, dec!(1100), "USD", "USD").unwrap();
        assert_eq!(converted, dec!(1100));
    }

    #[test]
    fn forex_margin_divides_by_leverage() {
        let store = empty_store();
        let info = eurusd();
        // volume 0.1, contract 100000, price 1.1002 -> notional 11002, / leverage 100
        let margin = calc_margin_local(&store, 0, &info, "USD", dec!(0.1), dec!(1.1002)).unwrap();
        assert_eq!(margin, dec!(110.02));
    }

    #[test]
    fn profit_long_matches_spec_worked_example() {
        let store = empty_store();
        let info = eurusd();
        // spec §8 scenario 1: (1.1050 - 1.1002) * 100000 * 0.1 = 48.0
        let profit =
            order_calc_profit(&store, 0, &info, "USD", Side::Buy, dec!(0.1), dec!(1.1002), dec!(1.1050))
                .unwrap();
        assert_eq!(profit, dec!(48.00));
    }

    #[test]
    fn profit_short_is_mirrored() {
        let store = empty_store();
        let info = eurusd();
        let profit = order_calc_profit(
            &store,
            0,
            &info,
            "USD",
            Side::Sell,
            dec!(0.1),
            dec!(1.1050),
            dec!(1.1002),
        )
        .unwrap();
        assert_eq!(profit, dec!(48.00));
    }

    #[test]
    fn scenario_2_sl_loss_matches_spec() {
        let store = empty_store();
        let info = eurusd();
        // spec §8 scenario 2: BUY 0.1 opened at 1.1002, SL closes at bid 1.0990
        let profit =
            order_calc_profit(&store, 0, &info, "USD", Side::Buy, dec!(0.1), dec!(1.1002), dec!(1.0990))
                .unwrap();
        assert_eq!(profit, dec!(-12.00));
    }
}
