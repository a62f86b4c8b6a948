use crate::{symbol::SymbolInfo, SymbolError};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// `symbol_name -> SymbolInfo` mapping, read-only once constructed.
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    symbols: IndexMap<SmolStr, SymbolInfo>,
}

impl SymbolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `digits` and the volume triple before storing `info`.
    /// Replaces any existing entry with the same name.
    pub fn insert(&mut self, info: SymbolInfo) -> Result<(), SymbolError> {
        if info.digits > 10 {
            return Err(SymbolError::InvalidConfig {
                symbol: info.name,
                field: "digits",
                reason: format!("{} exceeds the maximum of 10", info.digits),
            });
        }
        if info.volume_min <= Decimal::ZERO {
            return Err(SymbolError::InvalidConfig {
                symbol: info.name,
                field: "volume_min",
                reason: format!("{} must be positive", info.volume_min),
            });
        }
        if info.volume_step <= Decimal::ZERO {
            return Err(SymbolError::InvalidConfig {
                symbol: info.name,
                field: "volume_step",
                reason: format!("{} must be positive", info.volume_step),
            });
        }
        if info.volume_max < info.volume_min {
            return Err(SymbolError::InvalidConfig {
                symbol: info.name,
                field: "volume_max",
                reason: format!("{} is below volume_min {}", info.volume_max, info.volume_min),
            });
        }
        self.symbols.insert(info.name.clone(), info);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Result<&SymbolInfo, SymbolError> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| SymbolError::Unknown(SmolStr::new(symbol)))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &SymbolInfo)> {
        self.symbols.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.symbols.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{CalcMode, TradeMode};
    use rust_decimal_macros::dec;

    fn symbol(name: &str) -> SymbolInfo {
        SymbolInfo {
            name: name.into(),
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

    #[test]
    fn unknown_symbol_errors() {
        let catalog = SymbolCatalog::new();
        assert!(matches!(
            catalog.get("EURUSD"),
            Err(SymbolError::Unknown(_))
        ));
    }

    #[test]
    fn insert_then_get_round_trips() {
        let mut catalog = SymbolCatalog::new();
        catalog.insert(symbol("EURUSD")).unwrap();
        assert_eq!(catalog.get("EURUSD").unwrap().name, "EURUSD");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn insert_rejects_excessive_digits() {
        let mut catalog = SymbolCatalog::new();
        let mut info = symbol("EURUSD");
        info.digits = 20;
        assert!(matches!(
            catalog.insert(info),
            Err(SymbolError::InvalidConfig { field: "digits", .. })
        ));
    }

    #[test]
    fn insert_rejects_volume_max_below_volume_min() {
        let mut catalog = SymbolCatalog::new();
        let mut info = symbol("EURUSD");
        info.volume_min = dec!(1);
        info.volume_max = dec!(0.5);
        assert!(matches!(
            catalog.insert(info),
            Err(SymbolError::InvalidConfig { field: "volume_max", .. })
        ));
    }

    #[test]
    fn insert_rejects_zero_volume_step() {
        let mut catalog = SymbolCatalog::new();
        let mut info = symbol("EURUSD");
        info.volume_step = Decimal::ZERO;
        assert!(matches!(
            catalog.insert(info),
            Err(SymbolError::InvalidConfig { field: "volume_step", .. })
        ));
    }
}
