//! AttributionCalc: distribute a wallet's net SOL flow over its concurrent
//! token deltas within one transaction.

use std::collections::HashMap;

/// `buy_sol` covers mints with a positive token delta (bought) when
/// `sol_change < 0`; `sell_sol` covers mints with a negative token delta
/// (sold) when `sol_change > 0`. A tx can contain both if token deltas have
/// mixed signs — each side is attributed against its own denominator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribution {
    pub buy_sol: HashMap<String, f64>,
    pub sell_sol: HashMap<String, f64>,
}

pub fn attribute(sol_change: f64, token_changes: &HashMap<String, f64>) -> Attribution {
    let mut attribution = Attribution::default();

    if sol_change.abs() <= f64::EPSILON {
        return attribution;
    }

    if sol_change < 0.0 {
        let total_bought: f64 = token_changes.values().filter(|d| **d > 0.0).sum();
        if total_bought > 0.0 {
            let cost_per_unit = sol_change.abs() / total_bought;
            for (mint, delta) in token_changes {
                if *delta > 0.0 {
                    attribution.buy_sol.insert(mint.clone(), cost_per_unit * delta);
                }
            }
        }
    } else {
        let total_sold: f64 = token_changes.values().filter(|d| **d < 0.0).map(|d| d.abs()).sum();
        if total_sold > 0.0 {
            let gain_per_unit = sol_change / total_sold;
            for (mint, delta) in token_changes {
                if *delta < 0.0 {
                    attribution.sell_sol.insert(mint.clone(), gain_per_unit * delta.abs());
                }
            }
        }
    }

    attribution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_sol_change_distributes_across_buys_proportionally() {
        let mut deltas = HashMap::new();
        deltas.insert("A".to_string(), 100.0);
        deltas.insert("B".to_string(), 300.0);
        let attribution = attribute(-1.0, &deltas);
        assert_eq!(attribution.buy_sol.get("A"), Some(&0.25));
        assert_eq!(attribution.buy_sol.get("B"), Some(&0.75));
        assert!(attribution.sell_sol.is_empty());
    }

    #[test]
    fn positive_sol_change_distributes_across_sells_proportionally() {
        let mut deltas = HashMap::new();
        deltas.insert("A".to_string(), -50.0);
        deltas.insert("B".to_string(), -50.0);
        let attribution = attribute(2.0, &deltas);
        assert_eq!(attribution.sell_sol.get("A"), Some(&1.0));
        assert_eq!(attribution.sell_sol.get("B"), Some(&1.0));
    }

    #[test]
    fn mixed_sign_deltas_attribute_each_side_independently() {
        let mut deltas = HashMap::new();
        deltas.insert("BOUGHT".to_string(), 10.0);
        deltas.insert("SOLD".to_string(), -5.0);
        let attribution = attribute(0.5, &deltas);
        // sol_change > 0 so only the sold side is attributed.
        assert!(attribution.buy_sol.is_empty());
        assert_eq!(attribution.sell_sol.get("SOLD"), Some(&0.5));
    }

    #[test]
    fn negligible_sol_change_yields_empty_attribution() {
        let mut deltas = HashMap::new();
        deltas.insert("A".to_string(), 10.0);
        let attribution = attribute(0.0, &deltas);
        assert!(attribution.buy_sol.is_empty() && attribution.sell_sol.is_empty());
    }
}
