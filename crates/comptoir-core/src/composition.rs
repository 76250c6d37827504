//! # Composition Resolver
//!
//! Turns "sold N of product P" into the list of stock keys to decrement.
//!
//! ```text
//!   expand("mojito", 3, recipe)
//!
//!   recipe (definition order)          consumption
//!   ┌──────────────┬─────────┐         ┌──────────────┬──────┐
//!   │ rum          │ 0.05    │  ──►    │ rum          │ 1    │  ceil(0.15)
//!   │ mint         │ 2       │  ──►    │ mint         │ 6    │
//!   │ lime         │ 0.5     │  ──►    │ lime         │ 2    │  ceil(1.5)
//!   └──────────────┴─────────┘         └──────────────┴──────┘
//!
//!   expand("heineken", 2, [])   ──►    [("heineken", 2)]   identity
//! ```
//!
//! Stock is counted in whole base units, so fractional consumption rounds up:
//! selling a cocktail always takes at least one unit of each ingredient.
//! Expansion is one level deep. A component that has its own recipe is
//! consumed as itself.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::types::RecipeEntry;

/// One stock key to decrement for a sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub product_id: String,
    /// Base units to take out of stock.
    pub quantity: i64,
}

/// Expands a sold product into its component consumption.
///
/// An empty recipe is the identity expansion: the product consumes itself.
///
/// ```rust
/// use comptoir_core::composition::expand;
/// use comptoir_core::types::RecipeEntry;
/// use rust_decimal::Decimal;
///
/// let identity = expand("heineken", 2, &[]).unwrap();
/// assert_eq!(identity[0].product_id, "heineken");
/// assert_eq!(identity[0].quantity, 2);
///
/// let recipe = vec![RecipeEntry::new("rum", Decimal::new(5, 2))];
/// let consumed = expand("mojito", 3, &recipe).unwrap();
/// assert_eq!(consumed[0].quantity, 1);
/// ```
pub fn expand(
    product_id: &str,
    quantity_sold: i64,
    recipe: &[RecipeEntry],
) -> CoreResult<Vec<Consumption>> {
    if recipe.is_empty() {
        return Ok(vec![Consumption {
            product_id: product_id.to_string(),
            quantity: quantity_sold,
        }]);
    }

    recipe
        .iter()
        .map(|entry| -> CoreResult<Consumption> {
            Ok(Consumption {
                product_id: entry.component_product_id.clone(),
                quantity: consumption_units(entry.quantity_per_unit, quantity_sold)?,
            })
        })
        .collect()
}

/// `ceil(quantity_per_unit × quantity_sold)` as whole base units.
fn consumption_units(quantity_per_unit: Decimal, quantity_sold: i64) -> CoreResult<i64> {
    let overflow = || ValidationError::OutOfRange {
        field: "quantity_per_unit".to_string(),
        min: 0,
        max: i64::MAX,
    };

    quantity_per_unit
        .checked_mul(Decimal::from(quantity_sold))
        .map(|units| units.ceil())
        .and_then(|units| units.to_i64())
        .ok_or_else(|| overflow().into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_identity_expansion() {
        let out = expand("heineken", 24, &[]).unwrap();
        assert_eq!(
            out,
            vec![Consumption {
                product_id: "heineken".into(),
                quantity: 24
            }]
        );
    }

    #[test]
    fn test_recipe_preserves_definition_order() {
        let recipe = vec![
            RecipeEntry::new("rum", dec("0.05")),
            RecipeEntry::new("mint", dec("2")),
            RecipeEntry::new("lime", dec("0.5")),
        ];

        let out = expand("mojito", 3, &recipe).unwrap();
        let ids: Vec<_> = out.iter().map(|c| c.product_id.as_str()).collect();
        assert_eq!(ids, vec!["rum", "mint", "lime"]);

        let quantities: Vec<_> = out.iter().map(|c| c.quantity).collect();
        assert_eq!(quantities, vec![1, 6, 2]);
    }

    #[test]
    fn test_exact_fraction_does_not_round_up() {
        let recipe = vec![RecipeEntry::new("lime", dec("0.25"))];
        let out = expand("caipirinha", 8, &recipe).unwrap();
        assert_eq!(out[0].quantity, 2);
    }

    #[test]
    fn test_sold_product_is_not_consumed_when_it_has_a_recipe() {
        let recipe = vec![RecipeEntry::new("coffee-beans", dec("1"))];
        let out = expand("espresso", 1, &recipe).unwrap();
        assert!(out.iter().all(|c| c.product_id != "espresso"));
    }

    #[test]
    fn test_overflow_is_rejected() {
        let recipe = vec![RecipeEntry::new("rum", Decimal::MAX)];
        assert!(expand("mojito", i64::MAX, &recipe).is_err());
    }
}
