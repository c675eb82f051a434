use crate::error::LedgerError;
use crate::events::{AssetId, Fill};
use crate::model::Vehicle;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One vehicle's holdings inside a position: signed quantity plus the
/// weighted-average cost basis. Quantity and basis only ever change together.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub quantity: Decimal,
    pub basis: Decimal,
}

/// Holdings, cost basis, committed cash, and realized P&L for one asset.
/// Owned exclusively by that asset; never shared even when two assets trade
/// the same vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    lots: HashMap<Vehicle, Lot>,
    pub cash_committed: Decimal,
    pub realized_pnl: Decimal,
}

impl Position {
    #[must_use]
    pub fn quantity(&self, vehicle: &Vehicle) -> Decimal {
        self.lots.get(vehicle).map_or(Decimal::ZERO, |l| l.quantity)
    }

    #[must_use]
    pub fn basis(&self, vehicle: &Vehicle) -> Decimal {
        self.lots.get(vehicle).map_or(Decimal::ZERO, |l| l.basis)
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.lots.is_empty()
    }

    #[must_use]
    pub const fn lots(&self) -> &HashMap<Vehicle, Lot> {
        &self.lots
    }

    fn committed_with(&self, vehicle: &Vehicle, candidate: Option<&Lot>) -> Decimal {
        let mut committed = Decimal::ZERO;
        for (v, lot) in &self.lots {
            if v != vehicle {
                committed += lot.quantity.abs() * lot.basis;
            }
        }
        if let Some(lot) = candidate {
            committed += lot.quantity.abs() * lot.basis;
        }
        committed
    }
}

/// The only component allowed to mutate one asset's position state, and only
/// via confirmed fills. One ledger per asset, driven from that asset's own
/// task; there is no cross-asset contention by construction.
#[derive(Debug, Clone)]
pub struct Ledger {
    asset_id: AssetId,
    budget: Decimal,
    reinvest_profit: bool,
    position: Position,
}

impl Ledger {
    #[must_use]
    pub fn new(asset_id: AssetId, budget: Decimal, reinvest_profit: bool) -> Self {
        Self {
            asset_id,
            budget,
            reinvest_profit,
            position: Position::default(),
        }
    }

    #[must_use]
    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    /// Budget ceiling, raised by realized profit when reinvestment is on.
    #[must_use]
    pub fn effective_budget(&self) -> Decimal {
        if self.reinvest_profit && self.position.realized_pnl > Decimal::ZERO {
            self.budget + self.position.realized_pnl
        } else {
            self.budget
        }
    }

    /// Applies one confirmed fill: quantity and cost basis move as a single
    /// atomic pair, realized P&L is booked for any closed portion at the old
    /// basis, and committed cash is recomputed in the same step.
    ///
    /// # Errors
    ///
    /// `LedgerError::BudgetExceeded` when the projected committed cash would
    /// pass the budget ceiling; the position is left untouched.
    /// `LedgerError::Integrity` on a zero-quantity or non-positively-priced
    /// fill, which no correct gateway produces.
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<&Position, LedgerError> {
        let q = fill.quantity;
        let p = fill.price;
        if q.is_zero() {
            return Err(LedgerError::Integrity {
                asset_id: self.asset_id.clone(),
                reason: format!("zero-quantity fill for order {}", fill.order_id),
            });
        }
        if p <= Decimal::ZERO {
            return Err(LedgerError::Integrity {
                asset_id: self.asset_id.clone(),
                reason: format!("non-positive price {p} for order {}", fill.order_id),
            });
        }

        let old = self
            .position
            .lots
            .get(&fill.vehicle)
            .cloned()
            .unwrap_or(Lot {
                quantity: Decimal::ZERO,
                basis: Decimal::ZERO,
            });

        let (candidate, realized_delta) = Self::merge(&old, q, p);

        let projected = self
            .position
            .committed_with(&fill.vehicle, candidate.as_ref());
        let ceiling = self.effective_budget();
        if projected > ceiling {
            return Err(LedgerError::BudgetExceeded {
                asset_id: self.asset_id.clone(),
                projected,
                ceiling,
            });
        }

        match candidate {
            Some(lot) => {
                self.position.lots.insert(fill.vehicle.clone(), lot);
            }
            None => {
                self.position.lots.remove(&fill.vehicle);
            }
        }
        self.position.realized_pnl += realized_delta;
        self.position.cash_committed = self.position.committed_with(&fill.vehicle, None)
            + self
                .position
                .lots
                .get(&fill.vehicle)
                .map_or(Decimal::ZERO, |l| l.quantity.abs() * l.basis);

        tracing::debug!(
            asset_id = %self.asset_id,
            vehicle = %fill.vehicle,
            quantity = %q,
            price = %p,
            committed = %self.position.cash_committed,
            realized = %self.position.realized_pnl,
            "fill applied"
        );
        Ok(&self.position)
    }

    /// Folds a signed fill into a lot. Returns the resulting lot (`None`
    /// when the position fully closes) and the realized P&L delta.
    fn merge(old: &Lot, q: Decimal, p: Decimal) -> (Option<Lot>, Decimal) {
        let oq = old.quantity;
        let ob = old.basis;

        if oq.is_zero() {
            // Fresh open.
            return (Some(Lot { quantity: q, basis: p }), Decimal::ZERO);
        }

        if (oq > Decimal::ZERO) == (q > Decimal::ZERO) {
            // Same side: weighted-average basis.
            let quantity = oq + q;
            let basis = (oq * ob + q * p) / quantity;
            return (Some(Lot { quantity, basis }), Decimal::ZERO);
        }

        // Opposite side: close up to |oq| at the old basis, then any
        // remainder opens fresh at the fill price.
        let closed = q.abs().min(oq.abs());
        let side = if oq > Decimal::ZERO {
            Decimal::ONE
        } else {
            -Decimal::ONE
        };
        let realized = closed * (p - ob) * side;
        let remaining = oq + q;

        if remaining.is_zero() {
            (None, realized)
        } else if (remaining > Decimal::ZERO) == (oq > Decimal::ZERO) {
            // Partial close: basis unchanged for what's left.
            (
                Some(Lot {
                    quantity: remaining,
                    basis: ob,
                }),
                realized,
            )
        } else {
            // Crossed through zero: remainder is a new lot at fill price.
            (
                Some(Lot {
                    quantity: remaining,
                    basis: p,
                }),
                realized,
            )
        }
    }
}
