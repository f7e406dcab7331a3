//! The two tradeable sides of a swap.
//!
//! Exactly one side is BTC at all times. The non-BTC side may be unresolved
//! (`None`) when no Rune is available to fill it.

use crate::models::{Asset, SwapDirection};

/// Outcome of a pair mutation. `Changed` means downstream amount and quote
/// state must be cleared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairChange {
    Changed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetPair {
    input: Option<Asset>,
    output: Option<Asset>,
}

impl AssetPair {
    /// BTC in, first available Rune out.
    pub fn new_default(available: &[Asset]) -> Self {
        Self {
            input: Some(Asset::btc()),
            output: fallback_rune(available),
        }
    }

    pub fn input(&self) -> Option<&Asset> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&Asset> {
        self.output.as_ref()
    }

    /// The non-BTC side, once resolved.
    pub fn rune(&self) -> Option<&Asset> {
        [self.input.as_ref(), self.output.as_ref()]
            .into_iter()
            .flatten()
            .find(|a| !a.is_btc)
    }

    pub fn direction(&self) -> SwapDirection {
        SwapDirection::from_sell_flag(self.is_sell())
    }

    /// True when the input side is not BTC.
    pub fn is_sell(&self) -> bool {
        !self.input.as_ref().is_some_and(|a| a.is_btc)
    }

    pub fn select_input(&mut self, asset: Asset, available: &[Asset]) -> PairChange {
        if self.output.as_ref().is_some_and(|o| o.id == asset.id) {
            return PairChange::Rejected;
        }
        if asset.is_btc {
            if !side_is_rune(&self.output) {
                self.output = fallback_rune(available);
            }
        } else {
            self.output = Some(Asset::btc());
        }
        self.input = Some(asset);
        PairChange::Changed
    }

    pub fn select_output(&mut self, asset: Asset, available: &[Asset]) -> PairChange {
        if self.input.as_ref().is_some_and(|i| i.id == asset.id) {
            return PairChange::Rejected;
        }
        if asset.is_btc {
            if !side_is_rune(&self.input) {
                self.input = fallback_rune(available);
            }
        } else {
            self.input = Some(Asset::btc());
        }
        self.output = Some(asset);
        PairChange::Changed
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.input, &mut self.output);
    }

    /// Exactly one side is BTC and no side is BTC twice.
    pub fn is_valid(&self) -> bool {
        let btc_sides = [&self.input, &self.output]
            .into_iter()
            .filter(|side| side.as_ref().is_some_and(|a| a.is_btc))
            .count();
        btc_sides == 1
    }
}

fn side_is_rune(side: &Option<Asset>) -> bool {
    side.as_ref().is_some_and(|a| !a.is_btc)
}

fn fallback_rune(available: &[Asset]) -> Option<Asset> {
    available.iter().find(|a| !a.is_btc).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runes() -> Vec<Asset> {
        vec![
            Asset::btc(),
            Asset::rune("840000:3", "DOG•GO•TO•THE•MOON"),
            Asset::rune("840000:41", "PUPS•WORLD•PEACE"),
        ]
    }

    #[test]
    fn default_pair_is_btc_to_first_rune() {
        let pair = AssetPair::new_default(&runes());
        assert!(pair.input().unwrap().is_btc);
        assert_eq!(pair.output().unwrap().id, "840000:3");
        assert_eq!(pair.direction(), SwapDirection::Buy);
        assert!(pair.is_valid());
    }

    #[test]
    fn default_pair_without_runes_leaves_output_unresolved() {
        let pair = AssetPair::new_default(&[]);
        assert!(pair.output().is_none());
        assert!(pair.rune().is_none());
        assert!(pair.is_valid());
    }

    #[test]
    fn selecting_rune_input_forces_btc_output() {
        let available = runes();
        let mut pair = AssetPair::new_default(&available);
        let change = pair.select_input(available[2].clone(), &available);
        assert_eq!(change, PairChange::Changed);
        assert_eq!(pair.input().unwrap().id, "840000:41");
        assert!(pair.output().unwrap().is_btc);
        assert!(pair.is_sell());
        assert!(pair.is_valid());
    }

    #[test]
    fn selecting_same_asset_on_both_sides_is_rejected() {
        let available = runes();
        let mut pair = AssetPair::new_default(&available);
        let before = pair.clone();
        assert_eq!(
            pair.select_input(available[1].clone(), &available),
            PairChange::Rejected
        );
        assert_eq!(
            pair.select_output(Asset::btc(), &available),
            PairChange::Rejected
        );
        assert_eq!(pair, before);
    }

    #[test]
    fn selecting_btc_output_reassigns_btc_input_to_fallback() {
        let available = runes();
        let mut pair = AssetPair::new_default(&available);
        pair.select_input(available[2].clone(), &available);
        // input rune, output BTC -> pick BTC as input again
        pair.select_input(Asset::btc(), &available);
        assert!(pair.input().unwrap().is_btc);
        assert!(pair.output().is_some_and(|o| !o.is_btc));
        assert!(pair.is_valid());
    }

    #[test]
    fn selecting_rune_output_forces_btc_input() {
        let available = runes();
        let mut pair = AssetPair::new_default(&available);
        pair.reverse();
        pair.select_output(available[2].clone(), &available);
        assert!(pair.input().unwrap().is_btc);
        assert_eq!(pair.output().unwrap().id, "840000:41");
        assert!(pair.is_valid());
    }

    #[test]
    fn invariant_holds_across_mutation_sequences() {
        let available = runes();
        let mut pair = AssetPair::new_default(&available);
        let ops: Vec<Box<dyn Fn(&mut AssetPair)>> = vec![
            Box::new(|p| {
                p.select_input(Asset::btc(), &runes());
            }),
            Box::new(|p| {
                p.select_output(Asset::btc(), &runes());
            }),
            Box::new(|p| p.reverse()),
            Box::new(|p| {
                p.select_input(runes()[1].clone(), &runes());
            }),
            Box::new(|p| {
                p.select_output(runes()[2].clone(), &runes());
            }),
        ];
        for i in 0..ops.len() {
            for j in 0..ops.len() {
                for k in 0..ops.len() {
                    ops[i](&mut pair);
                    ops[j](&mut pair);
                    ops[k](&mut pair);
                    assert!(pair.is_valid(), "invariant broken after {i},{j},{k}");
                }
            }
        }
    }

    #[test]
    fn reverse_swaps_sides() {
        let available = runes();
        let mut pair = AssetPair::new_default(&available);
        pair.reverse();
        assert_eq!(pair.input().unwrap().id, "840000:3");
        assert!(pair.output().unwrap().is_btc);
        assert_eq!(pair.direction(), SwapDirection::Sell);
    }
}
