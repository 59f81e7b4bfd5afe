use crate::config::TierPool;
use crate::types::{Hand, HandToken, InjurySet, PlayerId};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

/// A dealt hand, plus the tiers that had no healthy player left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deal {
    pub hand: Hand,
    pub fallback_tiers: Vec<u8>,
}

impl Deal {
    pub fn used_fallback(&self) -> bool {
        !self.fallback_tiers.is_empty()
    }
}

/// Seed for the deal that produces `token` in `league`.
///
/// Version-stable, so replaying an uncommitted range deals the same hands.
pub fn deal_seed(season_seed: u64, league: &str, token: HandToken) -> u64 {
    fxhash::hash64(&(season_seed, league, token.0))
}

/// Seed for a commissioner shuffle issued after `hands_dealt` deals.
pub fn shuffle_seed(season_seed: u64, league: &str, hands_dealt: u64) -> u64 {
    fxhash::hash64(&("shuffle", season_seed, league, hands_dealt))
}

/// Deal one healthy player from each tier, uniformly at random.
///
/// A tier whose players are all injured contributes its first configured
/// player, so the hand is always complete.
pub fn deal(tiers: &TierPool, injuries: &InjurySet, seed: u64, token: HandToken) -> Deal {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut fallback_tiers = Vec::new();

    let player_ids = [1u8, 2, 3].map(|tier| {
        let configured = tiers.tier(tier);
        let healthy: Vec<&PlayerId> = configured
            .iter()
            .filter(|player| !injuries.contains(player))
            .collect();

        match healthy.choose(&mut rng) {
            Some(player) => (*player).clone(),
            None => {
                warn!(tier, token = token.0, "tier fully injured, dealing first configured player");
                fallback_tiers.push(tier);
                configured.first().cloned().unwrap_or_default()
            }
        }
    });

    Deal {
        hand: Hand { token, player_ids },
        fallback_tiers,
    }
}
