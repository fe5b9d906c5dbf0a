//! Referral chain walking and downline enumeration.
//!
//! The referral graph is a single-parent adjacency relation: each user has at
//! most one referrer. Store lookups are injected as closures so the walk can
//! be exercised without a database. Acyclicity is assumed but never trusted:
//! every traversal carries a visited set and a hard layer bound.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::types::RewardType;

/// Share of the fixed member-product price paid per referral/team reward.
pub const REWARD_SHARE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Minimum directly-referred level-6 members for honor-director promotion.
pub const DIRECTOR_DIRECT_THRESHOLD: u64 = 3;

/// Minimum level-6 members in the bounded downline for promotion.
pub const DIRECTOR_DOWNLINE_THRESHOLD: u64 = 10;

/// A commission the settlement should queue for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardPlan {
    /// Upstream member receiving the reward.
    pub recipient: i64,
    /// Referral or team reward.
    pub reward_type: RewardType,
    /// Reward amount (half the fixed member-product price).
    pub amount: Decimal,
    /// Chain distance for team rewards; `None` for referral rewards.
    pub layer: Option<u32>,
}

/// Determines which upstream members earn a reward for a member purchase.
///
/// Rules:
/// - A referral reward fires only when the buyer's level transition starts at
///   0 and a referrer exists, regardless of the referrer's own level.
/// - A team reward is skipped entirely for a 0→1 transition. Otherwise the
///   walk ascends exactly `new_level` hops (bounded by `max_team_layer`); the
///   member at that depth earns a layer-tagged reward only if their own level
///   is at least the target depth. The rule is evaluated once at the target
///   depth, never retried at intermediate layers.
///
/// `referrer_of` and `level_of` are store lookups; `referrer_of` must be
/// called in ascending chain order so the caller can lock rows consistently.
///
/// # Errors
///
/// Propagates the first lookup error unchanged.
pub fn plan_rewards<R, L, E>(
    buyer_id: i64,
    old_level: i16,
    new_level: i16,
    member_product_price: Decimal,
    max_team_layer: u32,
    mut referrer_of: R,
    mut level_of: L,
) -> Result<Vec<RewardPlan>, E>
where
    R: FnMut(i64) -> Result<Option<i64>, E>,
    L: FnMut(i64) -> Result<Option<i16>, E>,
{
    let reward_amount = member_product_price * REWARD_SHARE;
    let mut rewards = Vec::new();

    if old_level == 0 {
        if let Some(referrer) = referrer_of(buyer_id)? {
            rewards.push(RewardPlan {
                recipient: referrer,
                reward_type: RewardType::Referral,
                amount: reward_amount,
                layer: None,
            });
        }
    }

    // First-ever membership (0 -> 1) never produces a team reward.
    if old_level == 0 && new_level == 1 {
        return Ok(rewards);
    }

    let target_layer = u32::try_from(new_level).unwrap_or(0).min(max_team_layer);
    let mut visited: HashSet<i64> = HashSet::from([buyer_id]);
    let mut current = buyer_id;
    let mut depth = 0;

    for _ in 0..target_layer {
        let Some(referrer) = referrer_of(current)? else {
            break;
        };
        if !visited.insert(referrer) {
            // Cycle guard: a repeated node means corrupt data; stop walking.
            break;
        }
        depth += 1;
        current = referrer;
    }

    // The reward requires an ancestor at exactly the target depth; a shorter
    // chain pays nothing, and the rule is not re-evaluated at lower layers.
    if depth == target_layer && depth > 0 {
        let level = level_of(current)?.unwrap_or(0);
        if i32::from(level) >= i32::try_from(target_layer).unwrap_or(i32::MAX) {
            rewards.push(RewardPlan {
                recipient: current,
                reward_type: RewardType::Team,
                amount: reward_amount,
                layer: Some(target_layer),
            });
        }
    }

    Ok(rewards)
}

/// A member of a user's downline with their chain distance from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownlineMember {
    /// The downline member's user id.
    pub user_id: i64,
    /// Referral hops from the root (direct referees are layer 1).
    pub layer: u32,
}

/// Enumerates every user transitively reachable from `root` by following
/// referral edges downward, bounded by `max_layer`.
///
/// Breadth-first so members are returned in ascending layer order. A visited
/// set guarantees termination even if a cycle were introduced.
///
/// # Errors
///
/// Propagates the first lookup error unchanged.
pub fn enumerate_downline<C, E>(
    root: i64,
    max_layer: u32,
    mut children_of: C,
) -> Result<Vec<DownlineMember>, E>
where
    C: FnMut(i64) -> Result<Vec<i64>, E>,
{
    let mut visited: HashSet<i64> = HashSet::from([root]);
    let mut members = Vec::new();
    let mut frontier = vec![root];

    for layer in 1..=max_layer {
        let mut next = Vec::new();
        for parent in frontier {
            for child in children_of(parent)? {
                if visited.insert(child) {
                    members.push(DownlineMember { user_id: child, layer });
                    next.push(child);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Ok(members)
}

/// Honor-director promotion check for a level-6 member.
#[must_use]
pub fn qualifies_for_director(direct_level6: u64, downline_level6: u64) -> bool {
    direct_level6 >= DIRECTOR_DIRECT_THRESHOLD && downline_level6 >= DIRECTOR_DOWNLINE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use rust_decimal_macros::dec;

    const PRICE: Decimal = Decimal::from_parts(1_980_00, 0, 0, false, 2);

    fn walk(
        edges: &HashMap<i64, i64>,
        levels: &HashMap<i64, i16>,
        buyer: i64,
        old_level: i16,
        new_level: i16,
    ) -> Vec<RewardPlan> {
        plan_rewards::<_, _, Infallible>(
            buyer,
            old_level,
            new_level,
            PRICE,
            6,
            |id| Ok(edges.get(&id).copied()),
            |id| Ok(levels.get(&id).copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_first_purchase_rewards_referrer_only() {
        // Buyer 1 (level 0 -> 1) referred by 2 (level 3): referral reward of
        // half the member price, no team reward on a 0 -> 1 transition.
        let edges = HashMap::from([(1, 2)]);
        let levels = HashMap::from([(2, 3)]);
        let rewards = walk(&edges, &levels, 1, 0, 1);
        assert_eq!(
            rewards,
            vec![RewardPlan {
                recipient: 2,
                reward_type: RewardType::Referral,
                amount: dec!(990.00),
                layer: None,
            }]
        );
    }

    #[test]
    fn test_no_referrer_means_no_referral_reward() {
        let rewards = walk(&HashMap::new(), &HashMap::new(), 1, 0, 1);
        assert!(rewards.is_empty());
    }

    #[test]
    fn test_non_zero_start_never_pays_referral() {
        let edges = HashMap::from([(1, 2), (2, 3)]);
        let levels = HashMap::from([(2, 6), (3, 6)]);
        let rewards = walk(&edges, &levels, 1, 1, 2);
        assert!(rewards.iter().all(|r| r.reward_type == RewardType::Team));
    }

    #[test]
    fn test_team_reward_at_target_layer() {
        // Level 2 buyer purchases quantity 3 -> level 5; the 5th-hop
        // ancestor holds level 5 and earns a layer-5 team reward.
        let edges = HashMap::from([(1, 10), (10, 20), (20, 30), (30, 40), (40, 50)]);
        let levels = HashMap::from([(50, 5)]);
        let rewards = walk(&edges, &levels, 1, 2, 5);
        assert_eq!(
            rewards,
            vec![RewardPlan {
                recipient: 50,
                reward_type: RewardType::Team,
                amount: dec!(990.00),
                layer: Some(5),
            }]
        );
    }

    #[test]
    fn test_team_reward_requires_sufficient_level() {
        let edges = HashMap::from([(1, 10), (10, 20), (20, 30), (30, 40), (40, 50)]);
        let levels = HashMap::from([(50, 4)]); // below layer 5
        assert!(walk(&edges, &levels, 1, 2, 5).is_empty());
    }

    #[test]
    fn test_short_chain_pays_nothing_at_intermediate_layers() {
        // Chain is 3 hops but the target layer is 5: no reward at all, the
        // rule is not retried at hop 3.
        let edges = HashMap::from([(1, 10), (10, 20), (20, 30)]);
        let levels = HashMap::from([(10, 6), (20, 6), (30, 6)]);
        assert!(walk(&edges, &levels, 1, 2, 5).is_empty());
    }

    #[test]
    fn test_cycle_guard_terminates_walk() {
        let edges = HashMap::from([(1, 2), (2, 3), (3, 1)]);
        let levels = HashMap::from([(2, 6), (3, 6)]);
        // The walk stops at the repeated node, well short of depth 5, so no
        // reward is paid and no infinite loop occurs.
        assert!(walk(&edges, &levels, 1, 2, 5).is_empty());
    }

    #[test]
    fn test_downline_enumeration_orders_by_layer() {
        let children: HashMap<i64, Vec<i64>> =
            HashMap::from([(1, vec![2, 3]), (2, vec![4]), (4, vec![5])]);
        let members = enumerate_downline::<_, Infallible>(1, 6, |id| {
            Ok(children.get(&id).cloned().unwrap_or_default())
        })
        .unwrap();
        assert_eq!(
            members,
            vec![
                DownlineMember { user_id: 2, layer: 1 },
                DownlineMember { user_id: 3, layer: 1 },
                DownlineMember { user_id: 4, layer: 2 },
                DownlineMember { user_id: 5, layer: 3 },
            ]
        );
    }

    #[test]
    fn test_downline_respects_max_layer() {
        let children: HashMap<i64, Vec<i64>> =
            HashMap::from([(1, vec![2]), (2, vec![3]), (3, vec![4])]);
        let members = enumerate_downline::<_, Infallible>(1, 2, |id| {
            Ok(children.get(&id).cloned().unwrap_or_default())
        })
        .unwrap();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_downline_tolerates_cycles() {
        let children: HashMap<i64, Vec<i64>> = HashMap::from([(1, vec![2]), (2, vec![1])]);
        let members = enumerate_downline::<_, Infallible>(1, 6, |id| {
            Ok(children.get(&id).cloned().unwrap_or_default())
        })
        .unwrap();
        assert_eq!(members, vec![DownlineMember { user_id: 2, layer: 1 }]);
    }

    #[test]
    fn test_director_thresholds() {
        assert!(qualifies_for_director(3, 10));
        assert!(qualifies_for_director(5, 12));
        assert!(!qualifies_for_director(2, 15));
        assert!(!qualifies_for_director(4, 9));
    }
}
