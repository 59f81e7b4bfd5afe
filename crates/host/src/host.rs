use pigskin_core::{
    classify, deal, deal_seed, ActivityLogEntry, Classification, HandToken, InjurySet, League,
    LeagueId, Member, MemberId, Play, Roster, TierPool,
};
use rand::seq::SliceRandom;
use rand::Rng;
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;
use tracing::{debug, warn};

new_key_type! { pub struct MemberKey; }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("league {0} has no members")]
    EmptyQueue(LeagueId),
    #[error("play {got} applied out of order, expected {expected}")]
    OutOfOrder { expected: usize, got: usize },
}

/// Read-only inputs shared by every league within a tick.
#[derive(Clone, Copy, Debug)]
pub struct DealContext<'a> {
    pub tiers: &'a TierPool,
    pub injuries: &'a InjurySet,
    pub roster: &'a Roster,
    pub season_seed: u64,
}

/// What applying one play did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayStep {
    pub index: usize,
    pub holder: MemberId,
    pub classification: Classification,
    /// Member who received a fresh hand after a rotation.
    pub dealt_to: Option<MemberId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostStats {
    pub plays: usize,
    pub rotations: usize,
    pub malformed: usize,
    pub fallback_deals: usize,
}

/// Every mutation produced for one league, to be committed as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeagueCommit {
    /// League document with the advanced cursor and deal counter.
    pub league: League,
    /// All members, `queue_order` renumbered `1..=N`.
    pub members: Vec<Member>,
    /// New entries, in play order.
    pub activity: Vec<ActivityLogEntry>,
    /// Drop the stored activity log before writing `activity`.
    pub clear_activity: bool,
}

/// One league's committed state loaded into memory, ready to fold plays.
///
/// Members live in an arena; the queue is a ring of arena keys and a head
/// offset, so rotating the pigskin moves the head instead of the members.
/// `Member::queue_order` is only brought up to date by [`into_commit`].
///
/// [`into_commit`]: LeagueHost::into_commit
pub struct LeagueHost<'a> {
    league: League,
    members: SlotMap<MemberKey, Member>,
    ring: Vec<MemberKey>,
    head: usize,
    ctx: DealContext<'a>,
    staged: Vec<ActivityLogEntry>,
    clear_activity: bool,
    stats: HostStats,
}

impl<'a> LeagueHost<'a> {
    /// Members are ranked by `(queue_order, id)`, whatever the stored numbering.
    pub fn load(
        mut league: League,
        mut members: Vec<Member>,
        ctx: DealContext<'a>,
    ) -> Result<Self, HostError> {
        if members.is_empty() {
            return Err(HostError::EmptyQueue(league.id));
        }

        // The next token must exceed every token already held.
        let held = members
            .iter()
            .filter_map(|m| m.hand.as_ref().map(|h| h.token.0))
            .max()
            .unwrap_or(0);
        league.hands_dealt = league.hands_dealt.max(held);

        members.sort_by(|a, b| (a.queue_order, &a.id).cmp(&(b.queue_order, &b.id)));

        let mut arena = SlotMap::with_capacity_and_key(members.len());
        let ring = members.into_iter().map(|m| arena.insert(m)).collect();

        Ok(Self {
            league,
            members: arena,
            ring,
            head: 0,
            ctx,
            staged: Vec::new(),
            clear_activity: false,
            stats: HostStats::default(),
        })
    }

    pub fn league(&self) -> &League {
        &self.league
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    #[inline]
    fn key_at(&self, rank: usize) -> MemberKey {
        self.ring[(self.head + rank - 1) % self.ring.len()]
    }

    /// Member at `rank` (1-based).
    pub fn member_at(&self, rank: usize) -> Option<&Member> {
        if rank == 0 || rank > self.ring.len() {
            return None;
        }
        self.members.get(self.key_at(rank))
    }

    pub fn holder(&self) -> &Member {
        &self.members[self.key_at(1)]
    }

    /// Members in rank order, paired with their current rank.
    pub fn ranked(&self) -> impl Iterator<Item = (u32, &Member)> + '_ {
        (1..=self.ring.len()).map(move |rank| (rank as u32, &self.members[self.key_at(rank)]))
    }

    /// Forget the stored cursor so the whole log is applied again.
    pub fn rewind_cursor(&mut self) {
        self.league.last_play_index = -1;
    }

    /// Classify `play`, score the holder, rotate on a burn, stage the log entry.
    ///
    /// Plays must arrive in index order with no gaps.
    pub fn apply_play(&mut self, play: &Play) -> Result<PlayStep, HostError> {
        let expected = (self.league.last_play_index + 1).max(0) as usize;
        if play.index != expected {
            return Err(HostError::OutOfOrder {
                expected,
                got: play.index,
            });
        }

        let holder_key = self.key_at(1);
        let holder = &self.members[holder_key];
        let classification = classify(play, holder.hand.as_ref(), self.ctx.roster);
        let holder_id = holder.id.clone();
        let username = holder.username.clone();

        if classification.malformed {
            warn!(league = %self.league.id, index = play.index, "malformed play record, scoring as null play");
            self.stats.malformed += 1;
        }

        let points = classification.points_to_add();
        let member = &mut self.members[holder_key];
        member.score_total = member.score_total.saturating_add(points);

        let dealt_to = if classification.should_rotate() {
            let receiver = self.rotate();
            self.stats.rotations += 1;
            Some(self.members[receiver].id.clone())
        } else {
            None
        };

        debug!(
            league = %self.league.id,
            index = play.index,
            holder = %holder_id,
            outcome = ?classification.outcome,
            points,
            "play applied"
        );

        self.staged
            .push(ActivityLogEntry::describe(play, &username, classification.outcome));
        self.league.last_play_index = play.index as i64;
        self.stats.plays += 1;

        Ok(PlayStep {
            index: play.index,
            holder: holder_id,
            classification,
            dealt_to,
        })
    }

    /// Pass the pigskin: clear the holder's hand, move them to the back, and
    /// deal the member now on deck. Returns the member who was dealt.
    fn rotate(&mut self) -> MemberKey {
        let holder = self.key_at(1);
        self.members[holder].hand = None;
        self.head = (self.head + 1) % self.ring.len();

        // A lone member is both holder and next in line.
        let receiver = if self.ring.len() >= 2 {
            self.key_at(2)
        } else {
            self.key_at(1)
        };
        self.deal_to(receiver);
        receiver
    }

    fn deal_to(&mut self, key: MemberKey) {
        self.league.hands_dealt += 1;
        let token = HandToken(self.league.hands_dealt);
        let seed = deal_seed(self.ctx.season_seed, &self.league.id, token);
        let dealt = deal(self.ctx.tiers, self.ctx.injuries, seed, token);
        if dealt.used_fallback() {
            self.stats.fallback_deals += 1;
        }

        let member = &mut self.members[key];
        debug!(
            league = %self.league.id,
            member = %member.id,
            token = token.0,
            players = ?dealt.hand.player_ids,
            "hand dealt"
        );
        member.hand = Some(dealt.hand);
    }

    /// Shuffle the queue and deal fresh hands to the holder and on-deck member.
    pub fn shuffle_and_deal<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.ring.shuffle(rng);
        self.head = 0;
        for member in self.members.values_mut() {
            member.hand = None;
        }
        for rank in 1..=self.ring.len().min(2) {
            let key = self.key_at(rank);
            self.deal_to(key);
        }
    }

    /// Zero every score, clear every hand and the activity log, rewind the
    /// cursor. Queue order is kept.
    pub fn reset(&mut self) {
        for member in self.members.values_mut() {
            member.score_total = 0;
            member.hand = None;
        }
        self.rewind_cursor();
        self.staged.clear();
        self.clear_activity = true;
    }

    pub fn into_commit(mut self) -> LeagueCommit {
        let mut members = Vec::with_capacity(self.ring.len());
        for rank in 1..=self.ring.len() {
            let key = self.key_at(rank);
            if let Some(mut member) = self.members.remove(key) {
                member.queue_order = rank as u32;
                members.push(member);
            }
        }

        LeagueCommit {
            league: self.league,
            members,
            activity: self.staged,
            clear_activity: self.clear_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pigskin_core::{GameMode, Hand, LogKind, Outcome, PlayLog};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        tiers: TierPool,
        injuries: InjurySet,
        roster: Roster,
    }

    impl Fixture {
        fn new() -> Self {
            let ids = |prefix: &str| (1..=3).map(|i| format!("{prefix}p{i}")).collect();
            Self {
                tiers: TierPool::new(ids("t1"), ids("t2"), ids("t3")).unwrap(),
                injuries: InjurySet::new(),
                roster: Roster::default(),
            }
        }

        fn ctx(&self) -> DealContext<'_> {
            DealContext {
                tiers: &self.tiers,
                injuries: &self.injuries,
                roster: &self.roster,
                season_seed: 42,
            }
        }
    }

    fn hand(token: u64, ids: [&str; 3]) -> Hand {
        Hand {
            token: HandToken(token),
            player_ids: ids.map(String::from),
        }
    }

    /// A holds `[t1p1, t2p1, t3p1]`, B is on deck, C waits.
    fn abc() -> (League, Vec<Member>) {
        let mut league = League::new("league", GameMode::Pigskin);
        league.hands_dealt = 2;
        let mut a = Member::new("a", "amy", 1);
        a.hand = Some(hand(1, ["t1p1", "t2p1", "t3p1"]));
        let mut b = Member::new("b", "bob", 2);
        b.hand = Some(hand(2, ["t1p2", "t2p2", "t3p2"]));
        let c = Member::new("c", "cat", 3);
        (league, vec![c, a, b])
    }

    fn log(plays: Vec<Play>) -> PlayLog {
        PlayLog::new(plays)
    }

    fn neutral_play(i: usize) -> Play {
        Play::new(format!("X.Nobody run {i}")).with_stat("nobody", "Rushing", "rushYds", "1")
    }

    fn order(commit: &LeagueCommit) -> Vec<(&str, u32)> {
        commit
            .members
            .iter()
            .map(|m| (m.id.as_str(), m.queue_order))
            .collect()
    }

    #[test]
    fn test_load_rejects_empty_queue() {
        let fx = Fixture::new();
        let league = League::new("empty", GameMode::Pigskin);
        let err = LeagueHost::load(league, Vec::new(), fx.ctx()).err();
        assert_eq!(err, Some(HostError::EmptyQueue("empty".into())));
    }

    #[test]
    fn test_load_ranks_by_queue_order() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let host = LeagueHost::load(league, members, fx.ctx()).unwrap();
        assert_eq!(host.holder().id, "a");
        assert_eq!(host.member_at(2).map(|m| m.id.as_str()), Some("b"));
        assert_eq!(host.member_at(3).map(|m| m.id.as_str()), Some("c"));
        assert!(host.member_at(4).is_none());
        assert!(host.member_at(0).is_none());
    }

    #[test]
    fn test_burn_rotates_and_deals_on_deck() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();

        let plays = log(vec![Play::new("t1p1 rushes for 5 yards")
            .with_stat("t1p1", "Rushing", "rushYds", "5")]);
        let step = host.apply_play(&plays.plays_from(0)[0]).unwrap();
        assert_eq!(step.classification.outcome, Outcome::Burn);
        assert_eq!(step.dealt_to.as_deref(), Some("c"));

        let commit = host.into_commit();
        assert_eq!(order(&commit), vec![("b", 1), ("c", 2), ("a", 3)]);

        let a = &commit.members[2];
        assert!(a.hand.is_none());
        assert_eq!(a.score_total, 0);

        let c = &commit.members[1];
        let c_hand = c.hand.as_ref().expect("on-deck member dealt");
        assert_eq!(c_hand.token, HandToken(3));
        for (i, player) in c_hand.player_ids.iter().enumerate() {
            assert_eq!(fx.tiers.tier_of(player), Some(i as u8 + 1));
        }

        assert_eq!(commit.league.last_play_index, 0);
        assert_eq!(commit.league.hands_dealt, 3);
        assert_eq!(commit.activity.len(), 1);
        assert_eq!(commit.activity[0].message, "amy 🔥");
        assert_eq!(commit.activity[0].kind, LogKind::Burn);
    }

    #[test]
    fn test_stale_hands_dealt_never_reissues_a_held_token() {
        let fx = Fixture::new();
        let mut league = League::new("league", GameMode::Pigskin);
        league.hands_dealt = 0;
        let mut a = Member::new("a", "amy", 1);
        a.hand = Some(hand(5, ["t1p1", "t2p1", "t3p1"]));
        let mut b = Member::new("b", "bob", 2);
        b.hand = Some(hand(1, ["t1p2", "t2p2", "t3p2"]));
        let c = Member::new("c", "cat", 3);
        let mut host = LeagueHost::load(league, vec![a, b, c], fx.ctx()).unwrap();
        assert_eq!(host.league().hands_dealt, 5);

        let plays = log(vec![Play::new("t1p1 rushes for 5 yards")
            .with_stat("t1p1", "Rushing", "rushYds", "5")]);
        let step = host.apply_play(&plays.plays_from(0)[0]).unwrap();
        assert_eq!(step.dealt_to.as_deref(), Some("c"));

        let commit = host.into_commit();
        let tokens: Vec<HandToken> = commit
            .members
            .iter()
            .filter_map(|m| m.hand.as_ref().map(|h| h.token))
            .collect();
        assert_eq!(tokens, vec![HandToken(1), HandToken(6)]);
        assert_eq!(commit.league.hands_dealt, 6);
    }

    #[test]
    fn test_touchdown_keeps_holder() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();

        let plays = log(vec![Play::new("t1p1 rushes for 2 yards, TOUCHDOWN")
            .with_stat("t1p1", "Rushing", "rushYds", "2")
            .with_stat("t1p1", "Rushing", "rushTD", "1")]);
        host.apply_play(&plays.plays_from(0)[0]).unwrap();

        let commit = host.into_commit();
        assert_eq!(order(&commit), vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(commit.members[0].score_total, 7);
        assert_eq!(
            commit.members[0].hand,
            Some(hand(1, ["t1p1", "t2p1", "t3p1"]))
        );
        assert_eq!(commit.activity[0].message, "amy +7 (TD)");
        assert_eq!(commit.league.hands_dealt, 2);
    }

    #[test]
    fn test_null_play_changes_nothing() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();

        let plays = log(vec![Play::new("Timeout.")]);
        host.apply_play(&plays.plays_from(0)[0]).unwrap();

        let commit = host.into_commit();
        assert_eq!(order(&commit), vec![("a", 1), ("b", 2), ("c", 3)]);
        assert!(commit.members.iter().all(|m| m.score_total == 0));
        assert_eq!(commit.activity[0].kind, LogKind::Neutral);
        assert_eq!(commit.activity[0].message, "GAME UPDATE");
        assert_eq!(commit.league.last_play_index, 0);
    }

    #[test]
    fn test_survival_run_scores_k_without_rotation() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();

        let plays = log((0..25).map(neutral_play).collect());
        for play in plays.plays_from(0) {
            host.apply_play(play).unwrap();
        }
        assert_eq!(host.stats().plays, 25);
        assert_eq!(host.stats().rotations, 0);

        let commit = host.into_commit();
        assert_eq!(order(&commit), vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(commit.members[0].score_total, 25);
        assert_eq!(commit.league.last_play_index, 24);
        assert_eq!(commit.activity.len(), 25);
    }

    #[test]
    fn test_out_of_order_play_is_rejected() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();

        let plays = log((0..3).map(neutral_play).collect());
        let err = host.apply_play(&plays.plays_from(0)[2]).unwrap_err();
        assert_eq!(
            err,
            HostError::OutOfOrder {
                expected: 0,
                got: 2
            }
        );
        host.apply_play(&plays.plays_from(0)[0]).unwrap();
        assert!(host.apply_play(&plays.plays_from(0)[0]).is_err());
    }

    #[test]
    fn test_only_top_two_hold_hands_through_many_burns() {
        let fx = Fixture::new();
        let mut league = League::new("league", GameMode::Pigskin);
        let members: Vec<Member> = (1..=5)
            .map(|i| Member::new(format!("m{i}"), format!("user{i}"), i))
            .collect();
        let mut host = LeagueHost::load(league.clone(), members, fx.ctx()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        host.shuffle_and_deal(&mut rng);
        league = host.league().clone();
        assert_eq!(league.hands_dealt, 2);

        // Every play names every player, so each one burns the holder.
        let mut burn = Play::new("pile up");
        for tier in 1..=3 {
            for p in 1..=3 {
                burn = burn.with_stat(format!("t{tier}p{p}"), "Defense", "tackles", "1");
            }
        }
        let plays = log(vec![burn; 12]);
        let mut holders = Vec::new();
        for play in plays.plays_from(0) {
            let step = host.apply_play(play).unwrap();
            assert_eq!(step.classification.outcome, Outcome::Burn);
            holders.push(step.holder);

            let with_hands: Vec<u32> = host
                .ranked()
                .filter(|(_, m)| m.hand.is_some())
                .map(|(rank, _)| rank)
                .collect();
            assert_eq!(with_hands, vec![1, 2]);
        }

        // Holders cycle through the queue in order.
        assert_eq!(holders[0], holders[5]);
        assert_eq!(holders[1], holders[6]);

        let commit = host.into_commit();
        let mut ranks: Vec<u32> = commit.members.iter().map(|m| m.queue_order).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(commit.league.hands_dealt, 14);
    }

    #[test]
    fn test_two_member_burn_swaps_and_redeals() {
        let fx = Fixture::new();
        let mut league = League::new("league", GameMode::Pigskin);
        league.hands_dealt = 2;
        let mut a = Member::new("a", "amy", 1);
        a.hand = Some(hand(1, ["t1p1", "t2p1", "t3p1"]));
        let mut b = Member::new("b", "bob", 2);
        b.hand = Some(hand(2, ["t1p2", "t2p2", "t3p2"]));
        let mut host = LeagueHost::load(league, vec![a, b], fx.ctx()).unwrap();

        let plays = log(vec![Play::new("sack").with_stat("t3p1", "Defense", "sacked", "1")]);
        let step = host.apply_play(&plays.plays_from(0)[0]).unwrap();
        assert_eq!(step.dealt_to.as_deref(), Some("a"));

        let commit = host.into_commit();
        assert_eq!(order(&commit), vec![("b", 1), ("a", 2)]);
        assert_eq!(commit.members[1].hand.as_ref().map(|h| h.token), Some(HandToken(3)));
        assert_eq!(commit.members[0].hand.as_ref().map(|h| h.token), Some(HandToken(2)));
    }

    #[test]
    fn test_single_member_burn_redeals_holder() {
        let fx = Fixture::new();
        let league = League::new("solo", GameMode::Pigskin);
        let mut a = Member::new("a", "amy", 1);
        a.hand = Some(hand(1, ["t1p1", "t2p1", "t3p1"]));
        let mut host = LeagueHost::load(league, vec![a], fx.ctx()).unwrap();

        let plays = log(vec![Play::new("t1p1 run").with_stat("t1p1", "Rushing", "rushYds", "1")]);
        let step = host.apply_play(&plays.plays_from(0)[0]).unwrap();
        assert_eq!(step.dealt_to.as_deref(), Some("a"));

        let commit = host.into_commit();
        assert_eq!(commit.members[0].queue_order, 1);
        assert!(commit.members[0].hand.is_some());
    }

    #[test]
    fn test_replay_from_same_state_is_identical() {
        let fx = Fixture::new();
        let mut burn = Play::new("pile up");
        for tier in 1..=3 {
            for p in 1..=3 {
                burn = burn.with_stat(format!("t{tier}p{p}"), "Defense", "tackles", "1");
            }
        }
        let plays = log(vec![neutral_play(0), burn.clone(), Play::new("Timeout."), burn]);

        let run = || {
            let (league, members) = abc();
            let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();
            for play in plays.plays_from(0) {
                host.apply_play(play).unwrap();
            }
            host.into_commit()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_noncontiguous_queue_is_renumbered() {
        let fx = Fixture::new();
        let league = League::new("league", GameMode::Pigskin);
        let members = vec![
            Member::new("x", "x", 10),
            Member::new("y", "y", 4),
            Member::new("z", "z", 4),
        ];
        let host = LeagueHost::load(league, members, fx.ctx()).unwrap();
        let commit = host.into_commit();
        assert_eq!(order(&commit), vec![("y", 1), ("z", 2), ("x", 3)]);
    }

    #[test]
    fn test_shuffle_and_deal_top_two() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        host.shuffle_and_deal(&mut rng);

        let commit = host.into_commit();
        assert!(commit.members[0].hand.is_some());
        assert!(commit.members[1].hand.is_some());
        assert!(commit.members[2].hand.is_none());
        assert_eq!(commit.league.hands_dealt, 4);
        assert_eq!(commit.league.last_play_index, -1);
        assert!(commit.activity.is_empty());
    }

    #[test]
    fn test_reset_clears_scores_hands_and_cursor() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();
        let plays = log((0..4).map(neutral_play).collect());
        for play in plays.plays_from(0) {
            host.apply_play(play).unwrap();
        }
        host.reset();

        let commit = host.into_commit();
        assert!(commit.clear_activity);
        assert!(commit.activity.is_empty());
        assert_eq!(commit.league.last_play_index, -1);
        assert!(commit.members.iter().all(|m| m.score_total == 0 && m.hand.is_none()));
        assert_eq!(order(&commit), vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn test_malformed_play_counts_and_scores_nothing() {
        let fx = Fixture::new();
        let (league, members) = abc();
        let mut host = LeagueHost::load(league, members, fx.ctx()).unwrap();
        let mut play = Play::new("t1p1 rushes");
        play.player_stats = None;
        let plays = log(vec![play]);
        let step = host.apply_play(&plays.plays_from(0)[0]).unwrap();
        assert!(step.classification.malformed);
        assert_eq!(host.stats().malformed, 1);
        assert_eq!(host.holder().score_total, 0);
    }
}
