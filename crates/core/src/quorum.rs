//! Majority-by-hash reduction over settled provider results.
//!
//! Only `ok` results vote. A hash wins when its multiplicity reaches the
//! threshold, and the winning result is the first one (in round order) that
//! carries it. With three providers and a threshold of two, at most one hash
//! can qualify. For wider rounds the rule is: highest multiplicity first, then
//! earliest first-seen position.

use tracing::warn;

use crate::domain::plan::Plan;
use crate::domain::provider::ProviderResult;

pub const QUORUM_THRESHOLD: usize = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct QuorumDecision<'a> {
    pub ok: bool,
    pub winning_result: Option<&'a ProviderResult>,
    /// Hashes of every `ok` result, in round order.
    pub all_hashes: Vec<&'a str>,
}

impl<'a> QuorumDecision<'a> {
    pub fn winning_hash(&self) -> Option<&'a str> {
        self.winning_result.and_then(ProviderResult::hash)
    }

    pub fn winning_plan(&self) -> Option<&'a Plan> {
        self.winning_result.and_then(ProviderResult::plan)
    }
}

struct HashTally<'a> {
    hash: &'a str,
    first_index: usize,
    count: usize,
}

pub fn decide(results: &[ProviderResult], threshold: usize) -> QuorumDecision<'_> {
    let mut tallies: Vec<HashTally<'_>> = Vec::new();
    let mut all_hashes = Vec::new();

    for (index, result) in results.iter().enumerate() {
        let Some(hash) = result.hash().filter(|_| result.ok()) else {
            continue;
        };
        all_hashes.push(hash);

        match tallies.iter_mut().find(|tally| tally.hash == hash) {
            Some(tally) => tally.count += 1,
            None => tallies.push(HashTally { hash, first_index: index, count: 1 }),
        }
    }

    let threshold = threshold.max(1);
    let mut qualifying: Vec<&HashTally<'_>> =
        tallies.iter().filter(|tally| tally.count >= threshold).collect();

    if qualifying.len() > 1 {
        warn!(
            event_name = "quorum.multiple_qualifying_hashes",
            qualifying = qualifying.len(),
            providers = results.len(),
            threshold,
            "more than one hash reached quorum; choosing highest count, then earliest"
        );
    }
    qualifying.sort_by(|left, right| {
        right.count.cmp(&left.count).then(left.first_index.cmp(&right.first_index))
    });

    let winning_result = qualifying.first().map(|tally| &results[tally.first_index]);
    QuorumDecision { ok: winning_result.is_some(), winning_result, all_hashes }
}
