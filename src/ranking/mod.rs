pub mod aggregate;
pub mod display;
pub mod rank;
pub mod weight;

pub use aggregate::{aggregate_mentions, merge_aggregates, VoteAggregate};
pub use rank::{rank_aggregates, RankedEntity};
pub use weight::vote_weight;

// Module-level constants
pub const TARGET_RANKING: &str = "ranking";
