use crate::entity::types::DocKind;

/// Posts carry the thread topic, so their votes count a bit more
pub const POST_MULTIPLIER: f64 = 1.35;
pub const COMMENT_MULTIPLIER: f64 = 1.0;

/// `sign(x) * ln(1 + |x|)`
pub fn sign_log(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    x.signum() * x.abs().ln_1p()
}

pub fn kind_multiplier(kind: DocKind) -> f64 {
    match kind {
        DocKind::Post => POST_MULTIPLIER,
        DocKind::Comment => COMMENT_MULTIPLIER,
    }
}

/// Weight of one mention given the community score of its document
pub fn vote_weight(score: i64, kind: DocKind) -> f64 {
    (1.0 + sign_log(score as f64)) * kind_multiplier(kind)
}
