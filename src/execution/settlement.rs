use crate::domain::CandidateOrder;
use ethers::types::{Address, U256};

/// Share of the profit margin released to the fill as slippage tolerance (1/10).
const SLIPPAGE_DIVISOR: u64 = 10;

/// Slippage-adjusted amount handed to the external fill
///
/// keep_token_in:  min_amount_in + (in_amount - min_amount_in) / 10
/// otherwise:      out_amount - out_diff / 10
///
/// Integer division truncates. Subtractions saturate at zero.
pub fn compute_settlement(candidate: &CandidateOrder, keep_token_in: bool) -> U256 {
    let divisor = U256::from(SLIPPAGE_DIVISOR);

    if keep_token_in {
        let in_diff = candidate.in_amount.saturating_sub(candidate.min_amount_in) / divisor;
        candidate.min_amount_in.saturating_add(in_diff)
    } else {
        candidate
            .out_amount
            .saturating_sub(candidate.out_diff / divisor)
    }
}

/// Ranked list of tokens the relayer wants to collect profit in
///
/// Stored least preferred first: a larger index means a more preferred token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfitTokens {
    ranked: Vec<Address>,
}

impl ProfitTokens {
    /// Build from a list ordered most preferred first.
    pub fn from_preferred<I>(preferred: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        let mut ranked: Vec<Address> = preferred.into_iter().collect();
        ranked.reverse();
        Self { ranked }
    }

    /// Build from a list already ordered least preferred first.
    pub fn from_ranked(ranked: Vec<Address>) -> Self {
        Self { ranked }
    }

    pub fn ranked(&self) -> &[Address] {
        &self.ranked
    }

    /// -1 when the token is not a profit token
    fn rank(&self, token: Address) -> i64 {
        self.ranked
            .iter()
            .position(|t| *t == token)
            .map_or(-1, |idx| idx as i64)
    }

    /// Keep the profit in the input token when it outranks the output token.
    pub fn keep_token_in(&self, token_in: Address, token_out: Address) -> bool {
        self.rank(token_in) > self.rank(token_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures;

    fn candidate(
        in_amount: u64,
        min_amount_in: u64,
        out_amount: u64,
        out_diff: u64,
    ) -> CandidateOrder {
        CandidateOrder {
            limit_order: fixtures::record(1, "1"),
            in_amount: U256::from(in_amount),
            min_amount_in: U256::from(min_amount_in),
            out_amount: U256::from(out_amount),
            out_diff: U256::from(out_diff),
        }
    }

    #[test]
    fn test_settlement_keeping_token_in() {
        // 900 + (1000 - 900) / 10 = 910
        let c = candidate(1000, 900, 0, 0);
        assert_eq!(compute_settlement(&c, true), U256::from(910u64));
    }

    #[test]
    fn test_settlement_keeping_token_out() {
        // 500 - 50 / 10 = 495
        let c = candidate(0, 0, 500, 50);
        assert_eq!(compute_settlement(&c, false), U256::from(495u64));
    }

    #[test]
    fn test_settlement_truncates() {
        // (1009 - 900) / 10 = 10.9 -> 10
        let c = candidate(1009, 900, 500, 59);
        assert_eq!(compute_settlement(&c, true), U256::from(910u64));
        assert_eq!(compute_settlement(&c, false), U256::from(495u64));
    }

    #[test]
    fn test_settlement_never_underflows() {
        let c = candidate(100, 900, 1, 50);
        assert_eq!(compute_settlement(&c, true), U256::from(900u64));
        assert_eq!(compute_settlement(&c, false), U256::zero());
    }

    #[test]
    fn test_settlement_wide_amounts() {
        let mut c = candidate(0, 0, 0, 0);
        c.min_amount_in = U256::exp10(30);
        c.in_amount = U256::exp10(30) + U256::exp10(20);
        assert_eq!(
            compute_settlement(&c, true),
            U256::exp10(30) + U256::exp10(19)
        );
    }

    #[test]
    fn test_keep_token_in_uses_higher_rank() {
        let token_a = Address::repeat_byte(0xa);
        let token_b = Address::repeat_byte(0xb);
        let token_c = Address::repeat_byte(0xc);

        let tokens = ProfitTokens::from_ranked(vec![token_c, token_b, token_a]);

        // index(A) = 2 > index(B) = 1
        assert!(tokens.keep_token_in(token_a, token_b));
        assert!(!tokens.keep_token_in(token_b, token_a));
        assert!(!tokens.keep_token_in(token_a, token_a));
    }

    #[test]
    fn test_unknown_tokens_rank_lowest() {
        let known = Address::repeat_byte(0x1);
        let unknown = Address::repeat_byte(0x2);
        let other = Address::repeat_byte(0x3);
        let tokens = ProfitTokens::from_ranked(vec![known]);

        // index(known) = 0 > -1
        assert!(tokens.keep_token_in(known, unknown));
        assert!(!tokens.keep_token_in(unknown, known));
        assert!(!tokens.keep_token_in(unknown, other));
    }

    #[test]
    fn test_from_preferred_reverses() {
        let usdc = Address::repeat_byte(0x1);
        let weth = Address::repeat_byte(0x2);

        let tokens = ProfitTokens::from_preferred([usdc, weth]);

        assert_eq!(tokens.ranked(), &[weth, usdc]);
        assert!(tokens.keep_token_in(usdc, weth));
    }
}
