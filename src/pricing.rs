// src/pricing.rs
//
// Pure pricing rules for premium chapters. Prices are computed once, when an
// author sets or changes a chapter's price in the studio; the unlock path
// always reads the stored price and never recomputes it.

use serde::{Deserialize, Serialize};

/// Tickets per 1000 words before format and discount adjustments.
pub const BASE_PRICE_PER_1000_WORDS: f64 = 150.0;

/// A novel must have at least this many words in total before any of its
/// chapters may be priced.
pub const MIN_NOVEL_WORDS_FOR_PREMIUM: u64 = 50_000;

/// A chapter must have at least this many words to be priced.
pub const MIN_CHAPTER_WORDS_FOR_PREMIUM: u64 = 1_000;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NovelFormat {
    /// Web novel.
    WN,
    /// Light novel, priced slightly above web novels.
    LN,
}

impl NovelFormat {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::WN => 1.0,
            Self::LN => 1.2,
        }
    }

    /// Parses the format column. Unknown strings fall back to the neutral
    /// web-novel multiplier rather than failing.
    pub fn from_db(value: &str) -> Self {
        match value {
            "LN" => Self::LN,
            _ => Self::WN,
        }
    }
}

/// Advisory bounds shown to authors in the studio. Not enforced anywhere.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceRange {
    pub min: i64,
    pub suggested: i64,
    pub max: i64,
}

/// Computes a chapter's ticket price from its word count, the novel format
/// and a discount percentage.
///
/// The result is always at least 1: a premium chapter can never cost 0.
/// "Costs nothing" is represented by `is_locked = false`, not by a zero
/// price. Discounts outside 0..=100 are clamped, not rejected.
pub fn calculate_chapter_price(word_count: u64, format: NovelFormat, discount_percent: i64) -> i64 {
    let discount = discount_percent.clamp(0, 100) as f64;
    let base = word_count as f64 / 1000.0 * BASE_PRICE_PER_1000_WORDS;
    let discounted = base * format.multiplier() * (1.0 - discount / 100.0);
    (discounted.round() as i64).max(1)
}

pub fn can_have_premium_chapters(total_novel_word_count: u64) -> bool {
    total_novel_word_count >= MIN_NOVEL_WORDS_FOR_PREMIUM
}

pub fn can_chapter_be_premium(chapter_word_count: u64) -> bool {
    chapter_word_count >= MIN_CHAPTER_WORDS_FOR_PREMIUM
}

pub fn suggested_price_range(word_count: u64, format: NovelFormat) -> PriceRange {
    let suggested = calculate_chapter_price(word_count, format, 0);
    PriceRange {
        min: ((suggested as f64 * 0.5).floor() as i64).max(1),
        suggested,
        max: (suggested as f64 * 1.5).ceil() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_word_web_novel_costs_base_price() {
        assert_eq!(calculate_chapter_price(1000, NovelFormat::WN, 0), 150);
    }

    #[test]
    fn light_novels_carry_the_format_multiplier() {
        assert_eq!(calculate_chapter_price(1000, NovelFormat::LN, 0), 180);
    }

    #[test]
    fn discount_reduces_the_price() {
        assert_eq!(calculate_chapter_price(1000, NovelFormat::WN, 50), 75);
    }

    #[test]
    fn price_never_drops_below_one() {
        assert_eq!(calculate_chapter_price(0, NovelFormat::WN, 0), 1);
        assert_eq!(calculate_chapter_price(10, NovelFormat::WN, 100), 1);
        assert_eq!(calculate_chapter_price(100_000, NovelFormat::LN, 100), 1);
    }

    #[test]
    fn out_of_range_discounts_are_clamped() {
        assert_eq!(
            calculate_chapter_price(1000, NovelFormat::WN, -20),
            calculate_chapter_price(1000, NovelFormat::WN, 0)
        );
        assert_eq!(
            calculate_chapter_price(1000, NovelFormat::WN, 250),
            calculate_chapter_price(1000, NovelFormat::WN, 100)
        );
    }

    #[test]
    fn discount_is_monotonic() {
        for word_count in [500u64, 1000, 3210, 12_000] {
            let mut last = i64::MAX;
            for discount in 0..=100 {
                let price = calculate_chapter_price(word_count, NovelFormat::LN, discount);
                assert!(price <= last, "price rose at discount {discount}");
                assert!(price >= 1);
                last = price;
            }
        }
    }

    #[test]
    fn light_novel_never_cheaper_than_web_novel() {
        for word_count in [0u64, 999, 1000, 4500, 80_000] {
            for discount in [0, 25, 99] {
                assert!(
                    calculate_chapter_price(word_count, NovelFormat::LN, discount)
                        >= calculate_chapter_price(word_count, NovelFormat::WN, discount)
                );
            }
        }
    }

    #[test]
    fn unknown_format_strings_fall_back_to_web_novel() {
        assert_eq!(NovelFormat::from_db("LN"), NovelFormat::LN);
        assert_eq!(NovelFormat::from_db("WN"), NovelFormat::WN);
        assert_eq!(NovelFormat::from_db("manhwa"), NovelFormat::WN);
        assert_eq!(NovelFormat::from_db(""), NovelFormat::WN);
    }

    #[test]
    fn premium_eligibility_thresholds() {
        assert!(!can_have_premium_chapters(49_999));
        assert!(can_have_premium_chapters(50_000));
        assert!(!can_chapter_be_premium(999));
        assert!(can_chapter_be_premium(1000));
    }

    #[test]
    fn suggested_range_brackets_the_suggested_price() {
        let range = suggested_price_range(2000, NovelFormat::WN);
        assert_eq!(range.suggested, 300);
        assert_eq!(range.min, 150);
        assert_eq!(range.max, 450);

        // Tiny chapters still get a sane, ordered range.
        let tiny = suggested_price_range(0, NovelFormat::LN);
        assert_eq!(tiny.min, 1);
        assert!(tiny.min <= tiny.suggested && tiny.suggested <= tiny.max);
    }
}
