/// Description fragments that mark a statement row as money coming back to the card
/// (payments, credits, refunds) rather than a purchase.
pub const PAYMENT_KEYWORDS: &[&str] = &[
    "payment",
    "thank you",
    "credit",
    "autopay",
    "refund",
    "adjustment",
    "reversal",
    "returned",
];

/// Case-insensitive keyword check, applied regardless of the row's numeric sign.
pub fn looks_like_payment(description: &str) -> bool {
    let desc_lower = description.to_lowercase();
    PAYMENT_KEYWORDS.iter().any(|kw| desc_lower.contains(kw))
}
