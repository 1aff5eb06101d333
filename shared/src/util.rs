/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round to cents and fix the scale at 2 (`5` → `5.00`)
pub fn round_money(value: rust_decimal::Decimal) -> rust_decimal::Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Turn a display name into a URL slug.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters collapses into a single `-`. Leading and trailing separators
/// are dropped. A name with no usable characters yields `"item"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

/// Slug candidate for the n-th collision (`n` starts at 2).
pub fn numbered_slug(base: &str, n: u32) -> String {
    format!("{base}-{n}")
}
