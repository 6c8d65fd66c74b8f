//! Address to district classification by substring match.

/// Shanghai's 16 districts. Order is significant: classification returns the
/// first entry found in the address.
pub const SHANGHAI_DISTRICTS: [&str; 16] = [
    "黄浦区",
    "徐汇区",
    "长宁区",
    "静安区",
    "普陀区",
    "虹口区",
    "杨浦区",
    "闵行区",
    "宝山区",
    "嘉定区",
    "浦东新区",
    "金山区",
    "松江区",
    "青浦区",
    "奉贤区",
    "崇明区",
];

/// Classifies an address against [`SHANGHAI_DISTRICTS`].
///
/// Returns an empty string when no district name occurs in the address.
pub fn classify_district(address: &str) -> &'static str {
    classify_with(address, &SHANGHAI_DISTRICTS)
}

/// Returns the first gazetteer entry that occurs anywhere in `address`.
///
/// An address naming two districts resolves to whichever is listed first in
/// `gazetteer`, regardless of where each appears in the text.
pub fn classify_with<'a>(address: &str, gazetteer: &[&'a str]) -> &'a str {
    if address.is_empty() {
        return "";
    }
    gazetteer
        .iter()
        .find(|district| address.contains(**district))
        .copied()
        .unwrap_or("")
}

/// Returns true if `name` is a member of [`SHANGHAI_DISTRICTS`].
pub fn is_known_district(name: &str) -> bool {
    SHANGHAI_DISTRICTS.contains(&name)
}
