use cdp_adapter::{xpath_literal, Locator};

/// Option list container, wherever the widget library appends it.
pub const LISTBOX_XPATH: &str = "//div[contains(@class, 'cl-listbox')] | //div[@role='listbox']";

/// Displayed value inside a combobox.
pub const CURRENT_TEXT_XPATH: &str = ".//div[starts-with(@id, 'cb-text-')]";

/// Text nodes of rendered options, relative to the list.
pub const OPTION_TEXT_XPATH: &str = ".//div[contains(@class, 'cl-text')]";

pub fn listbox_locator() -> Locator {
    Locator::xpath(LISTBOX_XPATH)
}

/// Exact-text option expressions, most specific first.
pub fn option_exact_xpaths(text: &str) -> Vec<String> {
    let lit = xpath_literal(text);
    vec![
        format!(".//li[@role='option']//div[contains(@class, 'cl-text') and normalize-space()={lit}]"),
        format!(".//div[contains(@class, 'cl-text') and normalize-space()={lit}]"),
        format!(".//*[normalize-space()={lit}]"),
    ]
}

/// Substring option expressions, used only once exact matching is exhausted.
pub fn option_substring_xpaths(text: &str) -> Vec<String> {
    let lit = xpath_literal(text);
    vec![
        format!(".//div[contains(text(), {lit})]"),
        format!(".//*[contains(text(), {lit})]"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_before_substring() {
        let exact = option_exact_xpaths("채권형");
        assert_eq!(exact.len(), 3);
        assert!(exact[0].contains("normalize-space()='채권형'"));
        assert!(option_substring_xpaths("채권형")[0].contains("contains(text(), '채권형')"));
    }
}
