use cdp_adapter::{xpath_literal, Locator};

/// Group container of a radio span, nearest first.
pub const GROUP_XPATH: &str = "./ancestor::*[@role='radiogroup'][1]";
/// Radio members of a group container.
pub const MEMBER_XPATH: &str = ".//span[@role='radio']";
/// Native input nested in a radio span.
pub const INNER_INPUT_XPATH: &str = ".//input[@type='checkbox' or @type='radio']";
/// Label rendered next to a radio span.
pub const LABEL_XPATH: &str = "./following-sibling::label | ./parent::*/label";

pub fn radio_by_label(label: &str) -> Locator {
    Locator::xpath(format!(
        "//span[@role='radio' and @aria-label={}]",
        xpath_literal(label)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_by_label_quotes_label() {
        assert_eq!(
            radio_by_label("국내").expr,
            "//span[@role='radio' and @aria-label='국내']"
        );
    }
}
