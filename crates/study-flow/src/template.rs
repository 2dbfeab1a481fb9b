//! Placeholder substitution for screen copy.

/// Replaced with the DV label.
pub const TRAIT_PLACEHOLDER: &str = "{trait}";
/// Replaced with the category label.
pub const CATEGORY_PLACEHOLDER: &str = "{category}";

/// Replaces every `{trait}` with `label`.
pub fn substitute_trait(text: &str, label: &str) -> String {
    text.replace(TRAIT_PLACEHOLDER, label)
}

/// Renders a rating question for one category.
///
/// Category labels are written to read as a noun phrase mid-sentence, so the
/// first character is lowercased ("A snack company" → "a snack company").
pub fn render_question(template: &str, dv_label: &str, category_label: &str) -> String {
    substitute_trait(template, dv_label).replace(CATEGORY_PLACEHOLDER, &lowercase_first(category_label))
}

/// Lowercases the first character only.
pub fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
